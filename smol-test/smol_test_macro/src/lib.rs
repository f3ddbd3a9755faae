/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! The `#[smol_test]` attribute.
//!
//! Turns an `async fn` returning `anyhow::Result<()>` (or `()`) into a plain `#[test]`
//! that drives the body on a fresh multi-threaded Tokio runtime, inside a tracing span
//! named after the test. Panics raised on any runtime thread are recorded with their
//! location and re-raised on the test thread once the runtime has finished.
//!
//! ```ignore
//! #[smol_test(timeout_ms = 2_000)]
//! async fn fan_out_reaches_subscribers() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn, LitInt};

#[proc_macro_attribute]
pub fn smol_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut timeout_ms: Option<LitInt> = None;
    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("timeout_ms") {
            timeout_ms = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported smol_test argument, expected `timeout_ms = <millis>`"))
        }
    });
    parse_macro_input!(attr with attr_parser);

    let input = parse_macro_input!(item as ItemFn);
    let vis = &input.vis;
    let sig = &input.sig;
    let body = &input.block;
    let attrs = &input.attrs;
    let name = &sig.ident;
    let inputs = &sig.inputs;
    let output = &sig.output;

    let async_name = syn::Ident::new(&format!("__{name}_async"), name.span());

    let drive = match timeout_ms {
        Some(ms) => quote! {
            match ::smol_test::__private::tokio::time::timeout(
                ::std::time::Duration::from_millis(#ms),
                #async_name(),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => panic!("test `{}` did not finish within {} ms", stringify!(#name), #ms),
            }
        },
        None => quote! { #async_name().await },
    };

    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis fn #name() {
            use ::std::sync::atomic::{AtomicBool, Ordering};
            use ::std::sync::Arc;
            use ::std::panic;
            use ::smol_test::__private::parking_lot::Mutex;

            #[derive(Default)]
            struct PanicRecord {
                occurred: AtomicBool,
                message: Mutex<Option<String>>,
                location: Mutex<Option<String>>,
            }

            let record = Arc::new(PanicRecord::default());
            let hook_record = Arc::clone(&record);

            let orig_hook = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                hook_record.occurred.store(true, Ordering::SeqCst);
                let message = info
                    .payload()
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| info.payload().downcast_ref::<String>().cloned());
                *hook_record.message.lock() = message.clone();
                *hook_record.location.lock() =
                    info.location().map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                ::smol_test::__private::tracing::error!(
                    "Panic: {}",
                    message.unwrap_or_else(|| "No error message".to_string()).trim().replace('\n', " ")
                );
                orig_hook(info);
            }));

            let runtime = ::smol_test::__private::tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build test runtime");

            let test_span = ::smol_test::__private::tracing::info_span!("smol_test", name = stringify!(#name));
            let result = runtime.block_on(::smol_test::__private::tracing::Instrument::instrument(
                async { #drive },
                test_span,
            ));
            drop(runtime);

            if record.occurred.load(Ordering::SeqCst) {
                let location = record
                    .location
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown location".to_string());
                let message = record
                    .message
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "No error message".to_string())
                    .trim()
                    .replace('\n', " ");
                panic!("Panic at {}: {}", location, message);
            }

            ::smol_test::__private::Outcome::into_outcome(result);
        }

        async fn #async_name(#inputs) #output #body
    };

    expanded.into()
}
