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
#![forbid(unsafe_code)]

//! Test support for smol units.
//!
//! Import the prelude and annotate async tests with `#[smol_test]`:
//!
//! ```ignore
//! use smol_test::prelude::*;
//!
//! #[smol_test]
//! async fn registry_starts() -> anyhow::Result<()> {
//!     Ok(())
//! }
//! ```

use std::fmt::Debug;
use std::time::Duration;

/// Commonly used test imports.
pub mod prelude {
    pub use smol_test_macro::smol_test;
    pub use tracing::{debug, error, info, trace, warn};

    pub use crate::eventually;
}

/// Polls `condition` every millisecond until it holds or `within` elapses.
///
/// Returns whether the condition was observed to hold. Useful for asserting on
/// state that fire-and-forget dispatch updates on other tasks.
pub async fn eventually<F>(within: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[doc(hidden)]
pub mod __private {
    pub use parking_lot;
    pub use tokio;
    pub use tracing;

    use super::Debug;

    /// Converts the return value of a test body into pass/fail.
    pub trait Outcome {
        fn into_outcome(self);
    }

    impl Outcome for () {
        fn into_outcome(self) {}
    }

    impl<E: Debug> Outcome for Result<(), E> {
        fn into_outcome(self) {
            if let Err(e) = self {
                panic!("test returned an error: {e:?}");
            }
        }
    }
}
