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
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use smol_units::prelude::*;

/// One message as seen by a [`Recorder`].
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Name of the unit the handling `Ctx` was bound to.
    pub bound_to: String,
    /// The reply ref the handler was given.
    pub from: UnitRef,
    /// The payload.
    pub message: Message,
}

#[derive(Default)]
struct RecorderState {
    inits: AtomicUsize,
    init_bound_to: Mutex<Option<String>>,
    deliveries: Mutex<Vec<Delivery>>,
}

/// A unit that records every `init` and `handle` call.
///
/// Clones share their record, so a clone can be handed to a spawn factory while the test
/// keeps another to inspect. A failing recorder records the delivery and then returns an
/// error from `handle`.
#[derive(Clone, Default)]
pub struct Recorder {
    state: Arc<RecorderState>,
    fail: bool,
}

impl Recorder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.state.deliveries.lock().len()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.state.deliveries.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.deliveries()
            .iter()
            .filter_map(|d| d.message.as_text().map(str::to_string))
            .collect()
    }

    pub fn inits(&self) -> usize {
        self.state.inits.load(Ordering::SeqCst)
    }

    pub fn init_bound_to(&self) -> Option<String> {
        self.state.init_bound_to.lock().clone()
    }
}

#[async_trait]
impl Unit for Recorder {
    async fn init(&self, ctx: Ctx) {
        self.state.inits.fetch_add(1, Ordering::SeqCst);
        *self.state.init_bound_to.lock() = Some(ctx.self_ref().name().to_string());
    }

    async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()> {
        self.state.deliveries.lock().push(Delivery {
            bound_to: ctx.self_ref().name().to_string(),
            from,
            message,
        });
        if self.fail {
            anyhow::bail!("recorder configured to fail");
        }
        Ok(())
    }
}
