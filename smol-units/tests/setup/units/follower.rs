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
use smol_units::prelude::*;

use super::recorder::Recorder;

/// Subscribes to the unit named `publisher` during `init`, then records like a [`Recorder`].
pub struct Follower {
    pub publisher: String,
    pub record: Recorder,
}

impl Follower {
    pub fn new(publisher: impl Into<String>, record: Recorder) -> Self {
        Self {
            publisher: publisher.into(),
            record,
        }
    }
}

#[async_trait]
impl Unit for Follower {
    async fn init(&self, ctx: Ctx) {
        if let Some(desc) = ctx.units().into_iter().find(|d| d.name == self.publisher) {
            ctx.subscribe(&desc.unit);
        }
        self.record.init(ctx).await;
    }

    async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()> {
        self.record.handle(ctx, from, message).await
    }
}
