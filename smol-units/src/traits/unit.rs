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

use async_trait::async_trait;

use crate::common::{Ctx, UnitRef};
use crate::message::Message;

/// The contract every unit implements.
///
/// A unit is owned by the [`Registry`](crate::common::Registry) it is registered with and is
/// shared between concurrently running handler invocations, so both methods take `&self`;
/// state that changes while handling messages needs interior mutability.
///
/// Units never talk to each other directly. Everything they can do to the rest of the system
/// goes through the [`Ctx`] they are handed and the [`UnitRef`]s they obtain from it.
#[async_trait]
pub trait Unit: Send + Sync + 'static {
    /// Called exactly once, either by [`Registry::start`](crate::common::Registry::start) or
    /// when the unit is created through [`Ctx::spawn`].
    ///
    /// No unit may assume that any other unit has already been initialized.
    async fn init(&self, _ctx: Ctx) {}

    /// Called once per delivered message.
    ///
    /// `from` is the ref the message should be answered through. Replies are the only way a
    /// handler reports a result: an `Err` returned here is logged at the dispatch boundary and
    /// dropped, it never reaches the sender.
    async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()>;
}
