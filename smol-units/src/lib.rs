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
#![warn(missing_docs)]

//! # Smol Units
//!
//! A minimal in-process unit runtime built on Tokio. Units are named, independently
//! addressable handlers that receive fire-and-forget messages, can fan every message
//! they receive out to subscribers, and can be spawned while the system is running.
//!
//! ## Key Concepts
//!
//! - **Units (`Unit`)**: the two-operation contract (`init`, `handle`) every unit implements.
//! - **Refs (`UnitRef`)**: revocable handles addressing a unit by name; the only way to
//!   send it a message.
//! - **Context (`Ctx`)**: the capability bundle handed to every `init`/`handle` call:
//!   directory listing, idempotent spawn, self reference, subscriptions, cancellation.
//! - **Registry (`Registry`)**: owns the directory and the subscription graph and runs
//!   the dispatch/fan-out protocol.
//! - **Lifecycle (`Lifecycle`)**: a unit with a run/stop state machine and a join barrier
//!   for background tasks that must finish before shutdown completes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use smol_units::prelude::*;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Unit for Echo {
//!     async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()> {
//!         from.send_as(&ctx.self_ref(), message);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Registry::new();
//!     let echo = registry.register("echo", Arc::new(Echo));
//!     registry.start().await?;
//!     echo.send("ping");
//!     registry.quiesce().await;
//!     registry.stop();
//!     Ok(())
//! }
//! ```

/// Registry, refs, context and configuration.
pub(crate) mod common;

/// Lifecycle coordination.
pub(crate) mod control;

/// Message payloads and errors.
pub(crate) mod message;

/// The unit contract.
pub(crate) mod traits;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## External Crates
/// *   [`async_trait::async_trait`]: required to implement [`Unit`](crate::traits::Unit).
/// *   [`tokio_util::sync::CancellationToken`]: the cooperative cancellation signal.
///
/// ## Core Types
/// *   [`crate::common::Registry`]: directory, dispatcher and subscription graph owner.
/// *   [`crate::common::UnitRef`]: revocable handle used to send messages.
/// *   [`crate::common::Ctx`]: per-invocation capability bundle.
/// *   [`crate::common::UnitDesc`]: a directory entry returned by [`Ctx::units`](crate::common::Ctx::units).
/// *   [`crate::common::SmolConfig`]: runtime configuration.
/// *   [`crate::control::Lifecycle`] and [`crate::control::LifecycleState`].
/// *   [`crate::message::Message`], [`crate::message::Instruction`],
///     [`crate::message::CommandType`], [`crate::message::MessageError`].
/// *   [`crate::traits::Unit`].
pub mod prelude {
    pub use async_trait::async_trait;
    pub use tokio_util::sync::CancellationToken;

    pub use crate::common::{Ctx, Registry, SharedUnit, SmolConfig, UnitDesc, UnitRef, CONFIG};
    pub use crate::control::{Lifecycle, LifecycleState};
    pub use crate::message::{CommandType, Instruction, Message, MessageError};
    pub use crate::traits::Unit;
}
