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

//! Registry, refs, context and configuration.
//!
//! *   [`Registry`]: owns the directory and the subscription graph and dispatches messages.
//! *   [`UnitRef`]: the revocable handle every send goes through.
//! *   [`Ctx`]: the capability bundle handed to units.
//! *   [`SmolConfig`]: runtime configuration loaded from XDG-compliant locations.

// --- Public Re-exports ---
pub use config::{SmolConfig, CONFIG};
pub use ctx::{Ctx, UnitDesc};
pub use registry::Registry;
pub use types::*;
pub use unit_ref::UnitRef;

// --- Crate-Internal Re-exports ---
pub(crate) use registry::RegistryInner;

// --- Submodules ---

/// Defines the configuration system.
pub mod config;
/// Defines `Ctx` and `UnitDesc`.
mod ctx;
/// Defines the `Registry` and its dispatch protocol.
mod registry;
/// Defines shared type aliases.
mod types;
/// Defines `UnitRef`.
mod unit_ref;
