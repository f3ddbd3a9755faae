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
use std::fmt::{self, Debug};
use std::sync::Arc;

use derive_new::new;
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;

use crate::common::{Registry, SharedUnit, UnitRef};
use crate::traits::Unit;

/// A directory entry: a live unit, the name it is registered under, and its canonical ref.
#[derive(Clone, new)]
pub struct UnitDesc {
    /// The registered name.
    pub name: String,
    /// The unit itself. Pass it to [`Ctx::subscribe`] to follow it.
    pub unit: SharedUnit,
    /// The registry's canonical ref for `name`.
    pub unit_ref: UnitRef,
}

impl Debug for UnitDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDesc")
            .field("name", &self.name)
            .field("unit_ref", &self.unit_ref)
            .finish_non_exhaustive()
    }
}

/// The capabilities available to a unit during one `init` or `handle` invocation.
///
/// A `Ctx` is bound to the unit it was built for: [`Ctx::self_ref`] addresses that unit, and
/// subscriptions made through it are made on that unit's behalf. It is built fresh for
/// every invocation; cloning it to hand to work spawned from inside the invocation is fine,
/// keeping it around past the invocation is not what it is for.
#[derive(Clone)]
pub struct Ctx {
    registry: Registry,
    self_ref: UnitRef,
}
assert_impl_all!(Ctx: Send, Sync, Clone);

impl Ctx {
    pub(crate) fn new(registry: Registry, self_ref: UnitRef) -> Self {
        Self { registry, self_ref }
    }

    /// Lists every live unit. The listing is a snapshot.
    pub fn units(&self) -> Vec<UnitDesc> {
        self.registry.units()
    }

    /// Returns the ref of the unit registered under `name`, creating, registering and
    /// initializing it from `factory` first if there is none.
    ///
    /// Idempotent: if `name` is already live its ref is returned and `factory` is not
    /// called, also when several units race to spawn the same name. Losers of the race wait
    /// until the winner has registered the unit, not until it has been initialized.
    ///
    /// `factory` runs without the directory lock held, so it may look things up in (or
    /// register units with) the registry.
    pub async fn spawn<F, U>(&self, name: impl Into<String>, factory: F) -> UnitRef
    where
        F: FnOnce() -> U + Send,
        U: Unit,
    {
        self.registry.spawn(name.into(), factory).await
    }

    /// The ref of the unit this context is bound to.
    #[inline]
    pub fn self_ref(&self) -> UnitRef {
        self.self_ref.clone()
    }

    /// Subscribes this context's unit to everything sent to `other`.
    ///
    /// `other` is matched against the directory by identity; if it is not a registered unit
    /// this does nothing.
    pub fn subscribe<U: Unit + ?Sized>(&self, other: &Arc<U>) {
        self.registry.subscribe(self.self_ref.name(), other);
    }

    /// Undoes [`Ctx::subscribe`]. Does nothing if there was no such subscription.
    pub fn unsubscribe<U: Unit + ?Sized>(&self, other: &Arc<U>) {
        self.registry.unsubscribe(self.self_ref.name(), other);
    }

    /// The registry-wide cancellation signal, cancelled by [`Registry::stop`].
    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.registry.cancellation_token()
    }

    /// Whether the registry has been stopped.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.registry.cancellation_token().is_cancelled()
    }
}

impl Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("self_ref", &self.self_ref)
            .finish_non_exhaustive()
    }
}
