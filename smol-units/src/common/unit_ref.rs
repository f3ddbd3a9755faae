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
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use static_assertions::assert_impl_all;
use tracing::trace;

use crate::common::{Registry, RegistryInner};
use crate::message::Message;

/// A revocable handle addressing a unit by name.
///
/// Every send goes through a `UnitRef`. Sending is fire-and-forget: it schedules the
/// receiving unit's handler (and those of its subscribers) on the runtime and returns
/// immediately, without waiting for or observing the outcome.
///
/// A ref resolves its target by name at send time, so a unit that replaced an earlier
/// registration under the same name is reached through refs issued before the replacement.
///
/// Clones share the same `closed` flag: [`UnitRef::stop`] on any clone revokes them all.
/// Refs obtained separately for the same name (for example after a re-registration) are
/// independent. Equality and hashing are based on the name alone.
#[derive(Clone)]
pub struct UnitRef(Arc<UnitRefInner>);
assert_impl_all!(UnitRef: Send, Sync, Clone);

struct UnitRefInner {
    name: String,
    closed: AtomicBool,
    registry: Weak<RegistryInner>,
}

impl UnitRef {
    pub(crate) fn new(name: String, registry: &Arc<RegistryInner>) -> Self {
        Self(Arc::new(UnitRefInner {
            name,
            closed: AtomicBool::new(false),
            registry: Arc::downgrade(registry),
        }))
    }

    /// The name this ref addresses.
    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Sends `message` to the addressed unit, with this ref as the reply address.
    ///
    /// Does nothing if the ref is closed, if no unit is currently registered under the
    /// name, or if the registry has been dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send(&self, message: impl Into<Message>) {
        self.send_as(self, message);
    }

    /// Sends `message` to the addressed unit, handing the receiver `from` as the ref to
    /// reply through.
    ///
    /// Subscribers of the addressed unit receive the same message with this ref (the
    /// publisher's) as `from`. Same no-op rules as [`UnitRef::send`].
    pub fn send_as(&self, from: &UnitRef, message: impl Into<Message>) {
        if self.is_closed() {
            trace!(unit = %self.name(), "Send on closed ref ignored");
            return;
        }
        let Some(inner) = self.0.registry.upgrade() else {
            trace!(unit = %self.name(), "Registry dropped, message discarded");
            return;
        };
        Registry(inner).dispatch(self, from, message.into());
    }

    /// Revokes this ref. Every later send through it (or any of its clones) is a no-op.
    /// Irreversible.
    pub fn stop(&self) {
        if !self.0.closed.swap(true, Ordering::SeqCst) {
            trace!(unit = %self.name(), "Ref closed");
        }
    }

    /// Whether [`UnitRef::stop`] has been called on this ref.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.0.closed.load(Ordering::SeqCst)
    }

    /// Whether `other` is a clone of this very ref (sharing its `closed` flag), as opposed to
    /// merely addressing the same name.
    #[inline]
    pub fn same_ref(&self, other: &UnitRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Debug for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRef")
            .field("name", &self.0.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PartialEq for UnitRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.name == other.0.name
    }
}

impl Eq for UnitRef {}

impl Hash for UnitRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}
