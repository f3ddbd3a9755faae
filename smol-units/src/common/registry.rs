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

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::RwLock;
use static_assertions::assert_impl_all;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace, warn};

use crate::common::{Ctx, SharedUnit, SmolConfig, Subscriptions, UnitDesc, UnitRef, CONFIG};
use crate::message::Message;
use crate::traits::Unit;

/// The directory and dispatcher every unit lives in.
///
/// A `Registry` owns three tables behind a single reader/writer lock: name → unit,
/// name → canonical [`UnitRef`], and the subscription graph (publisher name → subscriber
/// names). Lookups, listings and subscriber snapshots take the read side; registration,
/// spawning, (un)subscribing and stopping take the write side. The lock is never held
/// while a unit's `init` or `handle`, or a spawn factory, runs.
///
/// The registry also owns the cancellation token handed to every [`Ctx`]. [`Registry::stop`]
/// cancels it; units that care poll it.
///
/// `Registry` is a cheap, cloneable handle; clones share the same state.
#[derive(Clone)]
pub struct Registry(pub(crate) Arc<RegistryInner>);
assert_impl_all!(Registry: Send, Sync, Clone);

/// Crate-internal: the state shared by all clones of a [`Registry`].
pub(crate) struct RegistryInner {
    directory: RwLock<Directory>,
    cancellation_token: CancellationToken,
    /// Every handler invocation launched by dispatch, for [`Registry::quiesce`].
    dispatches: TaskTracker,
    /// Serializes the close/wait/reopen sequence of [`Registry::quiesce`].
    quiescing: Mutex<()>,
    config: SmolConfig,
}

#[derive(Default)]
struct Directory {
    units: HashMap<String, SharedUnit>,
    refs: HashMap<String, UnitRef>,
    subscriptions: Subscriptions,
    /// Names being spawned right now; concurrent spawners of one name share the slot.
    pending: HashMap<String, Arc<OnceCell<UnitRef>>>,
}

impl Directory {
    /// Finds the name `other` is registered under by comparing allocations.
    fn name_of<U: Unit + ?Sized>(&self, other: &Arc<U>) -> Option<String> {
        let wanted = Arc::as_ptr(other).cast::<()>();
        self.units
            .iter()
            .find(|(_, unit)| Arc::as_ptr(unit).cast::<()>() == wanted)
            .map(|(name, _)| name.clone())
    }

    fn live_ref(&self, name: &str) -> Option<UnitRef> {
        if !self.units.contains_key(name) {
            return None;
        }
        self.refs.get(name).cloned()
    }

    fn entry(&self, name: &str) -> Option<(SharedUnit, UnitRef)> {
        Some((self.units.get(name)?.clone(), self.refs.get(name)?.clone()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry using the global [`CONFIG`].
    pub fn new() -> Self {
        Self::with_config(CONFIG.clone())
    }

    /// Creates an empty registry with an explicit configuration.
    pub fn with_config(config: SmolConfig) -> Self {
        Self(Arc::new(RegistryInner {
            directory: RwLock::new(Directory::default()),
            cancellation_token: CancellationToken::new(),
            dispatches: TaskTracker::new(),
            quiescing: Mutex::new(()),
            config,
        }))
    }

    /// Registers `unit` under `name` with a fresh canonical ref, and returns that ref.
    ///
    /// There is no uniqueness check. Registering a name that is already taken replaces the
    /// unit and the canonical ref; refs handed out earlier are not revoked and, since refs
    /// resolve by name, now reach the replacement.
    pub fn register(&self, name: impl Into<String>, unit: SharedUnit) -> UnitRef {
        let name = name.into();
        let unit_ref = UnitRef::new(name.clone(), &self.0);
        let mut directory = self.0.directory.write();
        if directory.units.insert(name.clone(), unit).is_some() {
            debug!(unit = %name, "Replaced existing registration");
        } else {
            trace!(unit = %name, "Registered unit");
        }
        directory.refs.insert(name, unit_ref.clone());
        unit_ref
    }

    /// Initializes every currently registered unit with a [`Ctx`] bound to its own ref.
    ///
    /// Initializers run concurrently and this returns once all of them have. No unit may
    /// assume another has been initialized before it.
    ///
    /// # Errors
    ///
    /// Initialization itself cannot fail today; the `Result` leaves room for it and callers
    /// should handle it.
    #[instrument(skip(self))]
    pub async fn start(&self) -> anyhow::Result<()> {
        let entries: Vec<(SharedUnit, UnitRef)> = {
            let directory = self.0.directory.read();
            directory
                .units
                .keys()
                .filter_map(|name| directory.entry(name))
                .collect()
        };
        trace!(count = entries.len(), "Initializing units");

        join_all(entries.into_iter().map(|(unit, unit_ref)| {
            let ctx = Ctx::new(self.clone(), unit_ref);
            async move { unit.init(ctx).await }
        }))
        .await;

        trace!("All units initialized");
        Ok(())
    }

    /// Cancels the registry's cancellation token and clears the subscription graph.
    ///
    /// Does not wait for in-flight handlers and does not remove units or refs; sends keep
    /// being dispatched afterwards, just without fan-out.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let mut directory = self.0.directory.write();
        self.0.cancellation_token.cancel();
        directory.subscriptions.clear();
        trace!("Registry stopped");
    }

    /// Waits until every handler invocation dispatched so far has returned, including
    /// invocations caused by messages those handlers sent.
    ///
    /// Intended for tests and orderly process exit. Concurrent callers take turns; each
    /// returns once everything dispatched before its turn has finished.
    pub async fn quiesce(&self) {
        let _turn = self.0.quiescing.lock().await;
        self.0.dispatches.close();
        self.0.dispatches.wait().await;
        self.0.dispatches.reopen();
    }

    /// Returns the canonical ref for `name`, if a unit is registered under it.
    pub fn get_ref(&self, name: &str) -> Option<UnitRef> {
        self.0.directory.read().refs.get(name).cloned()
    }

    /// Builds a [`Ctx`] bound to the canonical ref of `name`, for code acting on that unit's
    /// behalf from outside an invocation.
    pub fn context_for(&self, name: &str) -> Option<Ctx> {
        self.get_ref(name).map(|unit_ref| Ctx::new(self.clone(), unit_ref))
    }

    /// Lists every live unit. The listing is a snapshot.
    pub fn units(&self) -> Vec<UnitDesc> {
        let directory = self.0.directory.read();
        directory
            .units
            .keys()
            .filter_map(|name| {
                let (unit, unit_ref) = directory.entry(name)?;
                Some(UnitDesc::new(name.clone(), unit, unit_ref))
            })
            .collect()
    }

    /// The number of registered units.
    pub fn len(&self) -> usize {
        self.0.directory.read().units.len()
    }

    /// Whether no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The names currently subscribed to `publisher`, sorted.
    pub fn subscribers_of(&self, publisher: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .0
            .directory
            .read()
            .subscriptions
            .get(publisher)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// The cancellation token shared with every [`Ctx`] this registry builds.
    #[inline]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.0.cancellation_token.clone()
    }

    #[instrument(skip(self, factory))]
    pub(crate) async fn spawn<F, U>(&self, name: String, factory: F) -> UnitRef
    where
        F: FnOnce() -> U + Send,
        U: Unit,
    {
        let slot = {
            let mut directory = self.0.directory.write();
            if let Some(existing) = directory.live_ref(&name) {
                trace!("Unit already live, returning existing ref");
                return existing;
            }
            directory.pending.entry(name.clone()).or_default().clone()
        };

        let mut constructed: Option<SharedUnit> = None;
        let unit_ref = {
            let constructed = &mut constructed;
            let name = &name;
            slot.get_or_init(move || async move {
                let unit: SharedUnit = Arc::new(factory());
                let unit_ref = UnitRef::new(name.clone(), &self.0);
                let mut directory = self.0.directory.write();
                directory.units.insert(name.clone(), unit.clone());
                directory.refs.insert(name.clone(), unit_ref.clone());
                directory.pending.remove(name);
                *constructed = Some(unit);
                unit_ref
            })
            .await
            .clone()
        };

        match constructed {
            Some(unit) => {
                trace!("Spawned unit, initializing");
                unit.init(Ctx::new(self.clone(), unit_ref.clone())).await;
            }
            None => trace!("Concurrent spawn won the race, returning its ref"),
        }
        unit_ref
    }

    pub(crate) fn subscribe<U: Unit + ?Sized>(&self, subscriber: &str, publisher: &Arc<U>) {
        let mut directory = self.0.directory.write();
        let Some(publisher_name) = directory.name_of(publisher) else {
            trace!(subscriber, "Subscribe target is not registered, ignoring");
            return;
        };
        trace!(subscriber, publisher = %publisher_name, "Subscribed");
        directory
            .subscriptions
            .entry(publisher_name)
            .or_default()
            .insert(subscriber.to_string());
    }

    pub(crate) fn unsubscribe<U: Unit + ?Sized>(&self, subscriber: &str, publisher: &Arc<U>) {
        let mut directory = self.0.directory.write();
        let Some(publisher_name) = directory.name_of(publisher) else {
            trace!(subscriber, "Unsubscribe target is not registered, ignoring");
            return;
        };
        if let Some(set) = directory.subscriptions.get_mut(&publisher_name) {
            set.remove(subscriber);
            if set.is_empty() {
                directory.subscriptions.remove(&publisher_name);
            }
            trace!(subscriber, publisher = %publisher_name, "Unsubscribed");
        }
    }

    /// Delivers `message` to the unit `target` names and to that unit's subscribers.
    ///
    /// The addressed unit gets `from` as its reply ref; subscribers get `target`, the
    /// publisher. Every delivery is its own task; none is awaited here.
    pub(crate) fn dispatch(&self, target: &UnitRef, from: &UnitRef, message: Message) {
        let name = target.name();
        let Some(unit) = self.0.directory.read().units.get(name).cloned() else {
            trace!(unit = %name, kind = message.kind(), "No live unit, message dropped");
            return;
        };

        trace!(unit = %name, from = %from.name(), kind = message.kind(), "Dispatching");
        self.launch(unit, target.clone(), from.clone(), message.clone());

        let subscribers: Vec<(SharedUnit, UnitRef)> = {
            let directory = self.0.directory.read();
            directory
                .subscriptions
                .get(name)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(|subscriber| directory.entry(subscriber))
                        .filter(|(_, subscriber_ref)| !subscriber_ref.is_closed())
                        .collect()
                })
                .unwrap_or_default()
        };

        for (subscriber, subscriber_ref) in subscribers {
            trace!(publisher = %name, subscriber = %subscriber_ref.name(), "Fanning out");
            self.launch(subscriber, subscriber_ref, target.clone(), message.clone());
        }
    }

    fn launch(&self, unit: SharedUnit, self_ref: UnitRef, from: UnitRef, message: Message) {
        let warn_on_error = self.0.config.behavior.warn_on_handler_error;
        let ctx = Ctx::new(self.clone(), self_ref);
        self.0.dispatches.spawn(async move {
            let unit_name = ctx.self_ref().name().to_string();
            let kind = message.kind();
            if let Err(error) = unit.handle(ctx, from, message).await {
                if warn_on_error {
                    warn!(unit = %unit_name, kind, error = %error, "Handler error dropped");
                } else {
                    debug!(unit = %unit_name, kind, error = %error, "Handler error dropped");
                }
            }
        });
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let directory = self.0.directory.read();
        let mut names: Vec<&String> = directory.units.keys().collect();
        names.sort();
        f.debug_struct("Registry")
            .field("units", &names)
            .field("cancelled", &self.0.cancellation_token.is_cancelled())
            .finish_non_exhaustive()
    }
}
