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
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use static_assertions::assert_impl_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, instrument, trace, warn};

use crate::common::{Ctx, UnitRef};
use crate::control::LifecycleState;
use crate::message::{Message, MessageError};
use crate::traits::Unit;

/// A unit that coordinates graceful shutdown.
///
/// `Lifecycle` tracks a [`LifecycleState`] and a set of background tasks. Any code holding
/// the lifecycle can register work with [`Lifecycle::add_task`] or
/// [`Lifecycle::add_task_with_token`]; [`Lifecycle::shutdown`] signals those tasks and does
/// not return until every one of them has finished.
///
/// Shutdown is triggered by whichever comes first:
/// *   a direct call to [`Lifecycle::shutdown`],
/// *   a `"shutdown"` text message,
/// *   a [`Message::Signal`] whose token is already cancelled,
/// *   cancellation of the token the lifecycle was started with (for a registered lifecycle,
///     the registry's token, i.e. [`Registry::stop`](crate::common::Registry::stop)).
///
/// Tasks are never interrupted. They receive the shutdown token and are expected to watch it.
///
/// `Lifecycle` is a cheap, cloneable handle; register one clone with a registry and keep
/// another to add tasks and shut down from outside.
#[derive(Clone, Default)]
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}
assert_impl_all!(Lifecycle: Send, Sync, Clone, Unit);

#[derive(Default)]
struct LifecycleInner {
    state: RwLock<LifecycleState>,
    /// Cancelled once, at the start of shutdown.
    shutdown: CancellationToken,
    /// The join barrier.
    tasks: TaskTracker,
}

impl Lifecycle {
    /// Creates a lifecycle in [`LifecycleState::Init`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state. May be stale by the time the caller looks at it.
    #[inline]
    pub fn state(&self) -> LifecycleState {
        *self.inner.state.read()
    }

    /// The internal shutdown signal, cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Moves `Init → Starting → Running` and launches the monitor that calls
    /// [`Lifecycle::shutdown`] once either the internal shutdown signal or `parent` is
    /// cancelled.
    ///
    /// Only the first call has any effect. Must be called from within a Tokio runtime.
    #[instrument(skip(self, parent))]
    pub fn run(&self, parent: CancellationToken) {
        {
            let mut state = self.inner.state.write();
            if *state != LifecycleState::Init {
                warn!(state = %*state, "Lifecycle already started, ignoring");
                return;
            }
            *state = LifecycleState::Starting;
        }

        let lifecycle = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = lifecycle.inner.shutdown.cancelled() => {
                    trace!("Shutdown signal observed by monitor");
                }
                () = parent.cancelled() => {
                    debug!("Parent cancelled, shutting down lifecycle");
                }
            }
            lifecycle.shutdown().await;
        });

        let mut state = self.inner.state.write();
        // The monitor may already have begun shutdown if `parent` was cancelled.
        if *state == LifecycleState::Starting {
            *state = LifecycleState::Running;
        }
        trace!(state = %*state, "Lifecycle started");
    }

    /// Begins shutdown and waits for it to complete.
    ///
    /// The first call moves to [`LifecycleState::Stopping`], cancels the shutdown token, waits
    /// until every registered task has finished, then moves to [`LifecycleState::Stopped`].
    /// Any later call, including one made while the first is still waiting, returns
    /// immediately.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        {
            let mut state = self.inner.state.write();
            if state.is_shutting_down() {
                trace!(state = %*state, "Shutdown already in progress");
                return;
            }
            *state = LifecycleState::Stopping;
        }

        debug!(pending = self.inner.tasks.len(), "Lifecycle stopping");
        self.inner.shutdown.cancel();
        self.inner.tasks.close();
        self.inner.tasks.wait().await;

        *self.inner.state.write() = LifecycleState::Stopped;
        debug!("Lifecycle stopped");
    }

    /// Registers `task` with the join barrier and starts it immediately.
    ///
    /// The task runs regardless of state. It counts against the barrier until it completes,
    /// whether it returns or panics.
    pub fn add_task<Fut>(&self, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.tasks.spawn(task);
    }

    /// Registers a task that receives the shutdown token.
    ///
    /// The task counts against the join barrier from the moment this is called. If shutdown
    /// has already been signalled by the time the task gets to run, `task` is never called;
    /// otherwise it runs once and should return promptly after the token is cancelled.
    pub fn add_task_with_token<F, Fut>(&self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = self.inner.shutdown.clone();
        self.inner.tasks.spawn(async move {
            if token.is_cancelled() {
                trace!("Shutdown already signalled, task skipped");
                return;
            }
            task(token).await;
        });
    }
}

#[async_trait]
impl Unit for Lifecycle {
    async fn init(&self, ctx: Ctx) {
        self.run(ctx.cancellation_token());
    }

    /// Understands `"status"` (replies to `from` with [`Message::State`]), `"shutdown"`, and
    /// [`Message::Signal`] (shuts down if the token is cancelled, ignored otherwise).
    async fn handle(&self, ctx: Ctx, from: UnitRef, message: Message) -> anyhow::Result<()> {
        match message {
            Message::Text(command) => match command.trim() {
                "status" => {
                    from.send_as(&ctx.self_ref(), self.state());
                    Ok(())
                }
                "shutdown" => {
                    self.shutdown().await;
                    Ok(())
                }
                other => Err(MessageError::Unsupported(format!("lifecycle command `{other}`")).into()),
            },
            Message::Signal(token) => {
                if token.is_cancelled() {
                    self.shutdown().await;
                }
                Ok(())
            }
            other => Err(MessageError::Unsupported(format!("{} message", other.kind())).into()),
        }
    }
}

impl Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("tasks", &self.inner.tasks.len())
            .finish()
    }
}
