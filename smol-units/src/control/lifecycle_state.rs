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
use std::fmt;

/// The states a [`Lifecycle`](crate::control::Lifecycle) moves through, in order.
///
/// Transitions only ever move forward; the derived ordering follows declaration order, so
/// `state >= LifecycleState::Stopping` means shutdown has begun.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Created, not yet initialized.
    #[default]
    Init,
    /// Initializing; the shutdown monitor is being launched.
    Starting,
    /// Initialized and accepting background tasks.
    Running,
    /// Shutdown has begun; waiting for registered tasks to finish.
    Stopping,
    /// Every registered task has finished.
    Stopped,
}

impl LifecycleState {
    /// Whether shutdown has begun (or finished).
    #[inline]
    pub fn is_shutting_down(&self) -> bool {
        *self >= LifecycleState::Stopping
    }

    /// The lowercase name of the state.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Init => "init",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
