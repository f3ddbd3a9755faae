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
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::control::LifecycleState;
use crate::message::Instruction;

/// The payload carried by every send.
///
/// Handlers accept an open-ended set of message shapes; this enum keeps that runtime
/// polymorphism while letting each unit match on exactly the shapes it understands and
/// reject the rest with [`MessageError::Unsupported`](crate::message::MessageError::Unsupported).
///
/// Messages are cloned once per fan-out target.
#[derive(Debug, Clone)]
pub enum Message {
    /// A free-form text command such as `"status"` or `"shutdown"`.
    Text(String),
    /// A structured instruction.
    Instruction(Instruction),
    /// A generic key-value map.
    Fields(Map<String, Value>),
    /// A cancellation signal. Receivers typically act on it only once it is cancelled.
    Signal(CancellationToken),
    /// A lifecycle state report, sent in reply to `"status"`.
    State(LifecycleState),
}

impl Message {
    /// Creates a [`Message::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Message::Text(text.into())
    }

    /// Returns the text if this is a [`Message::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the state if this is a [`Message::State`].
    pub fn as_state(&self) -> Option<LifecycleState> {
        match self {
            Message::State(state) => Some(*state),
            _ => None,
        }
    }

    /// A short, stable name for the variant, used in logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Message::Text(_) => "text",
            Message::Instruction(_) => "instruction",
            Message::Fields(_) => "fields",
            Message::Signal(_) => "signal",
            Message::State(_) => "state",
        }
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::Text(text.to_string())
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Message::Text(text)
    }
}

impl From<Instruction> for Message {
    fn from(instruction: Instruction) -> Self {
        Message::Instruction(instruction)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Message::Fields(fields)
    }
}

impl From<CancellationToken> for Message {
    fn from(token: CancellationToken) -> Self {
        Message::Signal(token)
    }
}

impl From<LifecycleState> for Message {
    fn from(state: LifecycleState) -> Self {
        Message::State(state)
    }
}
