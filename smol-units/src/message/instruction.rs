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
use std::str::FromStr;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::message::MessageError;

/// The verb of a structured [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    /// Run something.
    Execute,
    /// Ask a question without side effects.
    Query,
    /// Store a value.
    Set,
    /// Read a stored value.
    Get,
    /// Enumerate what is available.
    List,
    /// Describe the available commands.
    Help,
}

impl CommandType {
    /// The lowercase keyword for this command.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandType::Execute => "execute",
            CommandType::Query => "query",
            CommandType::Set => "set",
            CommandType::Get => "get",
            CommandType::List => "list",
            CommandType::Help => "help",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandType {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "execute" => Ok(CommandType::Execute),
            "query" => Ok(CommandType::Query),
            "set" => Ok(CommandType::Set),
            "get" => Ok(CommandType::Get),
            "list" => Ok(CommandType::List),
            "help" => Ok(CommandType::Help),
            other => Err(MessageError::Unsupported(format!("unknown command type `{other}`"))),
        }
    }
}

/// A parsed command addressed to a unit.
///
/// Turning free text into instructions is the job of whatever sits in front of the runtime;
/// units receive the already structured form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Instruction {
    /// What kind of command this is.
    pub kind: CommandType,
    /// The target of the command, e.g. a register or tool name.
    pub action: String,
    /// Positional arguments.
    #[new(default)]
    #[serde(default)]
    pub args: Vec<String>,
}

impl Instruction {
    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}
