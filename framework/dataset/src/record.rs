use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One ShareGPT conversation.
///
/// Fields are optional on the wire so that a structurally odd record can be skipped instead of
/// failing the whole dataset. Only JSON syntax errors are fatal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationRecord {
    /// Identifier of the conversation. ShareGPT dumps use both strings and numbers.
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    /// Ordered turns of the conversation.
    #[serde(default)]
    pub conversations: Vec<Turn>,
}

/// A single turn in a ShareGPT conversation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Speaker of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Human,
    Assistant,
    Other,
}

impl Role {
    fn from_label(label: &str) -> Self {
        match label {
            "human" | "user" => Role::Human,
            "gpt" | "assistant" => Role::Assistant,
            _ => Role::Other,
        }
    }
}

impl Turn {
    /// The speaker of this turn, [`Role::Other`] when missing or unknown.
    pub fn role(&self) -> Role {
        self.from
            .as_deref()
            .map(Role::from_label)
            .unwrap_or(Role::Other)
    }

    /// The text of this turn if it is present and not empty.
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }
}

/// How a multi-turn conversation is turned into samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleMode {
    /// One sample per conversation, taken from the opening human/assistant exchange. The
    /// conversation is skipped if it does not open with such an exchange.
    #[default]
    FirstTurn,
    /// One sample for every human turn that is directly answered by an assistant turn.
    TurnPairs,
}

impl FromStr for SampleMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-turn" => Ok(SampleMode::FirstTurn),
            "turn-pairs" => Ok(SampleMode::TurnPairs),
            _ => Err("Unknown sample mode, expected `first-turn` or `turn-pairs`"),
        }
    }
}

impl fmt::Display for SampleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleMode::FirstTurn => write!(f, "first-turn"),
            SampleMode::TurnPairs => write!(f, "turn-pairs"),
        }
    }
}

impl ConversationRecord {
    /// Extract `(prompt, completion)` exchanges from this conversation.
    ///
    /// Returns an empty list when the conversation has no exchange usable under `mode`.
    pub fn exchanges(&self, mode: SampleMode) -> Vec<(&str, &str)> {
        let turns = self.conversations.as_slice();
        match mode {
            SampleMode::FirstTurn => match turns {
                [first, second, ..] => exchange(first, second).into_iter().collect(),
                _ => Vec::new(),
            },
            SampleMode::TurnPairs => {
                let mut pairs = Vec::new();
                let mut i = 0;
                while i + 1 < turns.len() {
                    match exchange(&turns[i], &turns[i + 1]) {
                        Some(pair) => {
                            pairs.push(pair);
                            i += 2;
                        }
                        None => i += 1,
                    }
                }
                pairs
            }
        }
    }
}

fn exchange<'a>(prompt: &'a Turn, reply: &'a Turn) -> Option<(&'a str, &'a str)> {
    if prompt.role() != Role::Human || reply.role() != Role::Assistant {
        return None;
    }
    Some((prompt.text()?, reply.text()?))
}

/// One line of the converted dataset, in the schema the engine ingests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedSample {
    /// The prompt sent to the model.
    pub text: String,
    /// Number of tokens in the reference reply, used by the engine to bound generation.
    pub output_tokens_count: usize,
}
