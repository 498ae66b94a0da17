use serde::{Deserialize, Serialize};

/// The author of a message in the canonical conversation.
///
/// The system prompt is not a message: every provider takes it as a separate
/// argument so it can be placed where that provider expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}
