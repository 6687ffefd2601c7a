//! Prompt construction.

/// Fixed instruction sent as the system turn on every request.
pub const SYSTEM_INSTRUCTION: &str = "You are a capable assistant that analyses uploaded documents and answers general questions.

When documents are provided:
- Ground every statement in the document content and quote figures exactly as they appear.
- When tabular data has already been sorted, keep the given row order instead of re-sorting it.
- Say so plainly when the documents do not contain the answer.

When no documents are provided, answer from general knowledge.

Answer in the language of the question, concisely and in well-structured prose or lists.";

const QUESTION_LABEL: &str = "Question:";
const GROUNDING_REMINDER: &str = "Answer based on the documents above.";

/// Prompt built fresh for each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System turn.
    pub system_instruction: &'static str,
    /// Assembled document context, empty when no excerpts were supplied.
    pub context_block: String,
    /// Caller message, unchanged.
    pub user_message: String,
}

impl Prompt {
    /// Combine the context block and message under the fixed system instruction.
    pub fn new(context_block: String, user_message: impl Into<String>) -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION,
            context_block,
            user_message: user_message.into(),
        }
    }

    /// Text of the user turn.
    ///
    /// Without context the message is sent unprefixed.
    pub fn user_turn(&self) -> String {
        if self.context_block.is_empty() {
            return self.user_message.clone();
        }
        format!(
            "{}\n\n{QUESTION_LABEL} {}\n\n{GROUNDING_REMINDER}",
            self.context_block, self.user_message
        )
    }
}
