//! Centralized prompt definitions for the analysis and chat pipes.
//!
//! Pipes are created with the system prompts below; request builders
//! then supply the per-call user message (question plus retrieved context).

/// System prompt for section analysis (tree summarization over passages).
pub const SECTION_ANALYSIS_PROMPT: &str = r#"You are a venture due-diligence analyst working from a company's dataroom.

You receive a question and a set of context passages. The passages are either
excerpts from dataroom documents or partial answers produced from other excerpts.

Guidelines:
- Answer the question using only the supplied context
- Combine partial answers into a single coherent answer without repeating yourself
- Say plainly when the context does not contain the information requested
- Keep numbers, names and dates exactly as they appear in the context
- Write in clear, professional prose; markdown lists are allowed"#;

/// System prompt for rewriting a follow-up message into a standalone query.
pub const CONDENSE_QUESTION_PROMPT: &str = r#"Given a conversation between a user and an assistant and a follow-up message from the user, rewrite the follow-up message into a single standalone question.

Guidelines:
- Resolve pronouns and references ("it", "they", "that company") using the conversation
- Keep every concrete name, metric and time period the user mentioned
- Do not answer the question
- Respond with the standalone question only, no other text"#;

/// System prompt for the follow-up chat over generated analysis.
pub const CHAT_SYSTEM_PROMPT: &str = "You have already helped me with due diligence on a company. Now, you are helping me refine the results. I already provided you with some important context and you have provided some initial thoughts. Now, continue the conversation in a friendly, professional tone.";

/// Heading that introduces caller-supplied sources appended to a chat message.
pub const USER_SOURCES_HEADING: &str = "User Provided Sources:";

/// Build the user message for one tree-summarize node.
pub fn summarize_request(question: &str, context: &[&str]) -> String {
    let mut body = String::from("Context information from multiple sources is below.\n---------------------\n");
    for (idx, passage) in context.iter().enumerate() {
        if idx > 0 {
            body.push_str("\n\n");
        }
        body.push_str(passage);
    }
    body.push_str("\n---------------------\nGiven the information from multiple sources and not prior knowledge, answer the query.\nQuery: ");
    body.push_str(question);
    body.push_str("\nAnswer: ");
    body
}

/// Build the user message for the condense step.
pub fn condense_request(transcript: &str, message: &str) -> String {
    format!(
        "<Chat History>\n{}\n\n<Follow Up Message>\n{}\n\n<Standalone question>",
        transcript, message
    )
}

/// Build the system message carrying retrieved context for a chat turn.
pub fn chat_context_prompt(context: &str) -> String {
    format!(
        "{}\n\nHere are the relevant documents for the context:\n\n{}\n\nInstruction: Use the previous chat history, or the context above, to interact and help the user.",
        CHAT_SYSTEM_PROMPT, context
    )
}
