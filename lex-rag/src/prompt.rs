//! Prompt templates for answering and summarizing.

/// Build the grounded-answer prompt for `query` over an assembled `context`.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are an expert legal assistant specializing in Indian law. \
Use the provided context to answer the user's question accurately.

Context from Legal Documents:
{context}

User Question: {query}

Instructions:
1. Answer based primarily on the provided context
2. If the context doesn't contain relevant information, clearly state this
3. Provide specific legal provisions, section numbers, and act names when applicable
4. Give practical, actionable advice when appropriate
5. Use clear, professional language
6. If referring to legal procedures, provide step-by-step guidance

Please provide a detailed and helpful response:"
    )
}

/// Build the single-shot summarization prompt for `text`.
pub fn build_summary_prompt(text: &str) -> String {
    format!(
        "Summarize the following legal text clearly and concisely:

{text}

Provide a summary that captures the essential legal points:"
    )
}
