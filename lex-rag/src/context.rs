//! Formatting retrieved chunks into the context block of a prompt.

use crate::document::QueryResult;

/// Line separating consecutive documents in an assembled context.
pub const DOCUMENT_DELIMITER: &str = "---";

/// Concatenate ranked results into one attributed context block.
///
/// Each result contributes a `Document {n}:` marker (1-based), its source
/// attribution, its content and the delimiter, one per line.
pub fn assemble_context(results: &[QueryResult]) -> String {
    let mut parts = Vec::with_capacity(results.len() * 4);
    for (i, result) in results.iter().enumerate() {
        parts.push(format!("Document {}:", i + 1));
        parts.push(format!("Source: {}", result.source().unwrap_or("Unknown")));
        parts.push(format!("Content: {}", result.content));
        parts.push(DOCUMENT_DELIMITER.to_string());
    }
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::document::Metadata;

    fn result(source: Option<&str>, content: &str) -> QueryResult {
        let mut metadata = Metadata::new();
        if let Some(source) = source {
            metadata.insert("source".to_string(), Value::from(source));
        }
        metadata.insert("chunk_index".to_string(), json!(0));
        QueryResult { content: content.to_string(), metadata, score: 0.5 }
    }

    #[test]
    fn formats_results_in_rank_order() {
        let context = assemble_context(&[
            result(Some("EPF Act 1952"), "Employer pays ten per cent."),
            result(None, "Orphan chunk."),
        ]);

        assert_eq!(
            context,
            "Document 1:\nSource: EPF Act 1952\nContent: Employer pays ten per cent.\n---\n\
             Document 2:\nSource: Unknown\nContent: Orphan chunk.\n---"
        );
    }

    #[test]
    fn empty_results_give_empty_context() {
        assert_eq!(assemble_context(&[]), "");
    }
}
