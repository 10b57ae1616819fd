use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use lex_rag::config::{DEFAULT_COLLECTION, DEFAULT_DB_PATH};
use lex_rag::gemini::{DEFAULT_EMBEDDING_MODEL, DEFAULT_GENERATION_MODEL};

/// Ask questions about Indian legal documents, answered from your own corpus.
#[derive(Debug, Parser)]
#[command(name = "lexrag", version, about)]
pub struct Cli {
    /// Directory of the persistent embedding store.
    #[arg(long, env = "LEXRAG_DB_PATH", default_value = DEFAULT_DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// Collection inside the store.
    #[arg(long, env = "LEXRAG_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    pub collection: String,

    /// Maximum chunk size in characters.
    #[arg(long, default_value_t = 1000, global = true)]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[arg(long, default_value_t = 200, global = true)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per question when a command's `-k` is not given.
    #[arg(long, env = "LEXRAG_TOP_K", default_value_t = 5, global = true)]
    pub top_k: usize,

    /// Seconds before a generation call is abandoned.
    #[arg(long, env = "LEXRAG_TIMEOUT_SECS", default_value_t = 60, global = true)]
    pub timeout_secs: u64,

    /// Embedding backend.
    #[arg(long, env = "LEXRAG_EMBEDDER", value_enum, default_value_t = EmbedderKind::Gemini, global = true)]
    pub embedder: EmbedderKind,

    /// Gemini model used for answers and summaries.
    #[arg(long, env = "LEXRAG_MODEL", default_value = DEFAULT_GENERATION_MODEL, global = true)]
    pub model: String,

    /// Gemini model used for embeddings.
    #[arg(long, env = "LEXRAG_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL, global = true)]
    pub embedding_model: String,

    /// Gemini API key.
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Gemini embedding API (needs GOOGLE_API_KEY).
    Gemini,
    /// Offline token hashing; lexical matching only.
    Hashing,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a UTF-8 text file as one document.
    Ingest {
        /// File to ingest.
        path: PathBuf,
        /// Source label; defaults to the file name.
        #[arg(long)]
        source: Option<String>,
        /// Extra metadata as KEY=VALUE, repeatable.
        #[arg(long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
        /// Store the text as-is instead of normalizing it first.
        #[arg(long)]
        raw: bool,
    },
    /// Show the chunks most similar to a query. Prints nothing found when
    /// retrieval fails; run with RUST_LOG=warn to see why.
    Search {
        query: String,
        /// Number of chunks; defaults to --top-k.
        #[arg(short = 'k')]
        k: Option<usize>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Answer a question from the indexed documents.
    Ask {
        query: String,
        /// Number of chunks; defaults to --top-k.
        #[arg(short = 'k')]
        k: Option<usize>,
        /// Print the full response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Summarize a text file, or stdin when no file is given.
    Summarize { path: Option<PathBuf> },
    /// List stored documents.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print the number of stored documents.
    Count,
    /// Load the built-in sample acts if the store is empty.
    Seed,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metadata_pairs() {
        assert_eq!(parse_key_value("type=legal_act"), Ok(("type".into(), "legal_act".into())));
        assert_eq!(parse_key_value("year=2013=x"), Ok(("year".into(), "2013=x".into())));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn parses_ask_with_global_flags() {
        let cli = Cli::try_parse_from([
            "lexrag",
            "ask",
            "employer contribution",
            "-k",
            "3",
            "--embedder",
            "hashing",
        ])
        .unwrap();
        assert_eq!(cli.embedder, EmbedderKind::Hashing);
        assert!(matches!(cli.command, Command::Ask { k: Some(3), json: false, .. }));
        assert_eq!(cli.top_k, 5);
    }

    #[test]
    fn per_command_k_is_optional() {
        let cli =
            Cli::try_parse_from(["lexrag", "--top-k", "8", "search", "annual general meeting"])
                .unwrap();
        assert_eq!(cli.top_k, 8);
        assert!(matches!(cli.command, Command::Search { k: None, .. }));
    }
}
