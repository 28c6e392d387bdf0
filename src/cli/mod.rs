use clap::{Parser, Subcommand};

use crate::rag::QueryMode;

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Document RAG workbench over OpenAI-compatible model endpoints", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the working directories, print the configuration and idle
    Setup,
    /// Exercise both model endpoints and exit non-zero on failure
    Check,
    /// List supported documents in the source directory
    Scan,
    /// Ingest the document directory, then demonstrate one query
    Process,
    /// Ask the knowledge base a single question
    Query {
        question: String,
        #[arg(short, long, default_value = "hybrid")]
        mode: QueryMode,
    },
    /// Run the dashboard HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Serve status, scanning and uploads without wiring the RAG engine
        #[arg(long)]
        no_rag: bool,
    },
}
