//! CLI for the QnA agent
//!
//! - `serve`: HTTP API hosting the conversation coordinators
//! - `index`: embed the document corpus into the search index
//! - `ask`: send a prompt to a running server

pub mod ask;
pub mod index;
pub mod serve;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Retrieval-augmented Q&A agent
#[derive(Parser)]
#[command(name = "qna-agent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve,

    /// Build the search index from the document corpus
    Index(index::IndexArgs),

    /// Send a prompt to a running server
    Ask(ask::AskArgs),
}

/// `.env` first, then the layered config files and `APP__*` variables
fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();
    AppConfig::load().context("Failed to load configuration")
}
