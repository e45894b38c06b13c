use clap::Parser;
use qna_agent::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Index(args) => cli::index::run(args).await,
        Command::Ask(args) => cli::ask::run(args).await,
    }
}
