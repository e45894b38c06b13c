//! Index command - embeds the document corpus into the search index

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::load_config;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::search::IndexBuilder;

#[derive(Args, Clone, Debug)]
pub struct IndexArgs {
    /// Corpus of `[{id, chunk}]` records (defaults to search.documents_path)
    #[arg(long)]
    pub documents: Option<PathBuf>,

    /// Where the index is written (defaults to search.index_path)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Chunks embedded per request
    #[arg(long)]
    pub batch_size: Option<usize>,
}

pub async fn run(args: IndexArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    init_logging(&config.logging);
    config.validate_embeddings()?;

    let documents = args.documents.unwrap_or_else(|| config.search.documents_path.clone());
    let output = args.output.unwrap_or_else(|| config.search.index_path.clone());
    let batch_size = args.batch_size.unwrap_or(config.search.batch_size);

    info!(
        documents = %documents.display(),
        output = %output.display(),
        batch_size,
        deployment = %config.azure_embeddings.deployment,
        "Building search index"
    );

    let embeddings = crate::create_embedding_provider(&config)?;
    let report = IndexBuilder::new(embeddings, &config.azure_embeddings.deployment)
        .with_batch_size(batch_size)
        .build_file(&documents, &output)
        .await?;

    println!(
        "Indexed {} chunks in {} batches ({} tokens) into {}",
        report.chunks,
        report.batches,
        report.total_tokens,
        output.display()
    );

    Ok(())
}
