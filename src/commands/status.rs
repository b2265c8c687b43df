use colored::Colorize;

use grain::config::Config;
use grain::embeddings::KnowledgeBase;
use grain::error::Result;

pub fn cmd_status(config: &Config) -> Result<()> {
    let (index_path, chunks_path) = KnowledgeBase::paths(&config.index_dir, &config.index_prefix);
    let knowledge = KnowledgeBase::load(&config.index_dir, &config.index_prefix)?;
    let stats = knowledge.stats();

    let file_size = |path: &std::path::Path| {
        std::fs::metadata(path)
            .map(|m| humansize::format_size(m.len(), humansize::BINARY))
            .unwrap_or_else(|_| "?".into())
    };

    println!("{}", "Grain Status".green().bold());
    println!("{}", "=".repeat(40));
    println!(
        "  Index:             {} ({})",
        index_path.display().to_string().cyan(),
        file_size(&index_path)
    );
    println!(
        "  Chunks:            {} ({})",
        chunks_path.display().to_string().cyan(),
        file_size(&chunks_path)
    );
    println!("  Embedding model:   {}", stats.model);
    println!("  Dimension:         {}", stats.dimension);
    println!("  Total chunks:      {}", stats.total_chunks);
    for (source_type, count) in &stats.by_source_type {
        println!("    {:<16} {}", format!("{}:", source_type), count);
    }

    println!();
    println!("{} ({})", "Sources".cyan().bold(), stats.by_source.len());
    for (source, count) in &stats.by_source {
        println!("  {:>5}  {}", count, source);
    }

    if config.embedding.model_id() != stats.model {
        println!();
        println!(
            "{} current embedding settings use {}; run 'grain ingest' or switch back to query this index.",
            "Warning:".yellow().bold(),
            config.embedding.model_id()
        );
    }

    Ok(())
}
