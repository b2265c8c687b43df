pub mod ask;
pub mod chat;
pub mod ingest;
pub mod status;

use colored::Colorize;
use tokio::runtime::Runtime;

use grain::error::{GrainError, Result};
use grain::pipeline::QueryResponse;
use grain::responder::AnswerKind;

/// Each command drives one call chain on a current-thread runtime
pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| GrainError::Config(format!("tokio runtime: {}", e)))
}

/// Print an answer followed by the sources it was drawn from
pub fn print_response(response: &QueryResponse, verbose: bool) {
    match response.answer.kind {
        AnswerKind::Insufficient => println!("{}", response.answer.text.yellow()),
        _ => println!("{}", response.answer.text),
    }

    if !response.sources_used.is_empty() {
        println!();
        println!("{}", "Sources:".cyan().bold());
        for source in &response.sources_used {
            println!("  - {}", source);
        }
    }

    if verbose && !response.retrieved.is_empty() {
        println!();
        println!("{}", "Retrieved chunks:".cyan().bold());
        for result in &response.retrieved {
            let preview: String = result.chunk.text().chars().take(120).collect();
            println!(
                "  [{:.3}] {} #{} {}",
                result.score,
                result.chunk.source_id().dimmed(),
                result.chunk.position(),
                preview.replace('\n', " ")
            );
        }
    }
}
