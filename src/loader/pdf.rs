use std::any::Any;
use std::panic::{self, UnwindSafe};
use std::path::Path;
use std::sync::Mutex;

use walkdir::WalkDir;

use super::{LoadOutcome, SourceDocument, SourceType};

/// Load every `.pdf` under `dir` (recursively). Unreadable or textless files
/// are recorded as failures and skipped.
pub fn load_pdf_dir(dir: &Path) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    if !dir.is_dir() {
        outcome.fail(dir.display().to_string(), "PDF directory not found");
        return outcome;
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        match entry {
            Ok(entry) if entry.file_type().is_file() && is_pdf(entry.path()) => {
                paths.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => outcome.fail(dir.display().to_string(), e),
        }
    }

    tracing::info!("Found {} PDFs in {}", paths.len(), dir.display());

    for path in paths {
        let source_id = path
            .strip_prefix(dir)
            .unwrap_or(&path)
            .to_string_lossy()
            .to_string();

        match extract_pdf_text(&path) {
            Ok(text) if text.trim().is_empty() => outcome.fail(source_id, "no text extracted"),
            Ok(text) => {
                tracing::debug!("Extracted {} chars from {}", text.len(), source_id);
                outcome.documents.push(SourceDocument {
                    source_id,
                    source_type: SourceType::Pdf,
                    text,
                });
            }
            Err(reason) => outcome.fail(source_id, reason),
        }
    }

    outcome
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Serializes panic hook swaps between concurrent loaders
static PANIC_HOOK: Mutex<()> = Mutex::new(());

/// Pull the text layer out of a PDF. The parser can panic on malformed
/// files, so the panic is caught and reported like any other failure.
fn extract_pdf_text(path: &Path) -> std::result::Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    match catch_quietly(|| pdf_extract::extract_text_from_mem(&bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(format!("could not parse PDF: {}", e)),
        Err(message) => {
            tracing::debug!("PDF parser panicked on {}: {}", path.display(), message);
            Err("PDF parser panicked on malformed file".to_string())
        }
    }
}

/// Run `f`, turning a panic into `Err(message)` without the default hook
/// printing it to stderr. The previous hook is restored afterwards.
fn catch_quietly<T>(f: impl FnOnce() -> T + UnwindSafe) -> std::result::Result<T, String> {
    let _guard = PANIC_HOOK.lock().unwrap_or_else(|e| e.into_inner());
    let previous = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let result = panic::catch_unwind(f);
    panic::set_hook(previous);
    result.map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
