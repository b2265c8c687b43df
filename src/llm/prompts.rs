use crate::loader::SourceType;
use crate::retriever::RetrievedResult;

/// Chunks shown per source type
const MAX_CHUNKS_PER_SECTION: usize = 5;
/// Earlier questions carried into the prompt
pub const MAX_RECENT_QUESTIONS: usize = 5;

pub const SYSTEM_UNIVERSITY_ASSISTANT: &str = r#"You are a university assistant helping students with questions about admissions, fees, courses, campus facilities, procedures and academic policies. You communicate like a knowledgeable student advisor: clear, friendly and precise.

Rules:
1. Answer ONLY from the AVAILABLE INFORMATION supplied with each question. Never invent figures, dates, names, fees or policies that are not in it.
2. If the information answers only part of the question, give that part and say plainly what is missing.
3. If the information does not answer the question at all, say that you do not have that information.
4. Do not mention document names, scores or that you were given context.
5. Use bullet points or numbered steps when they make the answer easier to follow."#;

pub const INSUFFICIENT_INFORMATION: &str = "I don't have enough relevant information to answer that question accurately. Please ask about university procedures, fees, courses, admissions, or other university-specific topics, or try rephrasing your question.";

/// Retrieved chunks, best first, grouped under a heading per source type
pub fn format_context(retrieved: &[RetrievedResult]) -> String {
    let mut sorted: Vec<&RetrievedResult> = retrieved.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let section = |source_type: SourceType, heading: &str| -> Option<String> {
        let entries: Vec<String> = sorted
            .iter()
            .filter(|r| r.chunk.source_type() == source_type)
            .take(MAX_CHUNKS_PER_SECTION)
            .map(|r| format!("[Score: {:.2}]\n{}", r.score, r.chunk.text().trim()))
            .collect();
        (!entries.is_empty()).then(|| format!("{}:\n{}", heading, entries.join("\n\n")))
    };

    [
        section(SourceType::Pdf, "OFFICIAL DOCUMENTS"),
        section(SourceType::Web, "WEBSITE INFORMATION"),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n\n---\n\n")
}

pub fn answer_prompt(question: &str, retrieved: &[RetrievedResult], history: &[String]) -> String {
    let context = format_context(retrieved);

    let recent = if history.is_empty() {
        String::new()
    } else {
        let start = history.len().saturating_sub(MAX_RECENT_QUESTIONS);
        let lines: Vec<String> = history[start..].iter().map(|q| format!("- {}", q)).collect();
        format!("\nRECENT QUESTIONS:\n{}\n", lines.join("\n"))
    };

    format!(
        r#"AVAILABLE INFORMATION:
{context}
{recent}
STUDENT'S QUESTION:
{question}

INSTRUCTIONS:
Answer the question using only the available information above. Do not add facts that are not stated there. If the information is insufficient, say so instead of guessing.

YOUR RESPONSE:"#
    )
}
