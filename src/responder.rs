use crate::error::Result;
use crate::llm::prompts::{self, INSUFFICIENT_INFORMATION, SYSTEM_UNIVERSITY_ASSISTANT};
use crate::llm::LlmClient;
use crate::retriever::RetrievedResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// Written by the LLM from retrieved context
    Generated,
    /// Nothing relevant was retrieved; no LLM call was made
    Insufficient,
    /// Canned reply to a greeting or similar
    SmallTalk,
    /// Answered from the session's own question history
    History,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub kind: AnswerKind,
    pub text: String,
}

impl Answer {
    pub fn insufficient() -> Self {
        Self {
            kind: AnswerKind::Insufficient,
            text: INSUFFICIENT_INFORMATION.to_string(),
        }
    }

    fn new(kind: AnswerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

pub struct Responder {
    client: LlmClient,
}

impl Responder {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    pub async fn generate(&self, query: &str, retrieved: &[RetrievedResult]) -> Result<Answer> {
        self.generate_with_history(query, retrieved, &[]).await
    }

    /// Ground an answer in `retrieved`. Empty context short-circuits to the
    /// insufficient-information answer without calling the API.
    pub async fn generate_with_history(
        &self,
        query: &str,
        retrieved: &[RetrievedResult],
        history: &[String],
    ) -> Result<Answer> {
        if retrieved.is_empty() {
            tracing::info!("No chunk passed the relevance threshold; not calling the LLM");
            return Ok(Answer::insufficient());
        }

        let prompt = prompts::answer_prompt(query, retrieved, history);
        tracing::debug!(
            "Sending {} chars of prompt to {} ({})",
            prompt.len(),
            self.client.provider(),
            self.client.model()
        );
        let text = self.client.chat(SYSTEM_UNIVERSITY_ASSISTANT, &prompt).await?;
        Ok(Answer::new(AnswerKind::Generated, text.trim()))
    }
}

const META_QUERY_PHRASES: &[&str] = &[
    "what did i ask before",
    "what was my previous question",
    "what were my previous questions",
    "what did i ask previously",
    "what have i asked",
    "what questions did i ask",
    "what was my last question",
    "what did i just ask",
    "previous query",
    "previous questions",
];

/// Answer questions about the conversation itself from `history`
pub fn history_reply(query: &str, history: &[String]) -> Option<Answer> {
    let lower = query.to_lowercase();
    if !META_QUERY_PHRASES.iter().any(|p| lower.contains(p)) {
        return None;
    }

    let text = match history {
        [] => "You haven't asked any questions yet.".to_string(),
        [only] => format!("Your previous question was: \"{}\"", only),
        _ => {
            let start = history.len().saturating_sub(prompts::MAX_RECENT_QUESTIONS);
            let lines: Vec<String> = history[start..]
                .iter()
                .rev()
                .enumerate()
                .map(|(i, q)| format!("{}. \"{}\"", i + 1, q))
                .collect();
            format!("Here are your previous questions:\n\n{}", lines.join("\n"))
        }
    };
    Some(Answer::new(AnswerKind::History, text))
}

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "greetings",
    "good morning",
    "good afternoon",
    "good evening",
    "how are you",
    "what's up",
    "nice to meet you",
    "how's it going",
    "howdy",
];

const MAX_SMALL_TALK_WORDS: usize = 6;
const MAX_GREETING_TAIL_WORDS: usize = 2;

const SMALL_TALK: &[(&[&str], &str)] = &[
    (
        &["thank", "appreciate"],
        "You're welcome! Feel free to ask if you need anything else.",
    ),
    (
        &["bye", "goodbye", "see you", "farewell", "good night"],
        "Goodbye! Come back anytime you have questions.",
    ),
    (
        &["what can you do", "how can you help", "your capabilities"],
        "I can answer questions about university admissions, fee structures, courses, campus life, procedures, and academic policies. How can I assist you?",
    ),
    (
        &["help me", "assist", "support", "guidance"],
        "I can help with university admissions, fees, courses, campus facilities, procedures, and more. What do you need?",
    ),
    (
        &["who are you", "what are you", "your name"],
        "I'm your university assistant, here to help with questions about university procedures, admissions, courses, and more. What would you like to know?",
    ),
];

/// Canned reply for greetings and conversational filler
pub fn small_talk_reply(query: &str) -> Option<Answer> {
    let lower = query.trim().to_lowercase();
    let lower = lower.trim_end_matches(['!', '.', '?']);

    // Longer messages are real questions even when they open with a greeting
    if lower.split_whitespace().count() > MAX_SMALL_TALK_WORDS {
        return None;
    }

    if is_greeting(lower) {
        return Some(Answer::new(
            AnswerKind::SmallTalk,
            "Hey! How's it going? What would you like to know about university matters?",
        ));
    }

    SMALL_TALK
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|p| contains_phrase(lower, p)))
        .map(|(_, reply)| Answer::new(AnswerKind::SmallTalk, *reply))
}

/// A bare greeting, optionally followed by a couple of filler words
/// ("hey there") or a second greeting ("hello, how are you")
fn is_greeting(text: &str) -> bool {
    GREETINGS.iter().any(|g| {
        let Some(rest) = text.strip_prefix(*g) else {
            return false;
        };
        if rest.is_empty() {
            return true;
        }
        if !rest.starts_with([' ', ',', '!']) {
            return false;
        }
        let rest = rest.trim_start_matches([' ', ',', '!']);
        rest.split_whitespace().count() <= MAX_GREETING_TAIL_WORDS
            || GREETINGS.contains(&rest)
    })
}

/// Phrase match on word boundaries so "bye" does not fire inside "bylaws"
fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.match_indices(phrase).any(|(start, _)| {
        let end = start + phrase.len();
        let before_ok = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        // Allow suffixes like "thanks" and "thank you"
        let after_ok = phrase == "thank"
            || text[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}
