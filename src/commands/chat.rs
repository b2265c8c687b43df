use colored::Colorize;
use dialoguer::Input;

use grain::config::Config;
use grain::error::Result;
use grain::loader::SourceFilter;
use grain::pipeline::{self, QueryRequest};
use grain::session::Session;

use super::{print_response, runtime};

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq)]
enum ChatInput {
    Question(String),
    History,
    Clear,
    Source(Option<SourceFilter>),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    if !line.starts_with('/') {
        return match line.to_lowercase().as_str() {
            "exit" | "quit" => ChatInput::Quit,
            _ => ChatInput::Question(line.to_string()),
        };
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();
    match command {
        "/history" => ChatInput::History,
        "/clear" => ChatInput::Clear,
        "/source" => ChatInput::Source(arg.parse().ok()),
        "/help" => ChatInput::Help,
        "/quit" | "/exit" => ChatInput::Quit,
        other => ChatInput::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("  {}            show your previous questions", "/history".cyan());
    println!("  {}              forget previous questions", "/clear".cyan());
    println!("  {} all|pdf|web search only these sources", "/source".cyan());
    println!("  {}               leave the chat", "/quit".cyan());
}

pub fn cmd_chat(config: Config, source: SourceFilter, no_history: bool, verbose: bool) -> Result<()> {
    let mut session = Session::open(config)?;
    session.set_source_filter(source);
    session.set_remember_history(!no_history);

    let stats = session.knowledge().stats();
    println!("{}", "University Assistant".green().bold());
    println!(
        "  {} chunks indexed, searching {} sources. Type /help for commands.",
        stats.total_chunks,
        session.source_filter().to_string().cyan()
    );
    println!();

    let rt = runtime()?;
    loop {
        let line: String = match Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!("Input closed: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Help => print_help(),
            ChatInput::History => {
                if session.history().is_empty() {
                    println!("{}", "No previous questions.".dimmed());
                }
                for (i, q) in session.history().iter().enumerate() {
                    println!("  {}. {}", i + 1, q);
                }
            }
            ChatInput::Clear => {
                session.clear_history();
                println!("{}", "History cleared.".green());
            }
            ChatInput::Source(Some(filter)) => {
                session.set_source_filter(filter);
                println!("Searching {} sources.", filter.to_string().cyan());
            }
            ChatInput::Source(None) => {
                println!("{}", "Usage: /source all|pdf|web".yellow());
            }
            ChatInput::Unknown(command) => {
                println!("{} {}", "Unknown command:".yellow(), command);
            }
            ChatInput::Question(query) => {
                let request = QueryRequest::for_session(&session, query);
                match rt.block_on(pipeline::answer(&mut session, &request)) {
                    Ok(response) => {
                        println!();
                        print_response(&response, verbose);
                        println!();
                    }
                    // One failed answer should not end the conversation
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
                }
            }
        }
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}
