use colored::*;

use crate::agent::Message;

pub fn print_header(model: &str) {
    let line = "─".repeat(48);
    println!("{}", line.black().bold());
    println!(
        "  {} {}  •  {}",
        "Tempo".yellow().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).black().bold(),
        model.cyan()
    );
    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_error(msg: &str) {
    eprintln!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_answer(answer: &str) {
    println!("\n{}: {}\n", "Bot".green().bold(), answer);
}

/// Print every message of a finished conversation
pub fn print_transcript(messages: &[Message]) {
    for message in messages {
        match message {
            Message::Human { content } => {
                println!("{}: {}", "You".blue().bold(), content);
            }
            Message::Assistant { content, tool_calls } => {
                if !content.is_empty() {
                    println!("{}: {}", "Bot".green().bold(), content);
                }
                for call in tool_calls {
                    println!(
                        "  {} {}({}) [{}]",
                        "→".magenta(),
                        call.name.cyan(),
                        call.arguments,
                        call.call_id.black().bold()
                    );
                }
            }
            Message::ToolResult { name, call_id, content } => {
                println!(
                    "  {} {} [{}]: {}",
                    "←".magenta(),
                    name.cyan(),
                    call_id.black().bold(),
                    content
                );
            }
        }
    }
}
