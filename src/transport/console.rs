use colored::*;
use std::io::{self, Write};

use super::{InboundMessage, MessageSender};

/// Console transport: inbound lines from stdin, replies to stdout
///
/// Each input line is `identity: question`, e.g.
/// `whatsapp:+15550001111: how many rolls of linen are in stock?`.
pub struct Console {
    inbound_color: Color,
    reply_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            inbound_color: Color::Cyan,
            reply_color: Color::Green,
        }
    }

    /// Echo an accepted inbound message
    pub fn print_inbound(&self, message: &InboundMessage) {
        println!(
            "{} {}",
            format!("{} >", message.sender).color(self.inbound_color).bold(),
            message.body
        );
    }

    /// Print a reply addressed to `to`
    pub fn print_reply(&self, to: &str, body: &str) {
        println!(
            "{} {}",
            format!("{} <", to).color(self.reply_color).bold(),
            body.color(self.reply_color)
        );
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Show the input prompt
    pub fn print_prompt(&self) -> io::Result<()> {
        print!("{} ", ">".color(self.inbound_color).bold());
        io::stdout().flush()
    }

    /// Print a welcome banner
    pub fn print_banner(&self) {
        println!("{}", "=".repeat(60).bright_blue());
        println!("{}", "  AskYourDatabase relay".bright_blue().bold());
        println!("{}", "=".repeat(60).bright_blue());
        println!();
        println!("Enter messages as `identity: question`. Type 'exit' or 'quit' to stop.");
        println!();
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MessageSender for Console {
    async fn send(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.print_reply(to, body);
        Ok(())
    }
}

/// Parse `identity: question`
///
/// The split is on the first `": "`, so identities with a scheme prefix
/// (`whatsapp:+1555...`) stay intact.
pub fn parse_console_line(line: &str) -> Option<InboundMessage> {
    let (sender, body) = line.split_once(": ")?;
    let sender = sender.trim();
    if sender.is_empty() {
        return None;
    }
    Some(InboundMessage::new(sender, body.trim()))
}
