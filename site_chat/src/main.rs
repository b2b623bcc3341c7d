use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use site_chat::{
    ai::HttpTransport,
    commands::{Command, HELP},
    config::Settings,
    fetcher::Fetcher,
    session::{ChatSession, QUICK_QUESTIONS},
    EntryKind,
};
use std::fmt::Display;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ask questions about any website", long_about = None)]
struct Args {
    /// Groq API key, validated on start
    #[arg(short = 'k', long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Website to scrape once the key is valid
    #[arg(short, long)]
    url: Option<String>,

    /// OpenAI-compatible chat completions endpoint
    #[arg(long, env = "SITE_CHAT_API_URL")]
    api_url: Option<String>,
}

fn report<T: Display, E: Display>(result: Result<T, E>) {
    match result {
        Ok(message) => println!("{}", format!("✅ {}", message).green()),
        Err(e) => println!("{}", format!("❌ {}", e).red()),
    }
}

/// Shown when `--url` arrives without a key to validate first.
fn skipped_url_notice(url: &str) -> String {
    format!("⚠️  Not scraping {} yet: no API key. Use /key <key>, then /scrape {}", url, url)
}

fn print_answer(result: Result<String, site_chat::error::AskError>) {
    match result {
        Ok(answer) => println!("{}\n{}\n", "🤖 Bot:".bright_magenta().bold(), answer),
        Err(e) => println!("{}\n", format!("❌ {}", e).red()),
    }
}

fn print_status(session: &ChatSession) {
    let status = session.status();
    if status.key_validated {
        println!("{}", "✓ API Key Valid".green());
    } else {
        println!("{}", "✗ API Key Not Set".red());
    }
    match (&status.website_url, status.document_chars) {
        (Some(url), Some(chars)) => {
            println!("{}", format!("✓ Website Scraped: {} ({} characters)", url, chars).green())
        }
        _ => println!("{}", "✗ No Website Scraped".red()),
    }
    println!("{} exchange(s) in context", status.exchanges);
}

fn print_history(session: &ChatSession) {
    if session.history().is_empty() {
        println!("{}", "No messages yet. Ask a question about the website.".bright_black());
        return;
    }
    for entry in session.history() {
        match entry.kind {
            EntryKind::User => println!("{} {}", "🙋 You:".bright_blue().bold(), entry.content),
            EntryKind::Assistant => println!("{} {}", "🤖 Bot:".bright_magenta().bold(), entry.content),
            EntryKind::SystemError => println!("{}", format!("❌ {}", entry.content).red()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::from_env()?;
    let args = Args::parse();
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(api_key) = args.api_key {
        settings.api_key = Some(api_key);
    }

    let transport = Arc::new(HttpTransport::new(&settings.api_url, settings.completion_timeout)?);
    let pages = Arc::new(Fetcher::new()?);
    let mut session = ChatSession::new(transport, pages);

    println!("{}", "🤖 Website Chatbot".bright_cyan().bold());
    println!("{}", "Ask intelligent questions about any website. Type /help for commands.".bright_black());
    println!();

    if let Some(api_key) = settings.api_key.as_deref() {
        println!("Validating API key...");
        report(session.validate(api_key).await);
        if let Some(url) = args.url.as_deref() {
            println!("Scraping {}...", url);
            report(session.scrape(url).await);
        }
    } else {
        println!("👉 Step 1: enter your Groq API key with /key <key> (free at https://console.groq.com/keys)");
        if let Some(url) = args.url.as_deref() {
            println!("{}", skipped_url_notice(url).yellow());
        }
    }

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let command = Command::parse(&line);
                if !matches!(command, Command::Empty | Command::Key(_)) {
                    rl.add_history_entry(line.trim()).ok();
                }

                match command {
                    Command::Empty => continue,
                    Command::Quit => break,
                    Command::Help => println!("{}", HELP),
                    Command::Key(key) => {
                        println!("Validating...");
                        report(session.validate(&key).await);
                    }
                    Command::Scrape(url) => {
                        println!("Scraping {}...", url);
                        report(session.scrape(&url).await);
                    }
                    Command::Ask(question) => {
                        println!("🤔 AI is thinking...");
                        print_answer(session.ask(&question).await);
                    }
                    Command::Quick(None) => {
                        for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
                            println!("  {}. {}", i + 1, question);
                        }
                    }
                    Command::Quick(Some(n)) => match session.ask_quick(n).await {
                        Some(result) => print_answer(result),
                        None => println!(
                            "{}",
                            format!("❌ Pick a quick question between 1 and {}", QUICK_QUESTIONS.len()).red()
                        ),
                    },
                    Command::Status => print_status(&session),
                    Command::History => print_history(&session),
                    Command::Clear => report::<_, String>(Ok(session.clear_chat())),
                    Command::Reset => report::<_, String>(Ok(session.reset_all())),
                    Command::Unknown(input) => {
                        println!("{}", format!("Unknown command: {}. Type /help.", input).yellow())
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
