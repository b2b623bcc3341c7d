//! REPL input parsing.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Key(String),
    Scrape(String),
    Ask(String),
    /// `None` lists the quick questions, `Some(n)` asks the n-th.
    Quick(Option<usize>),
    Status,
    History,
    Clear,
    Reset,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if line == "quit" || line == "exit" {
            return Command::Quit;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Ask(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "key" => Command::Key(arg.to_string()),
            "scrape" | "url" => Command::Scrape(arg.to_string()),
            "ask" => Command::Ask(arg.to_string()),
            "quick" | "q" if arg.is_empty() => Command::Quick(None),
            "quick" | "q" => match arg.parse() {
                Ok(n) => Command::Quick(Some(n)),
                Err(_) => Command::Unknown(line.to_string()),
            },
            "status" => Command::Status,
            "history" => Command::History,
            "clear" => Command::Clear,
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
/key <api-key>     validate and store a Groq API key
/scrape <url>      download a website and extract its text
/ask <question>    ask about the website (plain text works too)
/quick [n]         list quick questions, or ask number n
/status            show key, website and conversation status
/history           print the conversation so far
/clear             clear the conversation
/reset             forget the key, the website and the conversation
/quit              exit";
