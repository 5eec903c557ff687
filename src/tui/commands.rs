pub const HELP_TEXT: &str =
    "/help  /clear  /status  /reindex  /exit | Enter send, PgUp/PgDn scroll, Ctrl+C quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    Clear,
    Status,
    Reindex,
    Exit,
    Unknown(String),
}

impl SlashCommand {
    /// Parses the first word of `input`. Arguments after it are ignored.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let cmd = input.split_whitespace().next().unwrap_or("");
        match cmd {
            "/help" | "/?" => Self::Help,
            "/clear" => Self::Clear,
            "/status" => Self::Status,
            "/reindex" => Self::Reindex,
            "/exit" | "/quit" => Self::Exit,
            _ => Self::Unknown(cmd.to_string()),
        }
    }

    #[must_use]
    pub fn is_command(input: &str) -> bool {
        input.trim_start().starts_with('/')
    }
}
