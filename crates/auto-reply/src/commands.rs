use chatrelay_config::CommandsConfig;

/// Control commands recognised in text content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop the history of the sender's conversation.
    ClearSession,
    /// Drop the history of every conversation.
    ClearAll,
}

impl Command {
    /// Match `content` against the configured command strings.
    ///
    /// Only an exact match counts: surrounding whitespace or extra text makes
    /// it a regular query.
    pub fn parse(content: &str, commands: &CommandsConfig) -> Option<Self> {
        if content == commands.clear_session {
            Some(Self::ClearSession)
        } else if content == commands.clear_all {
            Some(Self::ClearAll)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClearSession => "clear_session",
            Self::ClearAll => "clear_all",
        }
    }

    /// Acknowledgement text sent back once the command has run.
    pub fn acknowledgement(self, commands: &CommandsConfig) -> &str {
        match self {
            Self::ClearSession => &commands.clear_session_reply,
            Self::ClearAll => &commands.clear_all_reply,
        }
    }
}
