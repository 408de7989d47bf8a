//! Slash commands.

/// A parsed `/command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Feedback,
    Payment,
    Reset,
    Profile,
    Predictions,
    Stop,
    Unknown(String),
}

impl Command {
    /// Parse a message text. Returns `None` for anything that is not a command.
    ///
    /// Only the first word counts, and a `@botname` suffix is ignored.
    pub fn parse(text: &str) -> Option<Command> {
        let word = text.trim_start().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);

        Some(match name.to_ascii_lowercase().as_str() {
            "start" | "intro" => Command::Start,
            "help" => Command::Help,
            "feedback" => Command::Feedback,
            "payment" => Command::Payment,
            "reset" => Command::Reset,
            "profile" => Command::Profile,
            "predictions" => Command::Predictions,
            "stop" => Command::Stop,
            _ => Command::Unknown(name.to_string()),
        })
    }

    /// Name for logs.
    pub fn name(&self) -> &str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::Feedback => "feedback",
            Command::Payment => "payment",
            Command::Reset => "reset",
            Command::Profile => "profile",
            Command::Predictions => "predictions",
            Command::Stop => "stop",
            Command::Unknown(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/intro"), Some(Command::Start));
        assert_eq!(Command::parse("/profile"), Some(Command::Profile));
        assert_eq!(Command::parse("/predictions now"), Some(Command::Predictions));
        assert_eq!(Command::parse("/STOP"), Some(Command::Stop));
    }

    #[test]
    fn strips_bot_suffix() {
        assert_eq!(Command::parse("/profile@numerologist_bot"), Some(Command::Profile));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            Command::parse("/horoscope"),
            Some(Command::Unknown("horoscope".into()))
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(Command::parse("Alice"), None);
        assert_eq!(Command::parse("01.02.2003"), None);
        assert_eq!(Command::parse("/"), None);
    }
}
