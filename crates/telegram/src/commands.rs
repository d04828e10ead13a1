/// Slash commands the bot answers directly instead of relaying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Info,
    Unknown(String),
}

/// Parse a slash command from message text.
///
/// Returns `None` for non-command text and for commands addressed to a
/// different bot (`/help@other_bot`).
pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let rest = text.trim().strip_prefix('/')?;
    let token = rest.split_whitespace().next()?;
    if token.is_empty() {
        return None;
    }

    let (name, target) = match token.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (token, None),
    };
    if let (Some(target), Some(own)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(own) {
            return None;
        }
    }

    Some(match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "info" => Command::Info,
        other => Command::Unknown(other.to_string()),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("/start", Command::Start)]
    #[case("/help", Command::Help)]
    #[case("/INFO", Command::Info)]
    #[case("/help some argument", Command::Help)]
    #[case("  /start  ", Command::Start)]
    fn parses_known_commands(#[case] text: &str, #[case] expected: Command) {
        assert_eq!(parse(text, None).unwrap(), expected);
    }

    #[test]
    fn unknown_command_keeps_its_name() {
        assert_eq!(
            parse("/frobnicate", None).unwrap(),
            Command::Unknown("frobnicate".to_string())
        );
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(parse("hello there", None).is_none());
        assert!(parse("", None).is_none());
        assert!(parse("/", None).is_none());
    }

    #[test]
    fn addressed_commands_check_the_bot_username() {
        assert_eq!(
            parse("/help@ferry_bot", Some("ferry_bot")).unwrap(),
            Command::Help
        );
        assert!(parse("/help@other_bot", Some("ferry_bot")).is_none());
        // Without a known username, addressed commands are still answered.
        assert_eq!(parse("/help@whoever", None).unwrap(), Command::Help);
    }
}
