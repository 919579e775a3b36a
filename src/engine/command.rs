//! Interactive command grammar
//!
//! Turns one line typed at the command prompt into an outbound message, a local
//! action, or a validation error shown to the player.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::{ClientMessage, MAX_TEXT_LENGTH};

/// Help text listing the available commands
pub const HELP_TEXT: &str = "
Available commands:
  list opponents          - Request a list of opponents.
  match [id] [word]       - Request a match with an opponent by ID and provide a word to guess.
                            Note: The word to guess must be at most 24 characters long.
  guess [word]            - Make a guess for the word.
                            Note: The guess must be at most 24 characters long.
  hint [text]             - Send a hint to the opponent.
                            Note: The hint must be at most 24 characters long.
  give up                 - Give up the game.
  help                    - Show this help message.
";

/// Validation errors for typed commands. The message is what the player sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Error: Please provide - opponent ID and word to guess.")]
    MissingMatchArguments,

    #[error("Error: Invalid opponent ID: {0}")]
    InvalidOpponentId(String),

    #[error("Error: The word to guess must be at most {0} characters long.")]
    WordTooLong(usize),

    #[error("Error: No guess provided.")]
    MissingGuess,

    #[error("Error: The guess must be at most {0} characters long.")]
    GuessTooLong(usize),

    #[error("Error: No hint provided.")]
    MissingHint,

    #[error("Error: The hint must be at most {0} characters long.")]
    HintTooLong(usize),

    #[error("Unknown command")]
    Unknown,
}

/// What to do with an opponent id that is not a valid u32
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpponentIdPolicy {
    /// Use the leading digits (or 0) and send the request anyway
    #[default]
    Lenient,
    /// Reject the command locally
    Strict,
}

/// Limits applied to typed commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRules {
    pub max_text_length: usize,
    pub opponent_id_policy: OpponentIdPolicy,
}

impl Default for CommandRules {
    fn default() -> Self {
        Self {
            max_text_length: MAX_TEXT_LENGTH,
            opponent_id_policy: OpponentIdPolicy::Lenient,
        }
    }
}

/// A successfully parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Send this message to the server
    Send(ClientMessage),
    /// Show the help text locally
    Help,
}

/// Parse one line from the command prompt
pub fn parse_command(line: &str, rules: &CommandRules) -> Result<UserCommand, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.as_slice() {
        ["list", "opponents"] => Ok(UserCommand::Send(ClientMessage::ListOpponents)),
        ["give", "up"] => Ok(UserCommand::Send(ClientMessage::GiveUp)),
        ["help"] | ["-h"] => Ok(UserCommand::Help),
        ["match", rest @ ..] => parse_match(rest, rules),
        ["guess", rest @ ..] => {
            // Only the first word counts as the guess
            let guess = rest.first().ok_or(CommandError::MissingGuess)?;
            check_length(guess, rules, CommandError::GuessTooLong)?;
            Ok(UserCommand::Send(ClientMessage::Guess(guess.to_string())))
        }
        ["hint", rest @ ..] => {
            let hint = rest.join(" ");
            if hint.is_empty() {
                return Err(CommandError::MissingHint);
            }
            check_length(&hint, rules, CommandError::HintTooLong)?;
            Ok(UserCommand::Send(ClientMessage::Hint(hint)))
        }
        _ => Err(CommandError::Unknown),
    }
}

fn parse_match(args: &[&str], rules: &CommandRules) -> Result<UserCommand, CommandError> {
    if args.len() < 2 {
        return Err(CommandError::MissingMatchArguments);
    }

    let opponent_id = parse_opponent_id(args[0], rules.opponent_id_policy)?;
    let word = args[1..].join(" ");
    check_length(&word, rules, CommandError::WordTooLong)?;

    Ok(UserCommand::Send(ClientMessage::MatchRequest { opponent_id, word }))
}

fn parse_opponent_id(token: &str, policy: OpponentIdPolicy) -> Result<u32, CommandError> {
    if let Ok(id) = token.parse::<u32>() {
        return Ok(id);
    }

    match policy {
        OpponentIdPolicy::Strict => Err(CommandError::InvalidOpponentId(token.to_string())),
        OpponentIdPolicy::Lenient => {
            let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
            let id = digits.parse::<u32>().unwrap_or(0);
            tracing::warn!(token, id, "opponent id is not a valid number, sending it anyway");
            Ok(id)
        }
    }
}

fn check_length(
    text: &str,
    rules: &CommandRules,
    too_long: fn(usize) -> CommandError,
) -> Result<(), CommandError> {
    if text.chars().count() > rules.max_text_length {
        return Err(too_long(rules.max_text_length));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<UserCommand, CommandError> {
        parse_command(line, &CommandRules::default())
    }

    fn sent(line: &str) -> ClientMessage {
        match parse(line) {
            Ok(UserCommand::Send(message)) => message,
            other => panic!("expected a message for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_list_opponents() {
        assert_eq!(sent("list opponents"), ClientMessage::ListOpponents);
        assert_eq!(sent("  list \t  opponents  "), ClientMessage::ListOpponents);
        assert_eq!(parse("list"), Err(CommandError::Unknown));
        assert_eq!(parse("list opponents now"), Err(CommandError::Unknown));
    }

    #[test]
    fn test_match_joins_word() {
        assert_eq!(
            sent("match 5 hello   world"),
            ClientMessage::MatchRequest {
                opponent_id: 5,
                word: "hello world".to_string()
            }
        );
    }

    #[test]
    fn test_match_missing_arguments() {
        assert_eq!(parse("match"), Err(CommandError::MissingMatchArguments));
        assert_eq!(parse("match 5"), Err(CommandError::MissingMatchArguments));
    }

    #[test]
    fn test_match_word_too_long() {
        let line = format!("match 2 {}", "a".repeat(25));
        assert_eq!(parse(&line), Err(CommandError::WordTooLong(24)));

        let line = format!("match 2 {}", "a".repeat(24));
        assert!(parse(&line).is_ok());
    }

    #[test]
    fn test_match_lenient_opponent_id() {
        assert_eq!(
            sent("match abc word"),
            ClientMessage::MatchRequest {
                opponent_id: 0,
                word: "word".to_string()
            }
        );
        assert_eq!(
            sent("match 12x word"),
            ClientMessage::MatchRequest {
                opponent_id: 12,
                word: "word".to_string()
            }
        );
    }

    #[test]
    fn test_match_strict_opponent_id() {
        let rules = CommandRules {
            opponent_id_policy: OpponentIdPolicy::Strict,
            ..Default::default()
        };
        assert_eq!(
            parse_command("match abc word", &rules),
            Err(CommandError::InvalidOpponentId("abc".to_string()))
        );
        assert!(parse_command("match 3 word", &rules).is_ok());
    }

    #[test]
    fn test_guess() {
        assert_eq!(sent("guess apple"), ClientMessage::Guess("apple".to_string()));
        assert_eq!(sent("guess apple pie"), ClientMessage::Guess("apple".to_string()));
        assert_eq!(parse("guess"), Err(CommandError::MissingGuess));
        assert_eq!(parse("guess   "), Err(CommandError::MissingGuess));
    }

    #[test]
    fn test_guess_too_long() {
        let line = format!("guess {}", "x".repeat(25));
        assert_eq!(parse(&line), Err(CommandError::GuessTooLong(24)));
    }

    #[test]
    fn test_length_counts_characters() {
        let line = format!("guess {}", "é".repeat(24));
        assert!(parse(&line).is_ok());
    }

    #[test]
    fn test_hint() {
        assert_eq!(sent("hint it  is red"), ClientMessage::Hint("it is red".to_string()));
        assert_eq!(parse("hint"), Err(CommandError::MissingHint));

        let line = format!("hint {}", "y".repeat(25));
        assert_eq!(parse(&line), Err(CommandError::HintTooLong(24)));
    }

    #[test]
    fn test_give_up_and_help() {
        assert_eq!(sent("give up"), ClientMessage::GiveUp);
        assert_eq!(parse("give"), Err(CommandError::Unknown));
        assert_eq!(parse("help"), Ok(UserCommand::Help));
        assert_eq!(parse("-h"), Ok(UserCommand::Help));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse(""), Err(CommandError::Unknown));
        assert_eq!(parse("dance"), Err(CommandError::Unknown));
        assert_eq!(CommandError::Unknown.to_string(), "Unknown command");
    }
}
