//! Protocol engine - Interprets server frames and player commands
//!
//! The engine is a synchronous state machine. Each inbound frame or typed line is
//! handled to completion: output goes to a [`Terminal`], outbound frames go to a
//! [`FrameSink`], and the next prompt is recorded rather than awaited. The
//! session loop owns all the waiting.

mod command;
mod terminal;
mod traits;

#[cfg(test)]
pub mod testing;

pub use command::*;
pub use terminal::*;
pub use traits::*;

use crate::network::ConnectionError;
use crate::protocol::{ClientMessage, Frame, ServerMessage};

const AUTH_PROMPT: &str = "Enter authorization password: ";
const COMMAND_PROMPT: &str = "Enter command: ";
const PROMPT_SEPARATOR: &str = "*****";

const PASSWORD_SENT: &str = "Password buffer sent.";
const AUTH_SUCCESS: &str = "Authorization successful,\nReceived client ID: ";
const USE_HELP: &str = "\nUse the command \"-h\" or \"help\" for list available commands.";
const WRONG_PASSWORD: &str = "Wrong password. Disconnected by server.";
const MATCH_CONFIRMED: &str = "Match request confirmed.";
const OPPONENT_UNAVAILABLE: &str = "Error: Opponent not available.";
const NEW_GAME: &str = "New game started! Word to guess: ";
const HINT_RECEIVED: &str = "Hint received: ";

/// The prompt the engine is waiting on an answer for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Password,
    Command,
}

impl PromptKind {
    pub fn label(self) -> &'static str {
        match self {
            PromptKind::Password => AUTH_PROMPT,
            PromptKind::Command => COMMAND_PROMPT,
        }
    }
}

/// Whether the session should keep going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Terminate,
}

/// Client side of the game protocol
pub struct ProtocolEngine {
    rules: CommandRules,
    authenticated: bool,
    client_id: Option<u32>,
    pending: Option<PromptKind>,
    anomalies: u64,
}

impl ProtocolEngine {
    pub fn new(rules: CommandRules) -> Self {
        Self {
            rules,
            authenticated: false,
            client_id: None,
            pending: None,
            anomalies: 0,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    /// The prompt currently waiting for a line, if any
    pub fn pending_prompt(&self) -> Option<PromptKind> {
        self.pending
    }

    /// Number of unknown or out-of-order frames seen so far
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    /// Handle one frame received from the server
    pub fn handle_frame<T: Terminal, S: FrameSink>(
        &mut self,
        frame: &Frame,
        terminal: &mut T,
        sink: &mut S,
    ) -> Step {
        tracing::debug!(code = %frame.describe(), len = frame.payload.len(), "frame received");

        let message = match ServerMessage::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Malformed {} frame: {}", frame.describe(), e);
                terminal.show(&format!("Error: Malformed {} frame: {}", frame.describe(), e));
                self.reprompt(terminal);
                return Step::Continue;
            }
        };

        if let Some(code) = frame.command() {
            if !self.authenticated && code.requires_identity() {
                self.anomalies += 1;
                tracing::warn!("Received {} before a client ID was assigned", code);
            }
        }

        self.handle_message(message, terminal, sink)
    }

    /// Handle one decoded server message
    pub fn handle_message<T: Terminal, S: FrameSink>(
        &mut self,
        message: ServerMessage,
        terminal: &mut T,
        sink: &mut S,
    ) -> Step {
        match message {
            ServerMessage::Welcome(text) => {
                terminal.show(&text);
                self.request_prompt(PromptKind::Password, terminal);
            }
            ServerMessage::ClientId(id) => {
                self.authenticated = true;
                self.client_id = Some(id);
                tracing::info!(client_id = id, "authenticated");
                terminal.show(&format!("{}{}", AUTH_SUCCESS, id));
                terminal.show(USE_HELP);
                self.request_prompt(PromptKind::Command, terminal);
            }
            ServerMessage::WrongPassword => {
                terminal.show(WRONG_PASSWORD);
                self.pending = None;
                sink.close();
                tracing::info!("password rejected, closing connection");
                return Step::Terminate;
            }
            ServerMessage::OpponentsList(ids) => {
                terminal.show(&format!("Number of opponents: {}", ids.len()));
                for id in ids {
                    terminal.show(&format!("Opponent ID: {}", id));
                }
                self.reprompt(terminal);
            }
            ServerMessage::MatchConfirm => {
                terminal.show(MATCH_CONFIRMED);
                self.reprompt(terminal);
            }
            ServerMessage::OpponentUnavailable => {
                terminal.show(OPPONENT_UNAVAILABLE);
                self.reprompt(terminal);
            }
            ServerMessage::NewGame(word) => {
                terminal.show(&format!("{}{}", NEW_GAME, mask_word(&word)));
                self.reprompt(terminal);
            }
            ServerMessage::Success(text)
            | ServerMessage::IncorrectGuess(text)
            | ServerMessage::Info(text)
            | ServerMessage::Error(text) => {
                terminal.show(&text);
                self.reprompt(terminal);
            }
            ServerMessage::Hint(text) => {
                terminal.show(&format!("{}{}", HINT_RECEIVED, text));
                self.reprompt(terminal);
            }
            ServerMessage::Unexpected(code) => {
                self.anomalies += 1;
                tracing::warn!("Ignoring client-only command {} sent by the server", code);
            }
            ServerMessage::Unknown(code) => {
                self.anomalies += 1;
                tracing::warn!("Ignoring unknown command code 0x{:02X}", code);
            }
        }

        Step::Continue
    }

    /// Handle one line typed by the player
    pub fn handle_line<T: Terminal, S: FrameSink>(
        &mut self,
        line: &str,
        terminal: &mut T,
        sink: &mut S,
    ) -> Step {
        match self.pending.take() {
            Some(PromptKind::Password) => {
                let message = ClientMessage::PasswordSubmit(line.trim().to_string());
                match self.transmit(&message, sink) {
                    Ok(()) => terminal.show(PASSWORD_SENT),
                    Err(e) => report_send_failure(e, terminal),
                }
            }
            Some(PromptKind::Command) => {
                self.run_command(line, terminal, sink);
                self.request_prompt(PromptKind::Command, terminal);
            }
            None => {
                tracing::debug!("input ignored, no prompt outstanding");
            }
        }

        Step::Continue
    }

    fn run_command<T: Terminal, S: FrameSink>(&mut self, line: &str, terminal: &mut T, sink: &mut S) {
        match parse_command(line, &self.rules) {
            Ok(UserCommand::Send(message)) => {
                if let Err(e) = self.transmit(&message, sink) {
                    report_send_failure(e, terminal);
                }
            }
            Ok(UserCommand::Help) => terminal.show(HELP_TEXT),
            Err(e) => terminal.show(&e.to_string()),
        }
    }

    fn transmit<S: FrameSink>(&self, message: &ClientMessage, sink: &mut S) -> Result<(), ConnectionError> {
        let frame = message.encode();
        tracing::debug!(code = %message.code(), len = frame.len(), "sending frame");
        sink.send(frame)
    }

    /// Draw a prompt and remember it as the one outstanding prompt
    fn request_prompt<T: Terminal>(&mut self, kind: PromptKind, terminal: &mut T) {
        if kind == PromptKind::Command {
            terminal.show(PROMPT_SEPARATOR);
        }
        terminal.prompt(kind.label());
        self.pending = Some(kind);
    }

    /// Prompt again after showing server output
    fn reprompt<T: Terminal>(&mut self, terminal: &mut T) {
        let kind = if self.authenticated {
            PromptKind::Command
        } else {
            self.pending.unwrap_or(PromptKind::Command)
        };
        self.request_prompt(kind, terminal);
    }
}

fn report_send_failure<T: Terminal>(error: ConnectionError, terminal: &mut T) {
    tracing::warn!("Failed to queue frame: {}", error);
    terminal.show("Error: No destination for submission, the connection is closed.");
}

/// One underscore per character, separated by spaces
pub fn mask_word(word: &str) -> String {
    vec!["_"; word.chars().count()].join(" ")
}
