//! Protocol message definitions
//!
//! Defines the command vocabulary and the typed messages exchanged with the game server.

use bytes::{BufMut, Bytes, BytesMut};

use super::codec::{decode_text, decode_u32, decode_u32_at, encode_text, encode_u32, CodecError};

/// Which side of the connection sends a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
    Both,
}

/// How the payload following a command code is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// No payload at all
    Empty,
    /// A single u32
    Uint32,
    /// A u32 count followed by that many u32 values
    Uint32List,
    /// UTF-8 text running to the end of the frame
    Text,
    /// A u32 followed by UTF-8 text running to the end of the frame
    Uint32Text,
    /// No meaningful payload, but trailing bytes may be present and are discarded
    TrailingIgnored,
}

/// Command codes, the first byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandCode {
    Welcome = 0x01,
    PasswordSubmit = 0x02,
    ClientId = 0x03,
    WrongPassword = 0x04,
    ListOpponents = 0x05,
    OpponentsList = 0x06,
    MatchRequest = 0x07,
    MatchConfirm = 0x08,
    OpponentUnavailable = 0x09,
    NewGame = 0x0A,
    Guess = 0x0B,
    Success = 0x0C,
    IncorrectGuess = 0x0D,
    Hint = 0x0E,
    Info = 0x0F,
    Error = 0x10,
    GiveUp = 0x11,
}

impl CommandCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandCode::Welcome => "Welcome",
            CommandCode::PasswordSubmit => "PasswordSubmit",
            CommandCode::ClientId => "ClientId",
            CommandCode::WrongPassword => "WrongPassword",
            CommandCode::ListOpponents => "ListOpponents",
            CommandCode::OpponentsList => "OpponentsList",
            CommandCode::MatchRequest => "MatchRequest",
            CommandCode::MatchConfirm => "MatchConfirm",
            CommandCode::OpponentUnavailable => "OpponentUnavailable",
            CommandCode::NewGame => "NewGame",
            CommandCode::Guess => "Guess",
            CommandCode::Success => "Success",
            CommandCode::IncorrectGuess => "IncorrectGuess",
            CommandCode::Hint => "Hint",
            CommandCode::Info => "Info",
            CommandCode::Error => "Error",
            CommandCode::GiveUp => "GiveUp",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            CommandCode::PasswordSubmit
            | CommandCode::ListOpponents
            | CommandCode::MatchRequest
            | CommandCode::Guess
            | CommandCode::GiveUp => Direction::ToServer,
            CommandCode::Hint => Direction::Both,
            _ => Direction::ToClient,
        }
    }

    pub fn layout(self) -> PayloadLayout {
        match self {
            CommandCode::WrongPassword
            | CommandCode::ListOpponents
            | CommandCode::MatchConfirm
            | CommandCode::GiveUp => PayloadLayout::Empty,
            CommandCode::ClientId => PayloadLayout::Uint32,
            CommandCode::OpponentsList => PayloadLayout::Uint32List,
            CommandCode::MatchRequest => PayloadLayout::Uint32Text,
            CommandCode::OpponentUnavailable => PayloadLayout::TrailingIgnored,
            CommandCode::Welcome
            | CommandCode::PasswordSubmit
            | CommandCode::NewGame
            | CommandCode::Guess
            | CommandCode::Success
            | CommandCode::IncorrectGuess
            | CommandCode::Hint
            | CommandCode::Info
            | CommandCode::Error => PayloadLayout::Text,
        }
    }

    /// Codes the server only sends once the client has been given an identity
    pub fn requires_identity(self) -> bool {
        matches!(
            self,
            CommandCode::OpponentsList
                | CommandCode::MatchConfirm
                | CommandCode::OpponentUnavailable
                | CommandCode::NewGame
                | CommandCode::Success
                | CommandCode::IncorrectGuess
                | CommandCode::Hint
        )
    }
}

impl TryFrom<u8> for CommandCode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            0x01 => CommandCode::Welcome,
            0x02 => CommandCode::PasswordSubmit,
            0x03 => CommandCode::ClientId,
            0x04 => CommandCode::WrongPassword,
            0x05 => CommandCode::ListOpponents,
            0x06 => CommandCode::OpponentsList,
            0x07 => CommandCode::MatchRequest,
            0x08 => CommandCode::MatchConfirm,
            0x09 => CommandCode::OpponentUnavailable,
            0x0A => CommandCode::NewGame,
            0x0B => CommandCode::Guess,
            0x0C => CommandCode::Success,
            0x0D => CommandCode::IncorrectGuess,
            0x0E => CommandCode::Hint,
            0x0F => CommandCode::Info,
            0x10 => CommandCode::Error,
            0x11 => CommandCode::GiveUp,
            other => return Err(other),
        })
    }
}

impl std::fmt::Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.as_u8())
    }
}

/// One raw frame cut from the byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Leading command byte, kept raw so unknown codes survive
    pub code: u8,
    /// Everything after the command byte
    pub payload: Bytes,
}

impl Frame {
    pub fn new(code: u8, payload: Bytes) -> Self {
        Self { code, payload }
    }

    pub fn command(&self) -> Option<CommandCode> {
        CommandCode::try_from(self.code).ok()
    }

    /// Human-readable name of the command code, for logs and error messages
    pub fn describe(&self) -> String {
        match self.command() {
            Some(code) => code.name().to_string(),
            None => format!("unknown 0x{:02X}", self.code),
        }
    }
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Greeting text, the server then expects a password
    Welcome(String),
    /// Identity assigned after a correct password
    ClientId(u32),
    /// Password rejected, the server closes the connection
    WrongPassword,
    /// Identities of the other connected players
    OpponentsList(Vec<u32>),
    /// Our match request was accepted
    MatchConfirm,
    /// Our match request could not be honoured
    OpponentUnavailable,
    /// An opponent started a game, carrying the word we have to guess
    NewGame(String),
    Success(String),
    IncorrectGuess(String),
    /// Hint from the player who chose the word
    Hint(String),
    Info(String),
    Error(String),
    /// A known code that only ever travels from client to server
    Unexpected(CommandCode),
    /// A code outside the protocol vocabulary
    Unknown(u8),
}

impl ServerMessage {
    /// Interpret a frame's payload according to its command code
    pub fn decode(frame: &Frame) -> Result<Self, CodecError> {
        let payload = &frame.payload[..];
        let code = match frame.command() {
            Some(code) => code,
            None => return Ok(ServerMessage::Unknown(frame.code)),
        };
        if code.direction() == Direction::ToServer {
            return Ok(ServerMessage::Unexpected(code));
        }

        let message = match code {
            CommandCode::Welcome => ServerMessage::Welcome(decode_text(payload)?),
            CommandCode::ClientId => ServerMessage::ClientId(decode_u32(payload)?),
            CommandCode::WrongPassword => ServerMessage::WrongPassword,
            CommandCode::OpponentsList => {
                let count = decode_u32(payload)? as usize;
                let mut ids = Vec::with_capacity(count.min(payload.len() / 4));
                for i in 0..count {
                    ids.push(decode_u32_at(payload, 4 + 4 * i)?);
                }
                ServerMessage::OpponentsList(ids)
            }
            CommandCode::MatchConfirm => ServerMessage::MatchConfirm,
            CommandCode::OpponentUnavailable => ServerMessage::OpponentUnavailable,
            CommandCode::NewGame => ServerMessage::NewGame(decode_text(payload)?),
            CommandCode::Success => ServerMessage::Success(decode_text(payload)?),
            CommandCode::IncorrectGuess => ServerMessage::IncorrectGuess(decode_text(payload)?),
            CommandCode::Hint => ServerMessage::Hint(decode_text(payload)?),
            CommandCode::Info => ServerMessage::Info(decode_text(payload)?),
            CommandCode::Error => ServerMessage::Error(decode_text(payload)?),
            CommandCode::PasswordSubmit
            | CommandCode::ListOpponents
            | CommandCode::MatchRequest
            | CommandCode::Guess
            | CommandCode::GiveUp => ServerMessage::Unexpected(code),
        };

        Ok(message)
    }
}

/// Messages sent by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    PasswordSubmit(String),
    ListOpponents,
    MatchRequest { opponent_id: u32, word: String },
    Guess(String),
    Hint(String),
    GiveUp,
}

impl ClientMessage {
    pub fn code(&self) -> CommandCode {
        match self {
            ClientMessage::PasswordSubmit(_) => CommandCode::PasswordSubmit,
            ClientMessage::ListOpponents => CommandCode::ListOpponents,
            ClientMessage::MatchRequest { .. } => CommandCode::MatchRequest,
            ClientMessage::Guess(_) => CommandCode::Guess,
            ClientMessage::Hint(_) => CommandCode::Hint,
            ClientMessage::GiveUp => CommandCode::GiveUp,
        }
    }

    /// Encode into the wire format
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.code().as_u8());

        match self {
            ClientMessage::PasswordSubmit(text)
            | ClientMessage::Guess(text)
            | ClientMessage::Hint(text) => buf.put(encode_text(text)),
            ClientMessage::MatchRequest { opponent_id, word } => {
                buf.put_slice(&encode_u32(*opponent_id));
                buf.put(encode_text(word));
            }
            ClientMessage::ListOpponents | ClientMessage::GiveUp => {}
        }

        buf.freeze()
    }

    fn encoded_len(&self) -> usize {
        1 + match self {
            ClientMessage::PasswordSubmit(text)
            | ClientMessage::Guess(text)
            | ClientMessage::Hint(text) => text.len(),
            ClientMessage::MatchRequest { word, .. } => 4 + word.len(),
            ClientMessage::ListOpponents | ClientMessage::GiveUp => 0,
        }
    }
}
