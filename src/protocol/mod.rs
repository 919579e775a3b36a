//! Protocol module - Defines the wire protocol spoken with the game server
//!
//! The protocol is deliberately small:
//! - 1 byte command code
//! - Payload whose layout is fixed by the command code
//! - Integers are unsigned 32-bit big-endian, text is UTF-8 running to the end of the frame
//!
//! There is no length prefix, magic number or version byte on the wire.

mod message;
mod codec;

pub use message::*;
pub use codec::*;

/// Default TCP port of the game server
pub const DEFAULT_PORT: u16 = 9999;

/// Default Unix socket path used by the server in local mode
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/unix_socket";

/// Maximum number of characters in a secret word, guess or hint sent by the client
pub const MAX_TEXT_LENGTH: usize = 24;
