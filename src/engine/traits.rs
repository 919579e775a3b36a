//! Collaborator trait definitions
//!
//! Defines the interfaces the protocol engine drives: somewhere to show text and
//! prompts, and somewhere to send encoded frames.

use bytes::Bytes;

use crate::network::ConnectionError;

/// Trait for presenting output and prompts to the player
pub trait Terminal {
    /// Show one block of text
    fn show(&mut self, text: &str);

    /// Draw a prompt label. The answer arrives later as a line of user input.
    fn prompt(&mut self, label: &str);

    /// The player finished a line, so the prompt no longer occupies the cursor line
    fn line_entered(&mut self) {}
}

/// Trait for the outbound half of a connection
pub trait FrameSink {
    /// Queue an encoded frame for transmission without waiting for it to be written
    fn send(&mut self, frame: Bytes) -> Result<(), ConnectionError>;

    /// Tear the connection down. Later sends fail with `ConnectionError::Closed`.
    fn close(&mut self);
}
