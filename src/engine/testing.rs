//! In-memory collaborators for tests

use bytes::Bytes;

use super::{FrameSink, Terminal};
use crate::network::ConnectionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Shown(String),
    Prompt(String),
}

/// Terminal that records everything it is asked to show
#[derive(Debug, Default)]
pub struct RecordingTerminal {
    pub output: Vec<Output>,
}

impl RecordingTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<&str> {
        self.output
            .iter()
            .filter_map(|o| match o {
                Output::Shown(text) => Some(text.as_str()),
                Output::Prompt(_) => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<&str> {
        self.output
            .iter()
            .filter_map(|o| match o {
                Output::Prompt(label) => Some(label.as_str()),
                Output::Shown(_) => None,
            })
            .collect()
    }

    pub fn all_text(&self) -> String {
        self.output
            .iter()
            .map(|o| match o {
                Output::Shown(text) | Output::Prompt(text) => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.output.clear();
    }
}

impl Terminal for RecordingTerminal {
    fn show(&mut self, text: &str) {
        self.output.push(Output::Shown(text.to_string()));
    }

    fn prompt(&mut self, label: &str) {
        self.output.push(Output::Prompt(label.to_string()));
    }
}

/// Sink that keeps every frame instead of writing it anywhere
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sent: Vec<Bytes>,
    pub closed: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for RecordingSink {
    fn send(&mut self, frame: Bytes) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.sent.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
