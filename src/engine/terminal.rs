//! Console terminal
//!
//! Shows engine output on stdout and feeds lines typed on stdin back to the
//! session through a channel.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::Terminal;

/// Terminal backed by the process stdout
pub struct ConsoleTerminal {
    out: std::io::Stdout,
    /// A prompt label is on the current line, not yet followed by a newline
    prompt_open: bool,
}

impl ConsoleTerminal {
    pub fn new() -> Self {
        Self {
            out: std::io::stdout(),
            prompt_open: false,
        }
    }
}

impl Default for ConsoleTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for ConsoleTerminal {
    fn show(&mut self, text: &str) {
        let mut out = self.out.lock();
        if std::mem::take(&mut self.prompt_open) {
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn prompt(&mut self, label: &str) {
        let mut out = self.out.lock();
        let _ = write!(out, "{}", label);
        let _ = out.flush();
        self.prompt_open = true;
    }

    fn line_entered(&mut self) {
        self.prompt_open = false;
    }
}

/// Spawn a task that forwards every stdin line into the returned channel.
///
/// The channel closes when stdin reaches end of file.
pub fn spawn_line_reader(capacity: usize) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(capacity);

    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }
    });

    rx
}
