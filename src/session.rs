//! Session event loop
//!
//! Joins the two event sources of a connected client, bytes from the server and
//! lines from the player, into one sequential loop that drives the
//! [`ProtocolEngine`].

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use crate::engine::{FrameSink, ProtocolEngine, Step, Terminal};
use crate::protocol::{CodecError, FrameDecoder};

const READ_CHUNK_SIZE: usize = 4096;
const CONNECTION_CLOSED: &str = "Connection closed";

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] CodecError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The engine ended the session (wrong password)
    Terminated,
    /// The server closed the connection
    ServerClosed,
    /// The player's input reached end of file
    InputClosed,
}

/// Inbound traffic counters
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub lines_handled: u64,
}

/// One connected session
pub struct Session {
    engine: ProtocolEngine,
    decoder: FrameDecoder,
    stats: SessionStats,
}

impl Session {
    pub fn new(engine: ProtocolEngine, decoder: FrameDecoder) -> Self {
        Self {
            engine,
            decoder,
            stats: SessionStats::default(),
        }
    }

    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until the server closes, the engine terminates, or input ends.
    ///
    /// Every event is handled to completion before the next one is taken, so the
    /// engine never sees two events at once.
    pub async fn run<R, S, T>(
        &mut self,
        mut reader: R,
        sink: &mut S,
        terminal: &mut T,
        lines: &mut mpsc::Receiver<String>,
    ) -> SessionResult<SessionEnd>
    where
        R: AsyncRead + Unpin,
        S: FrameSink,
        T: Terminal,
    {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];

        loop {
            tokio::select! {
                read = reader.read(&mut chunk) => {
                    let n = read?;
                    if n == 0 {
                        if self.decoder.pending() > 0 {
                            tracing::warn!(
                                "Server closed the connection with {} bytes of an incomplete frame",
                                self.decoder.pending()
                            );
                        }
                        sink.close();
                        terminal.show(CONNECTION_CLOSED);
                        return Ok(SessionEnd::ServerClosed);
                    }

                    self.stats.bytes_received += n as u64;
                    for frame in self.decoder.push(&chunk[..n])? {
                        self.stats.frames_received += 1;
                        if self.engine.handle_frame(&frame, terminal, sink) == Step::Terminate {
                            terminal.show(CONNECTION_CLOSED);
                            return Ok(SessionEnd::Terminated);
                        }
                    }
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        tracing::info!("input closed, ending session");
                        sink.close();
                        return Ok(SessionEnd::InputClosed);
                    };

                    terminal.line_entered();
                    self.stats.lines_handled += 1;
                    if self.engine.handle_line(&line, terminal, sink) == Step::Terminate {
                        return Ok(SessionEnd::Terminated);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{Output, RecordingSink, RecordingTerminal};
    use crate::engine::CommandRules;
    use crate::network::{Connection, Endpoint};
    use std::collections::VecDeque;
    use tokio::io::AsyncWriteExt;

    fn session() -> Session {
        Session::new(ProtocolEngine::new(CommandRules::default()), FrameDecoder::new())
    }

    /// Answers each prompt with the next scripted line, like a player typing
    struct ScriptedTerminal {
        recording: RecordingTerminal,
        answers: VecDeque<&'static str>,
        tx: mpsc::Sender<String>,
    }

    impl Terminal for ScriptedTerminal {
        fn show(&mut self, text: &str) {
            self.recording.show(text);
        }

        fn prompt(&mut self, label: &str) {
            self.recording.prompt(label);
            if let Some(answer) = self.answers.pop_front() {
                self.tx.try_send(answer.to_string()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_client_id_split_across_reads() {
        let reader = tokio_test::io::Builder::new()
            .read(&[0x03, 0x00])
            .read(&[0x00, 0x00, 0x07])
            .build();

        let (_tx, mut lines) = mpsc::channel(1);
        let mut sink = RecordingSink::new();
        let mut terminal = RecordingTerminal::new();
        let mut session = session();

        let end = session
            .run(reader, &mut sink, &mut terminal, &mut lines)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::ServerClosed);
        assert_eq!(session.engine().client_id(), Some(7));
        assert!(terminal.all_text().contains("Received client ID: 7"));
        assert_eq!(session.stats().frames_received, 1);
        assert_eq!(session.stats().bytes_received, 5);
    }

    #[tokio::test]
    async fn test_wrong_password_stops_session() {
        let reader = tokio_test::io::Builder::new()
            .read(b"\x01Welcome to the server!")
            .read(&[0x04])
            .build();

        let (_tx, mut lines) = mpsc::channel(1);
        let mut sink = RecordingSink::new();
        let mut terminal = RecordingTerminal::new();
        let mut session = session();

        let end = session
            .run(reader, &mut sink, &mut terminal, &mut lines)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Terminated);
        assert!(sink.closed);
        assert!(terminal.all_text().contains("Wrong password"));
        assert_eq!(
            terminal.output.last(),
            Some(&Output::Shown(CONNECTION_CLOSED.to_string()))
        );
        assert_eq!(session.engine().pending_prompt(), None);
    }

    #[tokio::test]
    async fn test_input_closed_ends_session() {
        let (client, _server) = tokio::io::duplex(64);
        let (tx, mut lines) = mpsc::channel::<String>(1);
        drop(tx);

        let mut sink = RecordingSink::new();
        let mut terminal = RecordingTerminal::new();
        let end = session()
            .run(client, &mut sink, &mut terminal, &mut lines)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::InputClosed);
        assert!(sink.closed);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_an_error() {
        let reader = tokio_test::io::Builder::new()
            .read(&[0x06, 0xFF, 0xFF, 0xFF, 0xFF])
            .build();

        let (_tx, mut lines) = mpsc::channel(1);
        let mut sink = RecordingSink::new();
        let mut terminal = RecordingTerminal::new();
        let mut session = Session::new(
            ProtocolEngine::new(CommandRules::default()),
            FrameDecoder::with_max_frame_size(1024),
        );

        let err = session
            .run(reader, &mut sink, &mut terminal, &mut lines)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Protocol(CodecError::FrameTooLarge(..))));
    }

    /// Full exchange against a scripted server over an in-memory stream
    #[tokio::test]
    async fn test_game_exchange() {
        let (client, mut server) = tokio::io::duplex(4096);
        let (reader, mut handle, writer) =
            Connection::from_stream(client, Endpoint::default()).into_parts();

        let server_task = tokio::spawn(async move {
            server.write_all(b"\x01Welcome to the server!").await.unwrap();
            let mut password = [0u8; 11];
            server.read_exact(&mut password).await.unwrap();
            assert_eq!(&password, b"\x02mysecretpw");

            server.write_all(&[0x03, 0, 0, 0, 1]).await.unwrap();
            let mut list = [0u8; 1];
            server.read_exact(&mut list).await.unwrap();
            assert_eq!(list, [0x05]);

            server
                .write_all(&[0x06, 0, 0, 0, 1, 0, 0, 0, 2])
                .await
                .unwrap();
            let mut request = [0u8; 10];
            server.read_exact(&mut request).await.unwrap();
            assert_eq!(&request, b"\x07\x00\x00\x00\x02apple");

            server.write_all(&[0x08]).await.unwrap();
            server.write_all(b"\x0Ahidden").await.unwrap();
            server.shutdown().await.unwrap();
        });

        let (tx, mut lines) = mpsc::channel(8);
        let mut terminal = ScriptedTerminal {
            recording: RecordingTerminal::new(),
            answers: VecDeque::from(["mysecretpw", "list opponents", "match 2 apple"]),
            tx,
        };
        let mut session = session();

        let end = session
            .run(reader, &mut handle, &mut terminal, &mut lines)
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::ServerClosed);
        server_task.await.unwrap();
        let stats = writer.await.unwrap();
        assert_eq!(stats.frames_sent, 3);

        let text = terminal.recording.all_text();
        assert!(text.contains("Welcome to the server!"));
        assert!(text.contains("Received client ID: 1"));
        assert!(text.contains("Opponent ID: 2"));
        assert!(text.contains("Match request confirmed."));
        assert!(!text.contains("hidden"));
        assert_eq!(session.stats().lines_handled, 3);
        assert!(!handle.is_connected());
    }
}
