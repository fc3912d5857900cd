use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use app_thread::{Shutdown, ThreadContext, ThreadLifecycle};
use error_handler::{FrameError, ThreadError};
use logger::{LogLevel, Logger};

pub const START_MARKER: u32 = 0xBAAD_F00D;
pub const END_MARKER: u32 = 0xDEAD_BEEF;

/// Start marker, length, index and end marker.
pub const FRAME_OVERHEAD: usize = 16;
pub const MAX_FRAME_SIZE: usize = 2016;

const READ_BUFFER_SIZE: usize = 4096;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const BIND_RETRY_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u32,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    WaitStart,
    WaitLength,
    WaitMessage { length: usize },
}

/// Reassembles command frames from an arbitrarily chunked byte stream.
///
/// A frame on the wire is the start marker, the total frame length, the
/// sender's index, the body and the end marker. Integers are big-endian and
/// the length counts all of it, overhead included.
pub struct FrameDecoder {
    buffer: Vec<u8>,
    state: DecodeState,
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder { buffer: Vec::with_capacity(READ_BUFFER_SIZE), state: DecodeState::WaitStart }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Returns the next complete frame, `Ok(None)` when more bytes are
    /// needed. After an error the decoder is already back to looking for a
    /// start marker, so the caller just keeps going.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, FrameError> {
        loop {
            match self.state {
                DecodeState::WaitStart => {
                    if self.buffer.len() < 4 {
                        return Ok(None);
                    }
                    if read_u32(&self.buffer) != START_MARKER {
                        let skip = self.resync_offset();
                        logger::debug!("Invalid start marker, skipping {} bytes", skip);
                        self.buffer.drain(..skip);
                        continue;
                    }
                    self.buffer.drain(..4);
                    self.state = DecodeState::WaitLength;
                }
                DecodeState::WaitLength => {
                    if self.buffer.len() < 4 {
                        return Ok(None);
                    }
                    let length = read_u32(&self.buffer);
                    self.buffer.drain(..4);
                    if !(FRAME_OVERHEAD..=MAX_FRAME_SIZE).contains(&(length as usize)) {
                        self.state = DecodeState::WaitStart;
                        return Err(FrameError::InvalidLength(length));
                    }
                    self.state = DecodeState::WaitMessage { length: length as usize };
                }
                DecodeState::WaitMessage { length } => {
                    // start marker and length are already consumed
                    let remaining = length - 8;
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }
                    let packet: Vec<u8> = self.buffer.drain(..remaining).collect();
                    self.state = DecodeState::WaitStart;

                    let end = read_u32(&packet[remaining - 4..]);
                    if end != END_MARKER {
                        return Err(FrameError::BadEndMarker(end));
                    }
                    let body = String::from_utf8_lossy(&packet[4..remaining - 4]);
                    return Ok(Some(Frame {
                        index: read_u32(&packet),
                        body: body.trim_end_matches('\0').to_string(),
                    }));
                }
            }
        }
    }

    /// Distance to the next byte that could begin a start marker, at least 1.
    fn resync_offset(&self) -> usize {
        let first = START_MARKER.to_be_bytes()[0];
        self.buffer
            .iter()
            .skip(1)
            .position(|&byte| byte == first)
            .map_or(self.buffer.len(), |offset| offset + 1)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn encode_frame(index: u32, body: &str) -> Vec<u8> {
    let length = FRAME_OVERHEAD + body.len();
    let mut frame = Vec::with_capacity(length);
    frame.extend_from_slice(&START_MARKER.to_be_bytes());
    frame.extend_from_slice(&(length as u32).to_be_bytes());
    frame.extend_from_slice(&index.to_be_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame.extend_from_slice(&END_MARKER.to_be_bytes());
    frame
}

/// The acknowledgement for `received_index`, numbered by our own counter.
pub fn encode_ack(ack_index: u32, received_index: u32) -> Vec<u8> {
    encode_frame(ack_index, &format!("ACK {}", received_index))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetLogLevel(LogLevel),
    UnknownLevel(String),
    Unknown(String),
}

/// `key = value` with whitespace around either side ignored and the key
/// matched without regard to case.
pub fn parse_command(text: &str) -> Command {
    let text = text.trim();
    let Some((key, value)) = text.split_once('=') else {
        return Command::Unknown(text.to_string());
    };
    if !key.trim().eq_ignore_ascii_case("log_level") {
        return Command::Unknown(text.to_string());
    }
    let value = value.trim();
    match value.parse::<LogLevel>() {
        Ok(level) => Command::SetLogLevel(level),
        Err(_) => Command::UnknownLevel(value.to_string()),
    }
}

pub fn apply_command(logger: &Logger, command: &Command) {
    match command {
        Command::SetLogLevel(level) => {
            logger.update_level(*level);
            logger::info!("Log level changed to {}", level.as_str());
        }
        Command::UnknownLevel(value) => logger::warn!("Unknown log level: {}", value),
        Command::Unknown(text) => logger::warn!("Unknown command: {}", text),
    }
}

/// Accepts one operator connection at a time and applies the commands it
/// sends, acknowledging each frame.
pub struct CommandInterface {
    port: u16,
    logger: Arc<Logger>,
    io_timeout: Duration,
    ack_index: u32,
}

impl CommandInterface {
    pub fn new(port: u16, logger: Arc<Logger>, io_timeout: Duration) -> Self {
        CommandInterface { port, logger, io_timeout, ack_index: 1 }
    }

    fn listen(&self, ctx: &ThreadContext) -> Option<TcpListener> {
        while !ctx.shutdown_signalled() {
            match TcpListener::bind(("0.0.0.0", self.port)).and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            }) {
                Ok(listener) => {
                    logger::info!("Command interface listening on port {}", self.port);
                    return Some(listener);
                }
                Err(err) => {
                    logger::warn!("Cannot listen on port {}: {}, will retry", self.port, err);
                    ctx.shutdown().wait(BIND_RETRY_INTERVAL);
                }
            }
        }
        None
    }

    /// Reads frames until the client hangs up or shutdown is signalled.
    pub fn serve_client(&mut self,
                        mut stream: TcpStream,
                        shutdown: &Shutdown
    ) -> std::io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.io_timeout))?;

        let mut decoder = FrameDecoder::new();
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        while !shutdown.is_signalled() {
            let read = match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => read,
                Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(err) => return Err(err),
            };
            decoder.push(&chunk[..read]);

            loop {
                match decoder.next_frame() {
                    Ok(Some(frame)) => self.handle_frame(&mut stream, &frame)?,
                    Ok(None) => break,
                    Err(err) => logger::error!("Dropping command frame: {}", err),
                }
            }
        }
        Ok(())
    }

    fn handle_frame(&mut self,
                    stream: &mut TcpStream,
                    frame: &Frame
    ) -> std::io::Result<()> {
        logger::info!("Received command (index {}): {}", frame.index, frame.body);
        apply_command(&self.logger, &parse_command(&frame.body));

        stream.write_all(&encode_ack(self.ack_index, frame.index))?;
        logger::debug!("Sent ACK {} for index {}", self.ack_index, frame.index);
        self.ack_index = self.ack_index.wrapping_add(1);
        Ok(())
    }
}

impl ThreadLifecycle for CommandInterface {
    fn label(&self) -> &str {
        "COMMAND_INTERFACE"
    }

    fn run(&mut self, ctx: &ThreadContext) -> Result<(), ThreadError> {
        let Some(listener) = self.listen(ctx) else {
            return Ok(());
        };

        while !ctx.shutdown_signalled() {
            match listener.accept() {
                Ok((stream, peer)) => {
                    logger::info!("Command client connected from {}", peer);
                    if let Err(err) = self.serve_client(stream, ctx.shutdown()) {
                        logger::error!("Command client {} failed: {}", peer, err);
                    }
                    logger::info!("Command client {} disconnected", peer);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    ctx.shutdown().wait(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    logger::error!("Command accept failed: {}, will retry", err);
                    ctx.shutdown().wait(BIND_RETRY_INTERVAL);
                }
            }
        }
        logger::info!("Command interface shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logger::NoopLogTarget;
    use std::thread;

    fn decode_all(decoder: &mut FrameDecoder) -> Vec<Result<Frame, FrameError>> {
        let mut results = Vec::new();
        loop {
            match decoder.next_frame() {
                Ok(Some(frame)) => results.push(Ok(frame)),
                Ok(None) => return results,
                Err(err) => results.push(Err(err)),
            }
        }
    }

    #[test]
    fn decodes_complete_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&encode_frame(7, "log_level = debug"));
        assert_eq!(decoder.next_frame(), Ok(Some(Frame { index: 7, body: "log_level = debug".to_string() })));
        assert_eq!(decoder.next_frame(), Ok(None));
        assert!(decoder.buffer.is_empty());
    }

    #[test]
    fn decodes_frame_split_across_reads() {
        let frame = encode_frame(3, "log_level=trace");
        let mut decoder = FrameDecoder::new();
        for byte in &frame[..frame.len() - 1] {
            decoder.push(std::slice::from_ref(byte));
            assert_eq!(decoder.next_frame(), Ok(None));
        }
        decoder.push(&frame[frame.len() - 1..]);
        assert_eq!(decoder.next_frame().unwrap().unwrap().index, 3);
    }

    #[test]
    fn skips_garbage_before_start_marker() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0x00, 0xBA, 0x11, 0x22, 0x33, 0xBA, 0xAD]);
        decoder.push(&encode_frame(1, "hello"));
        decoder.push(&encode_frame(2, "again"));

        let frames = decode_all(&mut decoder);
        assert_eq!(frames, vec![
            Ok(Frame { index: 1, body: "hello".to_string() }),
            Ok(Frame { index: 2, body: "again".to_string() }),
        ]);
    }

    #[test]
    fn rejects_out_of_range_length_and_recovers() {
        let mut decoder = FrameDecoder::new();
        let mut short = START_MARKER.to_be_bytes().to_vec();
        short.extend_from_slice(&8u32.to_be_bytes());
        decoder.push(&short);
        decoder.push(&encode_frame(5, "after"));

        let frames = decode_all(&mut decoder);
        assert_eq!(frames[0], Err(FrameError::InvalidLength(8)));
        assert_eq!(frames[1], Ok(Frame { index: 5, body: "after".to_string() }));

        let mut oversized = START_MARKER.to_be_bytes().to_vec();
        oversized.extend_from_slice(&(MAX_FRAME_SIZE as u32 + 1).to_be_bytes());
        decoder.push(&oversized);
        assert_eq!(decoder.next_frame(), Err(FrameError::InvalidLength(2017)));
    }

    #[test]
    fn drops_frame_with_bad_end_marker() {
        let mut corrupted = encode_frame(9, "log_level=error");
        let end = corrupted.len() - 4;
        corrupted[end..].copy_from_slice(&0x0BAD_CAFEu32.to_be_bytes());

        let mut decoder = FrameDecoder::new();
        decoder.push(&corrupted);
        decoder.push(&encode_frame(10, "next"));

        let frames = decode_all(&mut decoder);
        assert_eq!(frames[0], Err(FrameError::BadEndMarker(0x0BAD_CAFE)));
        assert_eq!(frames[1], Ok(Frame { index: 10, body: "next".to_string() }));
    }

    #[test]
    fn empty_body_is_a_valid_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&encode_frame(4, ""));
        assert_eq!(decoder.next_frame(), Ok(Some(Frame { index: 4, body: String::new() })));
    }

    #[test]
    fn ack_layout() {
        let ack = encode_ack(1, 42);
        assert_eq!(ack.len(), FRAME_OVERHEAD + "ACK 42".len());
        assert_eq!(&ack[..4], &[0xBA, 0xAD, 0xF0, 0x0D]);
        assert_eq!(read_u32(&ack[4..]), ack.len() as u32);
        assert_eq!(read_u32(&ack[8..]), 1);
        assert_eq!(&ack[12..18], b"ACK 42");
        assert_eq!(&ack[18..], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn parses_log_level_commands() {
        assert_eq!(parse_command("log_level=debug"), Command::SetLogLevel(LogLevel::Debug));
        assert_eq!(parse_command("  LOG_LEVEL =  Warning \r\n"), Command::SetLogLevel(LogLevel::Warn));
        assert_eq!(parse_command("log_level = loud"), Command::UnknownLevel("loud".to_string()));
        assert_eq!(parse_command("restart"), Command::Unknown("restart".to_string()));
        assert_eq!(parse_command("verbosity = debug"), Command::Unknown("verbosity = debug".to_string()));
    }

    #[test]
    fn applying_commands_updates_level() {
        let logger = Logger::new(LogLevel::Info, 16, Box::new(NoopLogTarget));
        apply_command(&logger, &parse_command("log_level = error"));
        assert_eq!(logger.get_log_level(), LogLevel::Error);

        apply_command(&logger, &parse_command("log_level = nonsense"));
        apply_command(&logger, &parse_command("reboot"));
        assert_eq!(logger.get_log_level(), LogLevel::Error);
    }

    #[test]
    fn client_session_changes_level_and_acks() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let logger = Arc::new(Logger::new(LogLevel::Info, 16, Box::new(NoopLogTarget)));
        let shutdown = Shutdown::new();

        let server = {
            let logger = logger.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                let (stream, _) = listener.accept().unwrap();
                let mut interface = CommandInterface::new(0, logger, Duration::from_millis(20));
                interface.serve_client(stream, &shutdown)
            })
        };

        let mut client = TcpStream::connect(address).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let mut acks = FrameDecoder::new();
        for (index, command) in [(11, "log_level = trace"), (12, "bogus")] {
            client.write_all(&encode_frame(index, command)).unwrap();
            let mut chunk = [0u8; 64];
            let ack = loop {
                let read = client.read(&mut chunk).unwrap();
                acks.push(&chunk[..read]);
                if let Some(frame) = acks.next_frame().unwrap() {
                    break frame;
                }
            };
            assert_eq!(ack.body, format!("ACK {}", index));
            assert_eq!(ack.index, index - 10);
        }
        assert_eq!(logger.get_log_level(), LogLevel::Trace);

        drop(client);
        assert!(server.join().unwrap().is_ok());
        shutdown.signal();
    }
}
