//! STOMP 1.2 frame codec
//!
//! Frames travel as WebSocket text messages: a command line, `name:value`
//! header lines, a blank line, the body and a terminating NUL. A message
//! made only of end-of-line characters is a heart-beat.

use std::fmt;
use thiserror::Error;

pub const STOMP_VERSION: &str = "1.2";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Malformed header line: {0}")]
    MalformedHeader(String),
    #[error("Invalid escape sequence in header: {0}")]
    InvalidEscape(String),
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    fn parse(line: &str) -> Result<Self, FrameError> {
        Ok(match line {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(FrameError::UnknownCommand(other.to_string())),
        })
    }

    /// CONNECT and CONNECTED headers are sent verbatim
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Stomp | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Frame {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of `name`; repeated headers keep the first occurrence
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, name: &'static str) -> Result<&str, FrameError> {
        self.get(name).ok_or(FrameError::MissingHeader(name))
    }

    // ========================================================================
    // Client frames
    // ========================================================================

    pub fn connect(host: &str, authorization: &str, heartbeat_ms: u64) -> Self {
        Frame::new(Command::Connect)
            .header("accept-version", STOMP_VERSION)
            .header("host", host)
            .header("heart-beat", format!("{},{}", heartbeat_ms, heartbeat_ms))
            .header("Authorization", authorization)
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .header("id", id)
            .header("destination", destination)
            .header("ack", "auto")
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    // ========================================================================
    // Wire format
    // ========================================================================

    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode every frame in one transport message. Heart-beats yield no
    /// frames. A frame that fails to decode is reported in place and the
    /// scan resumes after its NUL terminator, so its neighbours still decode.
    pub fn decode_all(text: &str) -> Vec<Result<Frame, FrameError>> {
        let mut frames = Vec::new();
        let mut rest = text;

        loop {
            rest = rest.trim_start_matches(['\r', '\n']);
            if rest.is_empty() {
                break;
            }
            match Frame::decode_one(rest) {
                Ok((frame, consumed)) => {
                    frames.push(Ok(frame));
                    rest = &rest[consumed..];
                }
                Err(e) => {
                    frames.push(Err(e));
                    match rest.find('\0') {
                        Some(end) => rest = &rest[end + 1..],
                        None => break,
                    }
                }
            }
        }

        frames
    }

    /// Decode one frame at the start of `text`, returning it with the
    /// number of bytes consumed (including the NUL terminator when present).
    fn decode_one(text: &str) -> Result<(Frame, usize), FrameError> {
        let (head, body_start) = match text.find("\n\n") {
            Some(pos) => (&text[..pos], pos + 2),
            None => match text.find("\r\n\r\n") {
                Some(pos) => (&text[..pos], pos + 4),
                None => (text.trim_end_matches('\0'), text.len()),
            },
        };

        let mut lines = head.lines();
        let command = Command::parse(lines.next().unwrap_or_default().trim_end())?;
        let escaped = command.escapes_headers();

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))?;
            if escaped {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame_rest = &text[body_start.min(text.len())..];
        let content_length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok());

        let body_len = match content_length {
            Some(len) if len <= frame_rest.len() && frame_rest.is_char_boundary(len) => len,
            _ => frame_rest.find('\0').unwrap_or(frame_rest.len()),
        };

        let body = frame_rest[..body_len].to_string();
        let mut consumed = body_start.min(text.len()) + body_len;
        if text[consumed..].starts_with('\0') {
            consumed += 1;
        }

        Ok((
            Frame {
                command,
                headers,
                body,
            },
            consumed,
        ))
    }
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_ok(text: &str) -> Vec<Frame> {
        Frame::decode_all(text)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_encode_subscribe() {
        let frame = Frame::subscribe("sub-1", "/topic/alarms/order/7");
        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\nid:sub-1\ndestination:/topic/alarms/order/7\nack:auto\n\n\0"
        );
    }

    #[test]
    fn test_connect_headers_are_not_escaped() {
        let encoded = Frame::connect("broker", "Bearer a:b", 0).encode();
        assert!(encoded.starts_with("CONNECT\naccept-version:1.2\n"));
        assert!(encoded.contains("\nAuthorization:Bearer a:b\n"));
        assert!(encoded.contains("\nheart-beat:0,0\n"));
    }

    #[test]
    fn test_decode_message() {
        let text = "MESSAGE\ndestination:/topic/details/order/3\nsubscription:sub-2\nmessage-id:9\ncontent-type:application/json\n\n{\"id\":1}\0";
        let frames = decode_ok(text);

        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.get("subscription"), Some("sub-2"));
        assert_eq!(frame.require("destination").unwrap(), "/topic/details/order/3");
        assert_eq!(frame.body, "{\"id\":1}");
    }

    #[test]
    fn test_decode_honors_content_length() {
        let text = "MESSAGE\ndestination:/q\ncontent-length:5\n\na\0b\0c\0";
        let frames = decode_ok(text);
        // Body "a\0b\0c" is 5 bytes; the final NUL terminates the frame
        assert_eq!(frames[0].body, "a\0b\0c");
    }

    #[test]
    fn test_heartbeats_yield_nothing() {
        assert!(Frame::decode_all("\n").is_empty());
        assert!(Frame::decode_all("\r\n\n").is_empty());
    }

    #[test]
    fn test_decode_several_frames_in_one_message() {
        let text = "\nRECEIPT\nreceipt-id:1\n\n\0\nCONNECTED\nversion:1.2\nserver:RabbitMQ/3.12\n\n\0";
        let frames = decode_ok(text);

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Receipt);
        assert_eq!(frames[1].command, Command::Connected);
        assert_eq!(frames[1].get("server"), Some("RabbitMQ/3.12"));
    }

    #[test]
    fn test_header_escaping() {
        let frame = Frame::new(Command::Send).header("note", "a:b\\c\nd");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\\\c\\nd\n"));

        let decoded = decode_ok(&encoded);
        assert_eq!(decoded[0].get("note"), Some("a:b\\c\nd"));
    }

    #[test]
    fn test_repeated_header_first_wins() {
        let frames = decode_ok("MESSAGE\nfoo:1\nfoo:2\n\n\0");
        assert_eq!(frames[0].get("foo"), Some("1"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Frame::decode_all("BOGUS\n\n\0").as_slice(),
            [Err(FrameError::UnknownCommand(_))]
        ));
        assert!(matches!(
            Frame::decode_all("MESSAGE\nno-colon\n\n\0").as_slice(),
            [Err(FrameError::MalformedHeader(_))]
        ));
        assert!(matches!(
            Frame::decode_all("MESSAGE\nbad:\\t\n\n\0").as_slice(),
            [Err(FrameError::InvalidEscape(_))]
        ));
        assert_eq!(
            Frame::new(Command::Message).require("destination"),
            Err(FrameError::MissingHeader("destination"))
        );
    }

    #[test]
    fn test_bad_frame_does_not_drop_its_neighbours() {
        let text = "MESSAGE\ndestination:/a\n\none\0BOGUS\nx:y\n\nlost\0MESSAGE\ndestination:/b\n\ntwo\0";
        let results = Frame::decode_all(text);

        assert_eq!(results.len(), 3);
        assert!(matches!(results[1], Err(FrameError::UnknownCommand(_))));
        let good: Vec<Frame> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(good.len(), 2);
        assert_eq!(good[0].get("destination"), Some("/a"));
        assert_eq!(good[0].body, "one");
        assert_eq!(good[1].get("destination"), Some("/b"));
        assert_eq!(good[1].body, "two");
    }

    #[test]
    fn test_unterminated_bad_frame_ends_the_scan() {
        let results = Frame::decode_all("RECEIPT\nreceipt-id:1\n\n\0MESSAGE\nno-colon");
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Ok(ref f) if f.command == Command::Receipt));
        assert!(matches!(results[1], Err(FrameError::MalformedHeader(_))));
    }
}
