//! Protocol module - frames, operation codes and body grammars
//!
//! Every message is a UTF-8 frame `<code>\n<body>`. On the wire each frame
//! is followed by one more `\n`, so a frame is always exactly two lines (the
//! body line may be empty). Codes and bodies never contain a newline, which
//! keeps frame boundaries intact no matter how TCP splits or merges segments.
//!
//! | Code | Direction | Body |
//! |------|-----------|------|
//! | `mark` | either peer | `<x>,<y>` |
//! | `quit` | either peer | empty |
//! | `mark_made_ack` | host -> client | `<x> <y> <c\|n>` |
//! | `time` | host -> client | `hh:mm:ss` |
//! | `time_passed` | host -> client | empty |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::types::{Coordinate, Symbol};

// ============== Operation codes ==============

/// A remote player marked a cell
pub const MARK_CODE: &str = "mark";
/// The remote player left
pub const QUIT_CODE: &str = "quit";
/// Host confirms a move and the symbol it resolved to
pub const MARK_MADE_ACK_CODE: &str = "mark_made_ack";
/// Host reports the remaining turn time
pub const TIME_CODE: &str = "time";
/// Host reports that the turn time ran out
pub const TIME_PASSED_CODE: &str = "time_passed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("malformed mark body {0:?}")]
    MalformedMark(String),
    #[error("malformed mark_made_ack body {0:?}")]
    MalformedAck(String),
    #[error("malformed duration {0:?}")]
    MalformedDuration(String),
}

// ============== Frames ==============

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    code: String,
    body: String,
}

impl Frame {
    /// Build a frame, rejecting codes and bodies that would break framing.
    pub fn new(code: impl Into<String>, body: impl Into<String>) -> Result<Self, ProtocolError> {
        let code = code.into();
        let body = body.into();
        if code.is_empty() || code.chars().any(|c| c.is_whitespace() || !c.is_ascii()) {
            return Err(ProtocolError::InvalidFrame(format!("bad operation code {code:?}")));
        }
        if body.contains(['\n', '\r']) {
            return Err(ProtocolError::InvalidFrame(format!(
                "body of {code} contains a line break"
            )));
        }
        Ok(Self { code, body })
    }

    /// Split raw `<code>\n<body>` text at the first newline.
    ///
    /// Text without a newline is all code with an empty body. Trailing line
    /// terminators on either part are dropped.
    pub fn parse(raw: &str) -> Self {
        let (code, body) = raw.split_once('\n').unwrap_or((raw, ""));
        Self {
            code: code.trim_end_matches('\r').to_string(),
            body: body.trim_end_matches(['\r', '\n']).to_string(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// `<code>\n<body>`
    pub fn to_text(&self) -> String {
        format!("{}\n{}", self.code, self.body)
    }

    /// Append the wire form (`<code>\n<body>\n`) to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.code.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(self.body.as_bytes());
        out.push(b'\n');
    }
}

// ============== Outbound domain events ==============

/// Local events that may need to reach the peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Mark(Coordinate),
    Quit,
    MarkMadeAck(MoveAck),
    Time(Duration),
    TimePassed,
}

impl Outbound {
    pub fn code(&self) -> &'static str {
        match self {
            Outbound::Mark(_) => MARK_CODE,
            Outbound::Quit => QUIT_CODE,
            Outbound::MarkMadeAck(_) => MARK_MADE_ACK_CODE,
            Outbound::Time(_) => TIME_CODE,
            Outbound::TimePassed => TIME_PASSED_CODE,
        }
    }

    /// Body text in this code's grammar
    pub fn body(&self) -> String {
        match self {
            Outbound::Mark(c) => format_mark_body(*c),
            Outbound::Quit | Outbound::TimePassed => String::new(),
            Outbound::MarkMadeAck(ack) => ack.to_string(),
            Outbound::Time(d) => format_time_span(*d),
        }
    }
}

// ============== mark ==============

pub fn format_mark_body(c: Coordinate) -> String {
    format!("{},{}", c.x, c.y)
}

pub fn parse_mark_body(body: &str) -> Result<Coordinate, ProtocolError> {
    let malformed = || ProtocolError::MalformedMark(body.to_string());
    let (x, y) = body.split_once(',').ok_or_else(malformed)?;
    let x = x.trim().parse::<i32>().map_err(|_| malformed())?;
    let y = y.trim().parse::<i32>().map_err(|_| malformed())?;
    Ok(Coordinate::new(x, y))
}

// ============== mark_made_ack ==============

/// Host's confirmation of a move: `"<x> <y> <c|n>"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveAck {
    pub at: Coordinate,
    pub symbol: Symbol,
}

impl MoveAck {
    pub fn new(at: Coordinate, symbol: Symbol) -> Self {
        Self { at, symbol }
    }
}

impl fmt::Display for MoveAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.at.x, self.at.y, self.symbol.wire_char())
    }
}

impl FromStr for MoveAck {
    type Err = ProtocolError;

    /// Accepts exactly two unsigned decimal numbers and a `c`/`n` letter,
    /// separated by single spaces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError::MalformedAck(s.to_string());
        let text = s.trim_end_matches(['\r', '\n']);
        let mut parts = text.split(' ');
        let (Some(x), Some(y), Some(mark), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let number = |t: &str| -> Result<i32, ProtocolError> {
            if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            t.parse::<i32>().map_err(|_| malformed())
        };
        let mut letters = mark.chars();
        let symbol = match (letters.next(), letters.next()) {
            (Some(c), None) => Symbol::from_wire_char(c).ok_or_else(malformed)?,
            _ => return Err(malformed()),
        };
        Ok(MoveAck::new(Coordinate::new(number(x)?, number(y)?), symbol))
    }
}

// ============== time ==============

/// Format as `hh:mm:ss`, prefixed with `d.` once a day or more remains.
/// Sub-second parts are dropped.
pub fn format_time_span(d: Duration) -> String {
    let total = d.as_secs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

/// Parse `[d.]hh:mm[:ss[.fraction]]` or a bare day count.
pub fn parse_time_span(text: &str) -> Result<Duration, ProtocolError> {
    let malformed = || ProtocolError::MalformedDuration(text.to_string());
    let s = text.trim();
    let digits = |t: &str| -> Result<u64, ProtocolError> {
        if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        t.parse::<u64>().map_err(|_| malformed())
    };

    if !s.contains(':') {
        let secs = digits(s)?.checked_mul(86_400).ok_or_else(malformed)?;
        return Ok(Duration::from_secs(secs));
    }

    let (days, clock) = match s.split_once(':') {
        Some((head, _)) if head.contains('.') => {
            let (d, rest) = s.split_once('.').ok_or_else(malformed)?;
            (digits(d)?, rest)
        }
        _ => (0, s),
    };

    let mut fields = clock.split(':');
    let hours = digits(fields.next().ok_or_else(malformed)?)?;
    let minutes = digits(fields.next().ok_or_else(malformed)?)?;
    let (seconds, nanos) = match fields.next() {
        None => (0, 0),
        Some(sec) => match sec.split_once('.') {
            None => (digits(sec)?, 0),
            Some((whole, frac)) => (digits(whole)?, fraction_nanos(frac).ok_or_else(malformed)?),
        },
    };
    if fields.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return Err(malformed());
    }

    let secs = days
        .checked_mul(86_400)
        .and_then(|d| d.checked_add(hours * 3_600 + minutes * 60 + seconds))
        .ok_or_else(malformed)?;
    Ok(Duration::new(secs, nanos))
}

fn fraction_nanos(frac: &str) -> Option<u32> {
    if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let scale = 10u32.pow(9 - frac.len() as u32);
    frac.parse::<u32>().ok().map(|v| v * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_parse_splits_first_newline() {
        let f = Frame::parse("mark\n3,4");
        assert_eq!(f.code(), MARK_CODE);
        assert_eq!(f.body(), "3,4");

        let f = Frame::parse("quit");
        assert_eq!(f.code(), QUIT_CODE);
        assert_eq!(f.body(), "");
    }

    #[test]
    fn test_frame_rejects_line_breaks() {
        assert!(Frame::new("mark", "1,2\n3,4").is_err());
        assert!(Frame::new("ma rk", "").is_err());
        assert!(Frame::new("", "x").is_err());
    }

    #[test]
    fn test_encode_is_two_lines() {
        let mut buf = Vec::new();
        Frame::new(QUIT_CODE, "").unwrap().encode_into(&mut buf);
        Frame::new(TIME_CODE, "00:00:09").unwrap().encode_into(&mut buf);
        assert_eq!(buf, b"quit\n\ntime\n00:00:09\n");
    }

    #[test]
    fn test_move_ack_text() {
        let ack = MoveAck::new(Coordinate::new(3, 7), Symbol::Cross);
        assert_eq!(ack.to_string(), "3 7 c");
        assert_eq!("3 7 c".parse::<MoveAck>(), Ok(ack));
        assert_eq!(
            "12 0 n".parse::<MoveAck>().unwrap().symbol,
            Symbol::Nought
        );
    }

    #[test]
    fn test_move_ack_rejects_malformed() {
        for bad in ["", "3 7", "3 7 x", "-3 7 c", "3  7 c", "a 7 c", "3 7 cn", "3 7 c 1"] {
            assert!(bad.parse::<MoveAck>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_mark_body() {
        assert_eq!(parse_mark_body("10,-2"), Ok(Coordinate::new(10, -2)));
        assert_eq!(format_mark_body(Coordinate::new(4, 5)), "4,5");
        assert!(parse_mark_body("10;2").is_err());
        assert!(parse_mark_body("x,2").is_err());
    }

    #[test]
    fn test_time_span_formats() {
        assert_eq!(format_time_span(Duration::from_secs(7)), "00:00:07");
        assert_eq!(format_time_span(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_time_span(Duration::from_secs(90_061)), "1.01:01:01");
    }

    #[test]
    fn test_time_span_parses() {
        assert_eq!(parse_time_span("00:00:07"), Ok(Duration::from_secs(7)));
        assert_eq!(parse_time_span("01:02"), Ok(Duration::from_secs(3_720)));
        assert_eq!(parse_time_span("1.00:00:01"), Ok(Duration::from_secs(86_401)));
        assert_eq!(parse_time_span("00:00:07.5"), Ok(Duration::from_millis(7_500)));
        assert_eq!(parse_time_span("2"), Ok(Duration::from_secs(172_800)));
        assert!(parse_time_span("00:61:00").is_err());
        assert!(parse_time_span("seven").is_err());
        assert!(parse_time_span("-00:00:07").is_err());
    }

    #[test]
    fn test_time_span_rejects_overflowing_days() {
        assert!(parse_time_span("999999999999999.00:00:00").is_err());
        assert!(parse_time_span("999999999999999").is_err());
        assert!(parse_time_span("213503982334601.23:59:59").is_err());
    }

    #[test]
    fn test_outbound_bodies() {
        assert_eq!(Outbound::Time(Duration::from_secs(9)).body(), "00:00:09");
        assert_eq!(Outbound::TimePassed.body(), "");
        assert_eq!(Outbound::Mark(Coordinate::new(1, 2)).code(), MARK_CODE);
    }
}
