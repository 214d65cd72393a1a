//! Serial command framing.
//!
//! Wire format:
//! ```text
//! ┌─────┬─────┬──────────────────────┬──────────────────────┐
//! │ '#' │ tag │ payload (0..=62 B)   │ CR / LF / end-burst  │
//! └─────┴─────┴──────────────────────┴──────────────────────┘
//! ```
//!
//! A *burst* is everything the serial port had pending when the main loop
//! polled it, however many reads it takes to drain.  A frame ends at a
//! line terminator or at the end of the burst, whichever comes first.  The only exceptions are a bare `#` and a
//! payload-bearing tag with nothing after it: those are kept and completed
//! by the next burst.
//!
//! Every burst ends with exactly one [`FrameOutcome::Idle`] or
//! [`FrameOutcome::Waiting`], preceded by one outcome per frame that
//! concluded inside it.

use heapless::{String, Vec};

use crate::app::commands::Command;
use crate::settings::{Field, PAYLOAD_LEN, RawValue};

/// Longest accepted frame, start byte and tag included.
pub const MAX_FRAME: usize = PAYLOAD_LEN + 2;

const START: u8 = b'#';

/// Result of feeding bytes to the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Nothing pending.
    Idle,
    /// Partial frame retained for the next burst.
    Waiting,
    /// A complete, well-formed command.
    Command(Command),
    /// A frame was discarded.
    Malformed(Malformed),
}

/// Why a frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformed {
    /// Bytes arrived outside a frame.
    MissingStart,
    /// Tag byte is not in the command table.
    UnknownTag(u8),
    /// Payload is not what the tag expects.
    BadPayload(u8),
    /// Frame exceeded [`MAX_FRAME`] bytes.
    TooLong,
}

/// Payload shape expected after each tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    None,
    Integer,
    Text,
}

fn shape(tag: u8) -> Option<Shape> {
    match tag {
        b'R' | b'T' | b'Z' => Some(Shape::None),
        b'P' | b'S' | b'A' | b'B' | b'C' | b'D' | b'F' | b'O' => Some(Shape::Integer),
        b'K' | b'U' | b'H' => Some(Shape::Text),
        _ => None,
    }
}

fn field(tag: u8) -> Option<Field> {
    Some(match tag {
        b'P' => Field::Period,
        b'A' => Field::R1,
        b'B' => Field::R2,
        b'C' => Field::Offset,
        b'D' => Field::Sensitivity,
        b'F' => Field::FeedId,
        b'K' => Field::ApiKey,
        b'U' => Field::FeedUrl,
        b'H' => Field::Host,
        b'O' => Field::Port,
        _ => return None,
    })
}

/// Decoder state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between frames.
    AwaitStart,
    /// `#` seen.
    AwaitTag,
    /// Collecting payload for `tag`.
    Payload { tag: u8 },
    /// Dropping the rest of a bad frame until line end / burst end.
    Discard,
}

/// Streaming `#<tag><payload>` parser.  Survives partial frames across
/// polls; never allocates.
#[derive(Debug, Clone)]
pub struct CommandParser {
    state: State,
    payload: Vec<u8, PAYLOAD_LEN>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            state: State::AwaitStart,
            payload: Vec::new(),
        }
    }

    /// Feed one whole burst.  `on_outcome` sees each concluded frame, then
    /// the trailing `Idle`/`Waiting`.
    ///
    /// Callers that read a burst in several chunks use [`push_byte`] per
    /// byte and [`finish_burst`] once the port is drained.
    ///
    /// [`push_byte`]: Self::push_byte
    /// [`finish_burst`]: Self::finish_burst
    pub fn feed(&mut self, burst: &[u8], mut on_outcome: impl FnMut(FrameOutcome)) {
        for &b in burst {
            if let Some(outcome) = self.push_byte(b) {
                on_outcome(outcome);
            }
        }
        if let Some(outcome) = self.finish_burst() {
            on_outcome(outcome);
        }
        on_outcome(if self.is_waiting() {
            FrameOutcome::Waiting
        } else {
            FrameOutcome::Idle
        });
    }

    /// Drop any partial frame.
    pub fn reset(&mut self) {
        self.state = State::AwaitStart;
        self.payload.clear();
    }

    /// Whether a partial frame is held.
    pub fn is_waiting(&self) -> bool {
        !matches!(self.state, State::AwaitStart)
    }

    /// Advance by one byte.  Returns the outcome of a frame concluded by
    /// this byte.
    pub fn push_byte(&mut self, b: u8) -> Option<FrameOutcome> {
        let line_end = b == b'\r' || b == b'\n';
        match self.state {
            State::AwaitStart => {
                if b == START {
                    self.state = State::AwaitTag;
                    None
                } else if line_end || b == b' ' {
                    None
                } else {
                    self.state = State::Discard;
                    Some(FrameOutcome::Malformed(Malformed::MissingStart))
                }
            }
            State::AwaitTag => {
                if b == START {
                    // restart
                    None
                } else if line_end {
                    self.state = State::AwaitStart;
                    Some(FrameOutcome::Malformed(Malformed::UnknownTag(b)))
                } else if shape(b).is_some() {
                    self.payload.clear();
                    self.state = State::Payload { tag: b };
                    None
                } else {
                    self.state = State::Discard;
                    Some(FrameOutcome::Malformed(Malformed::UnknownTag(b)))
                }
            }
            State::Payload { tag } => {
                if line_end {
                    self.state = State::AwaitStart;
                    Some(self.complete(tag))
                } else if self.payload.push(b).is_err() {
                    self.state = State::Discard;
                    Some(FrameOutcome::Malformed(Malformed::TooLong))
                } else {
                    None
                }
            }
            State::Discard => {
                if line_end {
                    self.state = State::AwaitStart;
                }
                None
            }
        }
    }

    /// The port has nothing more pending: terminate whatever frame is in
    /// progress, unless it has not reached its payload yet.
    pub fn finish_burst(&mut self) -> Option<FrameOutcome> {
        match self.state {
            State::Payload { tag }
                if !self.payload.is_empty() || shape(tag) == Some(Shape::None) =>
            {
                self.state = State::AwaitStart;
                Some(self.complete(tag))
            }
            State::Discard => {
                self.state = State::AwaitStart;
                None
            }
            _ => None,
        }
    }

    /// Turn a finished frame into a command.
    fn complete(&mut self, tag: u8) -> FrameOutcome {
        let outcome = match core::str::from_utf8(&self.payload) {
            Ok(text) => decode(tag, text.trim_matches(' ')),
            Err(_) => None,
        };
        self.payload.clear();
        match outcome {
            Some(cmd) => FrameOutcome::Command(cmd),
            None => FrameOutcome::Malformed(Malformed::BadPayload(tag)),
        }
    }
}

fn decode(tag: u8, payload: &str) -> Option<Command> {
    match shape(tag)? {
        Shape::None => payload.is_empty().then(|| match tag {
            b'R' => Command::Reset,
            b'T' => Command::CalibrateOffset,
            _ => Command::DumpSettings,
        }),
        Shape::Integer => {
            let v = parse_integer(payload)?;
            if tag == b'S' {
                return match v {
                    0 => Some(Command::SetRelay(false)),
                    1 => Some(Command::SetRelay(true)),
                    _ => None,
                };
            }
            Some(Command::Set(field(tag)?, RawValue::Int(v)))
        }
        Shape::Text => {
            let mut s: String<PAYLOAD_LEN> = String::new();
            s.push_str(payload).ok()?;
            Some(Command::Set(field(tag)?, RawValue::Text(s)))
        }
    }
}

/// Optional sign followed by ASCII digits, nothing else.
fn parse_integer(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
