//! In-band messages carried over the game channel once it is open.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Coin flip used for the host's colour when none is configured
    pub fn random() -> Self {
        if rand::thread_rng().gen_bool(0.5) {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::White => "w",
            Color::Black => "b",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::White => "white",
            Color::Black => "black",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid square '{0}'")]
pub struct InvalidSquare(pub String);

/// Board square in algebraic notation (`a1` .. `h8`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    /// 0 = file a
    file: u8,
    /// 0 = rank 1
    rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Self> {
        (file < 8 && rank < 8).then_some(Self { file, rank })
    }

    pub fn file(&self) -> u8 {
        self.file
    }

    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Every square of the board, a1 first
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Square { file, rank }))
    }
}

impl std::str::FromStr for Square {
    type Err = InvalidSquare;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(InvalidSquare(s.to_string()));
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| InvalidSquare(s.to_string()))
    }
}

impl TryFrom<String> for Square {
    type Error = InvalidSquare;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

/// Remaining seconds per side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clocks {
    pub white: u32,
    pub black: u32,
}

/// Starting time per side (10 minutes)
pub const DEFAULT_CLOCK_SECONDS: u32 = 600;

impl Default for Clocks {
    fn default() -> Self {
        Self {
            white: DEFAULT_CLOCK_SECONDS,
            black: DEFAULT_CLOCK_SECONDS,
        }
    }
}

/// Message exchanged over the game channel.
///
/// Wire form is `{"type": "<kind>", "payload": {...}}`; kinds without a
/// payload omit the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Envelope {
    Move {
        from: Square,
        to: Square,
    },
    Chat {
        text: String,
        sender: Option<Color>,
        /// Unix milliseconds
        timestamp: i64,
    },
    ClockSync {
        #[serde(rename = "timeWhite")]
        time_white: u32,
        #[serde(rename = "timeBlack")]
        time_black: u32,
    },
    GameStart {
        #[serde(rename = "hostColor")]
        host_color: Color,
    },
    HandshakeComplete,
    /// Terminal
    Disconnect,
}

impl Envelope {
    pub fn clock_sync(clocks: Clocks) -> Self {
        Envelope::ClockSync {
            time_white: clocks.white,
            time_black: clocks.black,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Move { .. } => "move",
            Envelope::Chat { .. } => "chat",
            Envelope::ClockSync { .. } => "clock-sync",
            Envelope::GameStart { .. } => "game-start",
            Envelope::HandshakeComplete => "handshake-complete",
            Envelope::Disconnect => "disconnect",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
