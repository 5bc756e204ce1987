//! Wire protocol for the LED indicator board.
//!
//! Two encodings exist:
//!
//! - **Single byte** (current firmware): the low 7 bits carry a tile index
//!   `0..=8` or the reset-all sentinel `9`, bit 7 carries the LED color.
//! - **Legacy frame**: seven bytes `[0xFF, command, d1_hi, d1_lo, d2_hi, d2_lo, escape]`.
//!   Payload bytes equal to the `0xFF` start marker are sent as `0x00` and
//!   flagged in the escape byte.
//!
//! # Example
//!
//! ```
//! use tictacdrone::protocol::{encode_frame, encode_led, LedColor};
//!
//! assert_eq!(encode_led(4, LedColor::Player).unwrap(), 0b0000_0100);
//! assert_eq!(encode_led(0, LedColor::Machine).unwrap(), 0b1000_0000);
//! assert_eq!(encode_frame(1, 255, 0), [0xFF, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04]);
//! ```

mod frame;
mod led;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use frame::{
    decode_frame, encode_frame, DecodedFrame, EscapeFlags, Frame, FrameDecoder, FRAME_LEN,
    START_MARKER,
};
pub use led::{decode_led, encode_led, LedColor, LedCommand, RESET_ALL};

/// Command byte used when an LED update is sent over the legacy framing.
///
/// `data1` carries the tile (or reset sentinel) and `data2` the color bit.
pub const LEGACY_LED_COMMAND: u8 = 1;

/// Errors raised while encoding or decoding wire bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The LED target is neither a tile nor the reset sentinel.
    #[error("LED target {0} is out of range (expected 0..=9)")]
    TargetOutOfRange(u8),

    /// A frame did not have exactly seven bytes.
    #[error("frame must be {FRAME_LEN} bytes, got {0}")]
    FrameLength(usize),

    /// A frame did not begin with the start marker.
    #[error("frame does not start with 0xFF (found {0:#04x})")]
    MissingStartMarker(u8),

    /// The escape byte had bits set above bit 3.
    #[error("escape byte {0:#010b} has unknown bits set")]
    InvalidEscape(u8),
}

/// How LED updates are framed on the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// One byte per LED command.
    #[default]
    Single,
    /// Seven-byte escaped frame.
    Legacy,
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

/// A command ready to be written to the indicator board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCommand {
    /// Single-byte LED command.
    Led(LedCommand),
    /// Legacy seven-byte frame.
    Frame(Frame),
}

impl WireCommand {
    /// Wrap an LED command in the requested framing.
    #[must_use]
    pub fn led(command: LedCommand, framing: Framing) -> Self {
        match framing {
            Framing::Single => Self::Led(command),
            Framing::Legacy => Self::Frame(Frame::new(
                LEGACY_LED_COMMAND,
                u32::from(command.target()),
                u32::from(command.color().bit()),
            )),
        }
    }

    /// The bytes to put on the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Led(cmd) => vec![cmd.encode()],
            Self::Frame(frame) => frame.encode().to_vec(),
        }
    }
}
