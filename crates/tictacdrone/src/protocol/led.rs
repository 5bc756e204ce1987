//! Single-byte LED commands.

use super::ProtocolError;

/// Target value that clears every LED on the board.
pub const RESET_ALL: u8 = 9;

const TARGET_MASK: u8 = 0x7F;
const COLOR_BIT: u8 = 0x80;

/// LED color, carried in bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    /// Color 0, used for the human player's tiles.
    Player,
    /// Color 1, used for the vehicle's tiles.
    Machine,
}

impl LedColor {
    /// The color as a single bit.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::Player => 0,
            Self::Machine => 1,
        }
    }

    /// Build a color from its bit value; any non-zero value is `Machine`.
    #[must_use]
    pub const fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Self::Player
        } else {
            Self::Machine
        }
    }
}

/// A validated LED command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedCommand {
    target: u8,
    color: LedColor,
}

impl LedCommand {
    /// Light `tile` in `color`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TargetOutOfRange`] if `tile` is above the
    /// reset sentinel.
    pub fn tile(tile: u8, color: LedColor) -> Result<Self, ProtocolError> {
        if tile > RESET_ALL {
            return Err(ProtocolError::TargetOutOfRange(tile));
        }
        Ok(Self {
            target: tile,
            color,
        })
    }

    /// Turn every LED off.
    #[must_use]
    pub const fn reset_all() -> Self {
        Self {
            target: RESET_ALL,
            color: LedColor::Player,
        }
    }

    /// The tile index, or [`RESET_ALL`].
    #[must_use]
    pub const fn target(&self) -> u8 {
        self.target
    }

    /// The LED color.
    #[must_use]
    pub const fn color(&self) -> LedColor {
        self.color
    }

    /// Whether this is the reset-all command.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.target == RESET_ALL
    }

    /// Encode into one wire byte.
    #[must_use]
    pub const fn encode(&self) -> u8 {
        (self.color.bit() << 7) | (self.target & TARGET_MASK)
    }

    /// Decode one wire byte.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::TargetOutOfRange`] if the low 7 bits are above
    /// the reset sentinel.
    pub fn decode(byte: u8) -> Result<Self, ProtocolError> {
        Self::tile(byte & TARGET_MASK, LedColor::from_bit(byte & COLOR_BIT))
    }
}

/// Encode a tile (or [`RESET_ALL`]) and color into one byte.
///
/// # Errors
///
/// Returns [`ProtocolError::TargetOutOfRange`] if `tile_or_reset > 9`.
pub fn encode_led(tile_or_reset: u8, color: LedColor) -> Result<u8, ProtocolError> {
    LedCommand::tile(tile_or_reset, color).map(|cmd| cmd.encode())
}

/// Split a wire byte back into its tile (or [`RESET_ALL`]) and color.
///
/// # Errors
///
/// Returns [`ProtocolError::TargetOutOfRange`] if the low 7 bits are above 9.
pub fn decode_led(byte: u8) -> Result<(u8, LedColor), ProtocolError> {
    LedCommand::decode(byte).map(|cmd| (cmd.target(), cmd.color()))
}
