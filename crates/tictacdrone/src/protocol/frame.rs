//! Legacy seven-byte framed commands.
//!
//! The receiver finds frame boundaries by looking for [`START_MARKER`], so no
//! payload byte may carry that value. Any data byte equal to `0xFF` is sent as
//! `0x00` with its escape bit set:
//!
//! | escape bit | payload byte |
//! |-----------:|--------------|
//! | 3          | `data1` high |
//! | 2          | `data1` low  |
//! | 1          | `data2` high |
//! | 0          | `data2` low  |
//!
//! The zeroed byte itself no longer carries the original value. [`decode_frame`]
//! reports the wire value together with the escape flags and leaves the
//! interpretation to the caller; [`DecodedFrame::restored`] applies the
//! "escaped means 0xFF" reading explicitly.

use tracing::trace;

use super::ProtocolError;

/// First byte of every frame.
pub const START_MARKER: u8 = 0xFF;

/// Total frame length in bytes.
pub const FRAME_LEN: usize = 7;

const ESCAPE_MASK: u8 = 0x0F;

/// A legacy command with its two data fields, already clamped to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    /// Command byte.
    pub command: u8,
    /// First data field.
    pub data1: u16,
    /// Second data field.
    pub data2: u16,
}

impl Frame {
    /// Build a frame, saturating each data field at 65535.
    #[must_use]
    pub fn new(command: u8, data1: u32, data2: u32) -> Self {
        Self {
            command,
            data1: u16::try_from(data1).unwrap_or(u16::MAX),
            data2: u16::try_from(data2).unwrap_or(u16::MAX),
        }
    }

    /// Encode into wire bytes, escaping any payload byte equal to the marker.
    #[must_use]
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let [d1_hi, d1_lo] = self.data1.to_be_bytes();
        let [d2_hi, d2_lo] = self.data2.to_be_bytes();
        let mut payload = [d1_hi, d1_lo, d2_hi, d2_lo];

        let mut escape = 0u8;
        for (i, byte) in payload.iter_mut().enumerate() {
            if *byte == START_MARKER {
                *byte = 0x00;
                escape |= 1 << (3 - i);
            }
        }
        if escape != 0 {
            trace!(command = self.command, escape, "Escaped frame payload");
        }

        [
            START_MARKER,
            self.command,
            payload[0],
            payload[1],
            payload[2],
            payload[3],
            escape,
        ]
    }
}

/// Which payload bytes were escaped in a received frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct EscapeFlags(u8);

impl EscapeFlags {
    /// Raw escape byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether no payload byte was escaped.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// High byte of `data1` was escaped.
    #[must_use]
    pub const fn data1_hi(self) -> bool {
        self.0 & 0b1000 != 0
    }

    /// Low byte of `data1` was escaped.
    #[must_use]
    pub const fn data1_lo(self) -> bool {
        self.0 & 0b0100 != 0
    }

    /// High byte of `data2` was escaped.
    #[must_use]
    pub const fn data2_hi(self) -> bool {
        self.0 & 0b0010 != 0
    }

    /// Low byte of `data2` was escaped.
    #[must_use]
    pub const fn data2_lo(self) -> bool {
        self.0 & 0b0001 != 0
    }
}

/// A frame as read off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Command and data exactly as transmitted (escaped bytes read as `0x00`).
    pub frame: Frame,
    /// Which payload bytes were escaped.
    pub escaped: EscapeFlags,
}

impl DecodedFrame {
    /// The frame with every escaped byte read back as `0xFF`.
    #[must_use]
    pub fn restored(&self) -> Frame {
        let fix = |value: u16, hi: bool, lo: bool| {
            let [mut h, mut l] = value.to_be_bytes();
            if hi {
                h = START_MARKER;
            }
            if lo {
                l = START_MARKER;
            }
            u16::from_be_bytes([h, l])
        };
        Frame {
            command: self.frame.command,
            data1: fix(
                self.frame.data1,
                self.escaped.data1_hi(),
                self.escaped.data1_lo(),
            ),
            data2: fix(
                self.frame.data2,
                self.escaped.data2_hi(),
                self.escaped.data2_lo(),
            ),
        }
    }
}

/// Encode a legacy command frame.
///
/// `data1` and `data2` are clamped to 65535 independently.
#[must_use]
pub fn encode_frame(command: u8, data1: u32, data2: u32) -> [u8; FRAME_LEN] {
    Frame::new(command, data1, data2).encode()
}

/// Decode one complete frame.
///
/// # Errors
///
/// Returns an error if `bytes` is not seven bytes long, does not start with
/// [`START_MARKER`], or carries unknown escape bits.
pub fn decode_frame(bytes: &[u8]) -> Result<DecodedFrame, ProtocolError> {
    let bytes: &[u8; FRAME_LEN] = bytes
        .try_into()
        .map_err(|_| ProtocolError::FrameLength(bytes.len()))?;
    if bytes[0] != START_MARKER {
        return Err(ProtocolError::MissingStartMarker(bytes[0]));
    }
    let escape = bytes[6];
    if escape & !ESCAPE_MASK != 0 {
        return Err(ProtocolError::InvalidEscape(escape));
    }

    Ok(DecodedFrame {
        frame: Frame {
            command: bytes[1],
            data1: u16::from_be_bytes([bytes[2], bytes[3]]),
            data2: u16::from_be_bytes([bytes[4], bytes[5]]),
        },
        escaped: EscapeFlags(escape),
    })
}

/// Byte-at-a-time frame reader.
///
/// A start marker seen mid-frame restarts collection, so the reader
/// resynchronises after a dropped byte. A command byte of `0xFF` is therefore
/// indistinguishable from a new frame and is never delivered.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create an idle decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a result once a full frame has been collected.
    pub fn push(&mut self, byte: u8) -> Option<Result<DecodedFrame, ProtocolError>> {
        if byte == START_MARKER {
            if self.buf.len() > 1 {
                trace!(dropped = self.buf.len(), "Resynchronising on start marker");
            }
            self.buf.clear();
            self.buf.push(byte);
            return None;
        }
        if self.buf.is_empty() {
            return None;
        }

        self.buf.push(byte);
        if self.buf.len() == FRAME_LEN {
            let result = decode_frame(&self.buf);
            self.buf.clear();
            return Some(result);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_low_byte_example() {
        assert_eq!(
            encode_frame(1, 255, 0),
            [0xFF, 0x01, 0x00, 0x00, 0x00, 0x00, 0b0000_0100]
        );
    }

    #[test]
    fn test_plain_frame_layout() {
        assert_eq!(
            encode_frame(0x22, 0x1234, 0x0A0B),
            [0xFF, 0x22, 0x12, 0x34, 0x0A, 0x0B, 0x00]
        );
    }

    #[test]
    fn test_data_is_clamped() {
        assert_eq!(Frame::new(3, 70_000, u32::MAX).data1, u16::MAX);
        // 0xFFFF escapes both bytes of both fields.
        assert_eq!(
            encode_frame(3, 70_000, 1_000_000),
            [0xFF, 0x03, 0x00, 0x00, 0x00, 0x00, 0b0000_1111]
        );
    }

    #[test]
    fn test_each_escape_bit() {
        assert_eq!(encode_frame(0, 0xFF00, 0)[6], 0b1000);
        assert_eq!(encode_frame(0, 0x00FF, 0)[6], 0b0100);
        assert_eq!(encode_frame(0, 0, 0xFF00)[6], 0b0010);
        assert_eq!(encode_frame(0, 0, 0x00FF)[6], 0b0001);
        // Only the marker value is escaped.
        assert_eq!(encode_frame(0, 0xFEFE, 0x0101)[6], 0);
    }

    #[test]
    fn test_decode_recovers_unescaped_frames() {
        for cmd in 0..=u8::MAX {
            for b in 0..=0xFEu32 {
                let d1 = (b << 8) | (0xFE - b);
                let d2 = ((0xFE - b) << 8) | b;
                let decoded = decode_frame(&encode_frame(cmd, d1, d2)).unwrap();
                assert!(decoded.escaped.is_empty());
                assert_eq!(decoded.frame, Frame::new(cmd, d1, d2));
            }
        }

        for hi in 0..=0xFEu32 {
            for lo in 0..=0xFEu32 {
                let word = (hi << 8) | lo;
                let decoded = decode_frame(&encode_frame(3, word, word)).unwrap();
                assert!(decoded.escaped.is_empty());
                assert_eq!(decoded.frame, Frame::new(3, word, word));
            }
        }
    }

    #[test]
    fn test_escape_bits_for_every_marker_pattern() {
        for pattern in 0u8..16 {
            let byte = |bit: u8| if pattern & bit != 0 { 0xFFu32 } else { 0x12 };
            let d1 = (byte(0b1000) << 8) | byte(0b0100);
            let d2 = (byte(0b0010) << 8) | byte(0b0001);

            let wire = encode_frame(9, d1, d2);
            assert_eq!(wire[6], pattern);
            assert!(wire[2..6].iter().all(|&b| b != START_MARKER));

            let decoded = decode_frame(&wire).unwrap();
            assert_eq!(decoded.escaped.bits(), pattern);
            assert_eq!(decoded.restored(), Frame::new(9, d1, d2));
        }
    }

    #[test]
    fn test_decode_reports_escaped_bytes() {
        let decoded = decode_frame(&encode_frame(1, 255, 0)).unwrap();
        assert_eq!(decoded.frame.data1, 0);
        assert!(decoded.escaped.data1_lo());
        assert!(!decoded.escaped.data1_hi());
        assert_eq!(decoded.escaped.bits(), 0b0100);
        assert_eq!(decoded.restored().data1, 255);
        assert_eq!(decoded.restored().data2, 0);
    }

    #[test]
    fn test_decode_rejects_bad_frames() {
        assert_eq!(
            decode_frame(&[0xFF, 1, 2]),
            Err(ProtocolError::FrameLength(3))
        );
        assert_eq!(
            decode_frame(&[0x00, 1, 0, 0, 0, 0, 0]),
            Err(ProtocolError::MissingStartMarker(0))
        );
        assert_eq!(
            decode_frame(&[0xFF, 1, 0, 0, 0, 0, 0x10]),
            Err(ProtocolError::InvalidEscape(0x10))
        );
    }

    #[test]
    fn test_stream_decoder_yields_frames() {
        let mut decoder = FrameDecoder::new();
        let mut out = Vec::new();
        let mut stream = vec![0x42, 0x00];
        stream.extend_from_slice(&encode_frame(5, 10, 20));
        stream.extend_from_slice(&encode_frame(6, 0xFF, 1));
        for byte in stream {
            if let Some(frame) = decoder.push(byte) {
                out.push(frame.unwrap());
            }
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].frame, Frame::new(5, 10, 20));
        assert_eq!(out[1].restored(), Frame::new(6, 0xFF, 1));
    }

    #[test]
    fn test_stream_decoder_resyncs_after_truncated_frame() {
        let mut decoder = FrameDecoder::new();
        let truncated = &encode_frame(9, 1, 1)[..4];
        for &byte in truncated {
            assert!(decoder.push(byte).is_none());
        }
        let mut result = None;
        for byte in encode_frame(4, 2, 3) {
            result = decoder.push(byte);
        }
        assert_eq!(result.unwrap().unwrap().frame, Frame::new(4, 2, 3));
    }
}
