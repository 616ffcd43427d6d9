//! Binary wire format
//!
//! Every value is a big-endian IEEE-754 `f32`.
//!
//! Controller → server: one 4-byte paddle command in [0, 1], or `-1.0` to
//! end the session.
//!
//! Server → controller: one frame of 3 or 4 values, in this order:
//!
//! | offset | field                        |
//! |--------|------------------------------|
//! | 0      | paddle actual position       |
//! | 4      | paddle desired position      |
//! | 8      | ball distance                |
//! | 12     | inverse deadband distance (4-field layout only) |
//!
//! Values are clamped to [0, 1] before encoding.

use std::{error::Error, fmt::Display};

use serde::{Deserialize, Serialize};

use super::{ControlCommand, TelemetryFrame};

/// Size of one encoded value
pub const FIELD_LEN: usize = 4;
/// Size of a controller command
pub const COMMAND_LEN: usize = FIELD_LEN;
/// Command value that ends the session
pub const DISCONNECT_SENTINEL: f32 = -1.0;

/// Decoded controller command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Set(ControlCommand),
    Disconnect,
}

/// Which telemetry fields a frame carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameLayout {
    /// Actual, desired, distance
    Basic,
    /// Actual, desired, distance, inverse deadband distance
    #[default]
    WithDeadband,
}

impl FrameLayout {
    pub fn from_settings(include_deadband_field: bool) -> Self {
        if include_deadband_field {
            FrameLayout::WithDeadband
        } else {
            FrameLayout::Basic
        }
    }

    pub fn field_count(&self) -> usize {
        match self {
            FrameLayout::Basic => 3,
            FrameLayout::WithDeadband => 4,
        }
    }

    /// Encoded frame size in bytes
    pub fn frame_len(&self) -> usize {
        self.field_count() * FIELD_LEN
    }
}

#[derive(Debug, PartialEq)]
pub enum WireError {
    InvalidByteCount(usize),
}

impl Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::InvalidByteCount(n) => {
                write!(f, "invalid telemetry frame length: {n} bytes")
            }
        }
    }
}

impl Error for WireError {}

pub fn encode_command(value: f32) -> [u8; COMMAND_LEN] {
    value.to_be_bytes()
}

/// The sentinel is compared exactly; anything else becomes a clamped command.
pub fn decode_command(bytes: [u8; COMMAND_LEN]) -> Command {
    let value = f32::from_be_bytes(bytes);
    if value == DISCONNECT_SENTINEL {
        Command::Disconnect
    } else {
        Command::Set(ControlCommand::new(value))
    }
}

pub fn encode_frame(frame: &TelemetryFrame, layout: FrameLayout) -> Vec<u8> {
    let fields = frame.clamped().fields();
    let mut bytes = Vec::with_capacity(layout.frame_len());
    for value in &fields[..layout.field_count()] {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes
}

/// Decode a 12- or 16-byte frame. A 3-field frame leaves the deadband field at 0.
pub fn decode_frame(bytes: &[u8]) -> Result<TelemetryFrame, WireError> {
    let layout = match bytes.len() {
        12 => FrameLayout::Basic,
        16 => FrameLayout::WithDeadband,
        n => return Err(WireError::InvalidByteCount(n)),
    };

    let mut fields = [0.0f32; 4];
    for (field, chunk) in fields
        .iter_mut()
        .zip(bytes.chunks_exact(FIELD_LEN))
        .take(layout.field_count())
    {
        *field = f32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    Ok(TelemetryFrame {
        paddle_actual_pos: fields[0],
        paddle_desired_pos: fields[1],
        distance: fields[2],
        inverse_deadband_distance: fields[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_round_trip() {
        let bytes = encode_command(0.73);
        match decode_command(bytes) {
            Command::Set(cmd) => assert!((cmd.value() - 0.73).abs() < f32::EPSILON),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_command_is_big_endian() {
        assert_eq!(encode_command(1.0), [0x3f, 0x80, 0x00, 0x00]);
        assert_eq!(encode_command(DISCONNECT_SENTINEL), [0xbf, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn test_sentinel_decodes_as_disconnect() {
        assert_eq!(decode_command([0xbf, 0x80, 0x00, 0x00]), Command::Disconnect);
    }

    #[test]
    fn test_out_of_range_command_clamped() {
        assert_eq!(
            decode_command(encode_command(3.0)),
            Command::Set(ControlCommand::new(1.0))
        );
        // only exactly -1 disconnects
        assert_eq!(
            decode_command(encode_command(-1.5)),
            Command::Set(ControlCommand::new(0.0))
        );
    }

    #[test]
    fn test_three_field_frame() {
        let frame = TelemetryFrame {
            paddle_actual_pos: 0.1,
            paddle_desired_pos: 0.9,
            distance: 0.42,
            inverse_deadband_distance: 0.7,
        };
        let bytes = encode_frame(&frame, FrameLayout::Basic);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &0.1f32.to_be_bytes());

        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.paddle_actual_pos, 0.1);
        assert_eq!(decoded.paddle_desired_pos, 0.9);
        assert_eq!(decoded.distance, 0.42);
        assert_eq!(decoded.inverse_deadband_distance, 0.0);
    }

    #[test]
    fn test_four_field_frame_clamps() {
        let frame = TelemetryFrame {
            paddle_actual_pos: 1.2,
            paddle_desired_pos: -0.2,
            distance: 0.5,
            inverse_deadband_distance: 0.25,
        };
        let bytes = encode_frame(&frame, FrameLayout::WithDeadband);
        assert_eq!(bytes.len(), FrameLayout::WithDeadband.frame_len());
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded.fields(), [1.0, 0.0, 0.5, 0.25]);
    }

    #[test]
    fn test_decode_frame_rejects_bad_length() {
        assert_eq!(decode_frame(&[0; 8]), Err(WireError::InvalidByteCount(8)));
    }

    #[test]
    fn test_layout_from_settings() {
        assert_eq!(FrameLayout::from_settings(false).frame_len(), 12);
        assert_eq!(FrameLayout::from_settings(true).frame_len(), 16);
    }
}
