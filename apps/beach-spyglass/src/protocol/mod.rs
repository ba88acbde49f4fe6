use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::telemetry::logging::hexdump;

/// Version of the opcode table below. Producers and mirrors must agree on it;
/// any new opcode bumps this value.
pub const PROTOCOL_VERSION: u8 = 1;

pub const OP_WRITE: u8 = 0;
pub const OP_RESET_AND_WRITE: u8 = 1;
pub const OP_RESIZE_AND_CLEAR: u8 = 2;

const HEXDUMP_LIMIT: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("resize payload is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("invalid resize payload: {0}")]
    InvalidResize(String),
}

/// A decoded frame. Every possible first byte maps to exactly one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Write(Bytes),
    ResetAndWrite(Bytes),
    ResizeAndClear { rows: u16, cols: u16 },
    /// `opcode` is `None` for an empty frame.
    Unknown { opcode: Option<u8> },
}

impl Command {
    pub fn opcode(&self) -> Option<u8> {
        match self {
            Command::Write(_) => Some(OP_WRITE),
            Command::ResetAndWrite(_) => Some(OP_RESET_AND_WRITE),
            Command::ResizeAndClear { .. } => Some(OP_RESIZE_AND_CLEAR),
            Command::Unknown { opcode } => *opcode,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Command::Write(_) => "write",
            Command::ResetAndWrite(_) => "reset_and_write",
            Command::ResizeAndClear { .. } => "resize_and_clear",
            Command::Unknown { .. } => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Command::Unknown { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct ResizePayload {
    rows: u16,
    cols: u16,
}

/// Decode one transport message into a [`Command`].
///
/// Never fails: malformed frames come back as [`Command::Unknown`] after a
/// diagnostic is logged. Write payloads are sliced out of `frame` without
/// copying or inspecting them.
pub fn decode(frame: Bytes) -> Command {
    let Some(&opcode) = frame.first() else {
        debug!(target: "spyglass::protocol", "dropping empty frame");
        return Command::Unknown { opcode: None };
    };
    let payload = frame.slice(1..);

    match opcode {
        OP_WRITE => Command::Write(payload),
        OP_RESET_AND_WRITE => Command::ResetAndWrite(payload),
        OP_RESIZE_AND_CLEAR => match decode_resize(&payload) {
            Ok((rows, cols)) => Command::ResizeAndClear { rows, cols },
            Err(err) => {
                info!(
                    target: "spyglass::protocol",
                    opcode,
                    payload_len = payload.len(),
                    error = %err,
                    "dropping malformed resize frame"
                );
                Command::Unknown {
                    opcode: Some(opcode),
                }
            }
        },
        other => {
            debug!(
                target: "spyglass::protocol",
                opcode = other,
                payload_len = payload.len(),
                version = PROTOCOL_VERSION,
                "dropping frame with unknown opcode"
            );
            trace!(
                target: "spyglass::protocol",
                "unknown frame payload:\n{}",
                hexdump(&payload[..payload.len().min(HEXDUMP_LIMIT)])
            );
            Command::Unknown {
                opcode: Some(other),
            }
        }
    }
}

/// Parse the `{"rows": .., "cols": ..}` payload carried by a resize frame.
pub fn decode_resize(payload: &[u8]) -> Result<(u16, u16), ProtocolError> {
    let text = std::str::from_utf8(payload)?;
    let parsed: ResizePayload =
        serde_json::from_str(text).map_err(|err| ProtocolError::InvalidResize(err.to_string()))?;
    if parsed.rows == 0 || parsed.cols == 0 {
        return Err(ProtocolError::InvalidResize(format!(
            "zero dimension {}x{}",
            parsed.rows, parsed.cols
        )));
    }
    Ok((parsed.rows, parsed.cols))
}

/// Encode a [`Command`] the way a producer would put it on the wire.
pub fn encode_frame(command: &Command) -> Vec<u8> {
    match command {
        Command::Write(payload) => with_opcode(OP_WRITE, payload),
        Command::ResetAndWrite(payload) => with_opcode(OP_RESET_AND_WRITE, payload),
        Command::ResizeAndClear { rows, cols } => {
            let json = serde_json::to_vec(&ResizePayload {
                rows: *rows,
                cols: *cols,
            })
            .unwrap_or_default();
            with_opcode(OP_RESIZE_AND_CLEAR, &json)
        }
        Command::Unknown { opcode: Some(op) } => vec![*op],
        Command::Unknown { opcode: None } => Vec::new(),
    }
}

fn with_opcode(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(payload.len() + 1);
    buf.push(opcode);
    buf.extend_from_slice(payload);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(opcode: u8, payload: &[u8]) -> Bytes {
        Bytes::from(with_opcode(opcode, payload))
    }

    #[test]
    fn write_payload_passes_through_untouched() {
        let payloads: [&[u8]; 4] = [
            b"",
            b"hello\r\n",
            b"\x1b[31mred\x1b[0m",
            &[0xff, 0xfe, 0x00, 0xc3, 0x28, 0x1b],
        ];
        for payload in payloads {
            match decode(frame(OP_WRITE, payload)) {
                Command::Write(bytes) => assert_eq!(bytes.as_ref(), payload),
                other => panic!("expected write, got {other:?}"),
            }
        }
    }

    #[test]
    fn every_byte_value_survives_write() {
        let payload: Vec<u8> = (0..=255u8).rev().collect();
        let decoded = decode(frame(OP_WRITE, &payload));
        assert_eq!(decoded, Command::Write(Bytes::from(payload)));
    }

    #[test]
    fn reset_and_write_keeps_payload() {
        let decoded = decode(frame(OP_RESET_AND_WRITE, b"$ ls\r\n"));
        assert_eq!(
            decoded,
            Command::ResetAndWrite(Bytes::from_static(b"$ ls\r\n"))
        );
    }

    #[test]
    fn resize_decodes_named_fields() {
        let decoded = decode(frame(OP_RESIZE_AND_CLEAR, br#"{"rows":24,"cols":80}"#));
        assert_eq!(decoded, Command::ResizeAndClear { rows: 24, cols: 80 });

        let reordered = decode(frame(
            OP_RESIZE_AND_CLEAR,
            br#"{ "cols": 132, "rows": 50, "extra": true }"#,
        ));
        assert_eq!(reordered, Command::ResizeAndClear { rows: 50, cols: 132 });
    }

    #[test]
    fn malformed_resize_becomes_unknown() {
        let cases: [&[u8]; 7] = [
            b"not-json",
            br#"{"rows":24}"#,
            br#"{"rows":-1,"cols":80}"#,
            br#"{"rows":24.5,"cols":80}"#,
            br#"{"rows":0,"cols":80}"#,
            br#"{"rows":70000,"cols":80}"#,
            &[0xff, 0xfe],
        ];
        for payload in cases {
            assert_eq!(
                decode(frame(OP_RESIZE_AND_CLEAR, payload)),
                Command::Unknown {
                    opcode: Some(OP_RESIZE_AND_CLEAR)
                },
                "payload {payload:?}"
            );
        }
    }

    #[test]
    fn decode_resize_reports_the_failure() {
        assert!(matches!(
            decode_resize(&[0xc3, 0x28]),
            Err(ProtocolError::InvalidUtf8(_))
        ));
        assert!(matches!(
            decode_resize(b"[24,80]"),
            Err(ProtocolError::InvalidResize(_))
        ));
    }

    #[test]
    fn unknown_opcodes_and_empty_frames() {
        assert_eq!(
            decode(Bytes::from_static(&[99, 1, 2, 3])),
            Command::Unknown { opcode: Some(99) }
        );
        assert_eq!(decode(Bytes::new()), Command::Unknown { opcode: None });
    }

    #[test]
    fn every_opcode_maps_to_one_variant() {
        for opcode in 0..=255u8 {
            let command = decode(frame(opcode, br#"{"rows":1,"cols":1}"#));
            let expected_known = opcode <= OP_RESIZE_AND_CLEAR;
            assert_eq!(!command.is_unknown(), expected_known, "opcode {opcode}");
            assert_eq!(command.opcode(), Some(opcode));
        }
    }

    #[test]
    fn encode_frame_matches_wire_table() {
        assert_eq!(
            encode_frame(&Command::Write(Bytes::from_static(b"A"))),
            vec![OP_WRITE, b'A']
        );
        let resize = encode_frame(&Command::ResizeAndClear { rows: 24, cols: 80 });
        assert_eq!(resize[0], OP_RESIZE_AND_CLEAR);
        assert_eq!(
            decode(Bytes::from(resize)),
            Command::ResizeAndClear { rows: 24, cols: 80 }
        );
        assert!(encode_frame(&Command::Unknown { opcode: None }).is_empty());
    }
}
