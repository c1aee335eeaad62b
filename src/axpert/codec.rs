//! Axpert frame codec
//!
//! Requests are `<ASCII command><CRC hi><CRC lo>\r`, replies are
//! `(<ASCII payload><CRC hi><CRC lo>\r`. The CRC is CRC-16/XMODEM with the
//! vendor twist that a CRC byte colliding with `(`, `\r` or `\n` is bumped
//! by one so it cannot be mistaken for framing.

use crate::error::{GatewayError, Result};

/// Largest reply we accept before giving up on finding the terminator
pub const MAX_FRAME_LEN: usize = 512;

pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

fn adjust(byte: u8) -> u8 {
    match byte {
        0x28 | 0x0d | 0x0a => byte + 1,
        other => other,
    }
}

/// CRC bytes as put on the wire
pub fn frame_crc(data: &[u8]) -> [u8; 2] {
    let crc = crc16_xmodem(data);
    [adjust((crc >> 8) as u8), adjust((crc & 0xff) as u8)]
}

pub fn encode_request(command: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(command.len() + 3);
    frame.extend_from_slice(command.as_bytes());
    frame.extend_from_slice(&frame_crc(command.as_bytes()));
    frame.push(b'\r');
    frame
}

/// Validate a raw reply frame and return its payload without the leading `(`
pub fn decode_response(frame: &[u8]) -> Result<String> {
    let body = frame.strip_suffix(b"\r").unwrap_or(frame);
    if body.len() < 3 {
        return Err(GatewayError::device_io(format!(
            "reply too short ({} bytes)",
            body.len()
        )));
    }
    let (payload, crc) = body.split_at(body.len() - 2);
    let expected = frame_crc(payload);
    let raw = crc16_xmodem(payload).to_be_bytes();
    // Some firmwares skip the adjustment step
    if crc != expected && crc != raw {
        return Err(GatewayError::device_io(format!(
            "reply CRC mismatch: got {:02x}{:02x}, expected {:02x}{:02x}",
            crc[0], crc[1], expected[0], expected[1]
        )));
    }
    let payload = payload
        .strip_prefix(b"(")
        .ok_or_else(|| GatewayError::device_io("reply does not start with '('"))?;
    if !payload.is_ascii() {
        return Err(GatewayError::device_io("reply contains non-ASCII bytes"));
    }
    Ok(String::from_utf8_lossy(payload).into_owned())
}

/// Build a full reply frame for a payload (used by simulators and tests)
pub fn encode_response(payload: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 4);
    body.push(b'(');
    body.extend_from_slice(payload.as_bytes());
    let crc = frame_crc(&body);
    body.extend_from_slice(&crc);
    body.push(b'\r');
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc_matches_known_vectors() {
        // Well-known Voltronic request CRCs
        assert_eq!(crc16_xmodem(b"QPIGS"), 0xB7A9);
        assert_eq!(crc16_xmodem(b"123456789"), 0x31C3);
    }

    #[test]
    fn encode_request_appends_crc_and_cr() {
        let frame = encode_request("QPIGS");
        assert_eq!(&frame[..5], b"QPIGS");
        assert_eq!(&frame[5..7], &[0xB7, 0xA9]);
        assert_eq!(frame[7], b'\r');
    }

    #[test]
    fn adjust_bumps_framing_bytes() {
        assert_eq!(adjust(0x28), 0x29);
        assert_eq!(adjust(0x0d), 0x0e);
        assert_eq!(adjust(0x0a), 0x0b);
        assert_eq!(adjust(0x41), 0x41);
    }

    #[test]
    fn decode_accepts_encoded_reply() {
        let frame = encode_response("ACK");
        assert_eq!(decode_response(&frame).unwrap(), "ACK");
    }

    #[test]
    fn decode_rejects_bad_crc_and_framing() {
        let mut frame = encode_response("ACK");
        let len = frame.len();
        frame[len - 2] ^= 0xff;
        let err = decode_response(&frame).unwrap_err();
        assert!(err.to_string().contains("CRC mismatch"));

        assert!(decode_response(b"(\r").is_err());

        let mut body = b"ACK".to_vec();
        body.extend_from_slice(&frame_crc(b"ACK"));
        let err = decode_response(&body).unwrap_err();
        assert!(err.to_string().contains("'('"));
    }
}
