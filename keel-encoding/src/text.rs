//! Order-preserving text codec.
//!
//! UTF-8 payload bytes are shifted `b -> b + 2`. UTF-8 never emits a byte
//! above `0xF4`, so the shift cannot overflow, and the transformed payload
//! never contains `0x00` or `0x01` — the field separator stays unambiguous
//! by construction, with no length prefix and no runtime check. The shift
//! is monotone per byte, so bytewise comparison of transformed payloads
//! matches comparison of the original strings.
//!
//! An empty string encodes to zero bytes and is therefore indistinguishable
//! from a null field; the predicate layer treats the two identically.

#![forbid(unsafe_code)]

use crate::errors::DecodeError;

/// Shift applied to every payload byte, reserving `0x00`/`0x01`.
const TEXT_SHIFT: u8 = 2;

#[inline]
pub fn encoded_len_str(s: &str) -> usize {
    s.len()
}

/// Append the shifted payload of `s` to `dst` (no terminator; the
/// multi-field cursor owns field delimiting).
pub fn encode_str_into(dst: &mut Vec<u8>, s: &str, descending: bool) {
    if descending {
        dst.extend(s.bytes().map(|b| !(b + TEXT_SHIFT)));
    } else {
        dst.extend(s.bytes().map(|b| b + TEXT_SHIFT));
    }
}

/// Decode an exact payload range (as delimited by the cursor) in place,
/// reusing `dest`'s allocation across rows.
pub fn decode_str_into(
    dest: &mut String,
    payload: &[u8],
    descending: bool,
) -> Result<(), DecodeError> {
    let mut raw = Vec::with_capacity(payload.len());
    for &b in payload {
        let b = if descending { !b } else { b };
        if b < TEXT_SHIFT {
            return Err(DecodeError::InvalidFormat);
        }
        raw.push(b - TEXT_SHIFT);
    }
    let s = std::str::from_utf8(&raw).map_err(|_| DecodeError::InvalidFormat)?;
    dest.clear();
    dest.push_str(s);
    Ok(())
}

/// Decode an exact payload range into an owned `String`.
pub fn decode_str(payload: &[u8], descending: bool) -> Result<String, DecodeError> {
    let mut out = String::new();
    decode_str_into(&mut out, payload, descending)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_roundtrip() {
        let cases = ["", "a", "Hello, World!", "naïve", "日本語", "z\u{10FFFF}"];
        for s in cases {
            let mut b = Vec::new();
            encode_str_into(&mut b, s, false);
            assert_eq!(b.len(), encoded_len_str(s));
            assert_eq!(decode_str(&b, false).unwrap(), s);

            let mut d = Vec::new();
            encode_str_into(&mut d, s, true);
            assert_eq!(decode_str(&d, true).unwrap(), s);
        }
    }

    #[test]
    fn str_order_matches_byte_order() {
        let mut words = ["mango", "apple", "applesauce", "Banana", "zeta", "ap"];
        let mut encoded: Vec<(Vec<u8>, &str)> = words
            .iter()
            .map(|s| {
                let mut b = Vec::new();
                encode_str_into(&mut b, s, false);
                (b, *s)
            })
            .collect();
        encoded.sort();
        words.sort();
        let got: Vec<&str> = encoded.iter().map(|(_, s)| *s).collect();
        assert_eq!(got, words.to_vec());
    }

    #[test]
    fn payload_never_contains_separator_bytes() {
        let s = "\u{0}control\u{1}chars\u{7f}high\u{f4}";
        for desc in [false, true] {
            let mut b = Vec::new();
            encode_str_into(&mut b, s, desc);
            assert!(b.iter().all(|&x| x != 0x00 && x != 0xFF));
        }
    }

    #[test]
    fn invalid_payload_rejected() {
        // 0x01 is below the shift floor for an ascending payload.
        assert_eq!(decode_str(&[0x01], false), Err(DecodeError::InvalidFormat));
        // Shifted bytes that decode to invalid UTF-8.
        assert_eq!(
            decode_str(&[0xC0 + 2, 0xC0 + 2], false),
            Err(DecodeError::InvalidFormat)
        );
    }

    #[test]
    fn in_place_decode_reuses_buffer() {
        let mut dest = String::from("previous row value");
        let mut b = Vec::new();
        encode_str_into(&mut b, "next", false);
        decode_str_into(&mut dest, &b, false).unwrap();
        assert_eq!(dest, "next");
    }
}
