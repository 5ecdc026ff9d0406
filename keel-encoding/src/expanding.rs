//! A raw encoder that writes typed values into a single, automatically
//! expanding byte buffer.
//!
//! Growth is explicit and geometric: when the remaining capacity cannot
//! hold the next write, capacity is multiplied by `resize_factor`
//! (default 1.5) repeatedly until it can, copying existing bytes once.
//! Finalizing always hands back an independently owned, right-sized
//! buffer, so no aliasing survives the encoder.

#![forbid(unsafe_code)]

use keel_result::{Error, Result};

use crate::scalar;
use crate::text;

/// Hard ceiling on a single encode buffer.
pub const MAX_BUFFER_SIZE: usize = i32::MAX as usize;

/// Default geometric growth factor.
pub const DEFAULT_RESIZE_FACTOR: f64 = 1.5;

const DEFAULT_INITIAL_SIZE: usize = 10;

#[derive(Debug)]
pub struct ExpandingEncoder {
    buf: Vec<u8>,
    resize_factor: f64,
}

impl Default for ExpandingEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_SIZE, DEFAULT_RESIZE_FACTOR)
    }
}

impl ExpandingEncoder {
    pub fn new(initial_size: usize, resize_factor: f64) -> Self {
        debug_assert!(resize_factor > 1.0);
        Self {
            buf: Vec::with_capacity(initial_size.min(MAX_BUFFER_SIZE)),
            resize_factor,
        }
    }

    pub fn with_capacity(initial_size: usize) -> Self {
        Self::new(initial_size, DEFAULT_RESIZE_FACTOR)
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn encode_i8(&mut self, v: i8) -> Result<&mut Self> {
        self.ensure_capacity(scalar::encoded_len_i8(v))?;
        scalar::encode_i8_into(&mut self.buf, v, false);
        Ok(self)
    }

    pub fn encode_i16(&mut self, v: i16) -> Result<&mut Self> {
        self.ensure_capacity(scalar::encoded_len_i16(v))?;
        scalar::encode_i16_into(&mut self.buf, v, false);
        Ok(self)
    }

    pub fn encode_i32(&mut self, v: i32) -> Result<&mut Self> {
        self.ensure_capacity(scalar::encoded_len_i32(v))?;
        scalar::encode_i32_into(&mut self.buf, v, false);
        Ok(self)
    }

    pub fn encode_i64(&mut self, v: i64) -> Result<&mut Self> {
        self.ensure_capacity(scalar::encoded_len_i64(v))?;
        scalar::encode_i64_into(&mut self.buf, v, false);
        Ok(self)
    }

    /// Encode a string payload followed by a single `0x00` terminator, so a
    /// list of strings can be parsed back sequentially.
    pub fn encode_str(&mut self, s: &str) -> Result<&mut Self> {
        self.ensure_capacity(text::encoded_len_str(s) + 1)?;
        text::encode_str_into(&mut self.buf, s, false);
        self.buf.push(0x00);
        Ok(self)
    }

    /// Append one byte verbatim, bypassing the typed codec.
    pub fn raw_push(&mut self, b: u8) -> Result<&mut Self> {
        self.ensure_capacity(1)?;
        self.buf.push(b);
        Ok(self)
    }

    /// Append a length-prefixed opaque byte range, bypassing the typed
    /// codec. Used for already-encoded sub-values (e.g. nested entries);
    /// the length is written with the scalar codec.
    pub fn raw_encode(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        let len = i32::try_from(bytes.len()).map_err(|_| Error::CapacityExceeded {
            required: bytes.len(),
            max: MAX_BUFFER_SIZE,
        })?;
        self.ensure_capacity(scalar::encoded_len_i32(len) + bytes.len())?;
        scalar::encode_i32_into(&mut self.buf, len, false);
        self.buf.extend_from_slice(bytes);
        Ok(self)
    }

    /// Finalize into an independently owned, right-sized buffer.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.shrink_to_fit();
        self.buf
    }

    /// Borrow the backing buffer for a direct write of `required` bytes.
    /// The capacity contract is already enforced when this returns.
    pub(crate) fn raw_buf(&mut self, required: usize) -> Result<&mut Vec<u8>> {
        self.ensure_capacity(required)?;
        Ok(&mut self.buf)
    }

    fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        if self.buf.capacity() - self.buf.len() >= required {
            return Ok(());
        }
        let needed = self
            .buf
            .len()
            .checked_add(required)
            .unwrap_or(MAX_BUFFER_SIZE + 1);
        if needed > MAX_BUFFER_SIZE {
            return Err(Error::CapacityExceeded {
                required,
                max: MAX_BUFFER_SIZE,
            });
        }
        let mut target = self.buf.capacity().max(1);
        while target - self.buf.len() < required {
            target = ((target as f64) * self.resize_factor).ceil() as usize;
            if target >= MAX_BUFFER_SIZE {
                target = MAX_BUFFER_SIZE;
                break;
            }
        }
        self.buf.reserve_exact(target - self.buf.len());
        Ok(())
    }
}
