//! BER codec for the sync request control value.
//!
//! ```text
//! SyncRequestValue ::= SEQUENCE {
//!     firstCode   INTEGER,
//!     secondCode  INTEGER,
//!     tokenDN     OCTET STRING OPTIONAL }
//! ```
//!
//! ## Security Note
//!
//! The value comes from a peer that is at most partially authenticated.
//! The reader checks every length against the remaining input, refuses
//! indefinite lengths and oversized fields, and rejects anything after the
//! closing of the outer SEQUENCE. A [`SyncRequest`] only exists if every
//! field parsed.

use otpsync_core::config::DEFAULT_MAX_CONTROL_VALUE_LEN;

use crate::error::DecodeError;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_SEQUENCE: u8 = 0x30;

/// Widest length field accepted (`0x84` followed by four bytes).
const MAX_LENGTH_OCTETS: usize = 4;

/// Widest INTEGER content accepted.
const MAX_INTEGER_OCTETS: usize = 8;

/// A decoded sync request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// The first of the two consecutive codes.
    pub first_code: u32,
    /// The code following `first_code`.
    pub second_code: u32,
    /// Restricts the search to one token; `None` searches all the user's
    /// tokens.
    pub token_id: Option<String>,
}

impl SyncRequest {
    /// Creates a request covering all of the user's tokens.
    #[must_use]
    pub const fn new(first_code: u32, second_code: u32) -> Self {
        Self {
            first_code,
            second_code,
            token_id: None,
        }
    }

    /// Restricts the request to one token.
    #[must_use]
    pub fn with_token(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Returns the token identifier, if any.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Decodes a control value with the default size limit.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::Malformed` if the value is not a well-formed
    /// sync request.
    pub fn decode(value: &[u8]) -> Result<Self, DecodeError> {
        decode(value)
    }

    /// Encodes the request the way a client puts it on the wire.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(16);
        write_integer(&mut body, i64::from(self.first_code));
        write_integer(&mut body, i64::from(self.second_code));
        if let Some(token_id) = &self.token_id {
            write_tlv(&mut body, TAG_OCTET_STRING, token_id.as_bytes());
        }

        let mut out = Vec::with_capacity(body.len() + 6);
        write_tlv(&mut out, TAG_SEQUENCE, &body);
        out
    }
}

/// Decodes a control value with the default size limit.
///
/// # Errors
///
/// Returns `DecodeError::Malformed` if the value is not a well-formed sync
/// request.
pub fn decode(value: &[u8]) -> Result<SyncRequest, DecodeError> {
    decode_bounded(value, DEFAULT_MAX_CONTROL_VALUE_LEN)
}

/// Decodes a control value no longer than `max_len` bytes.
///
/// # Errors
///
/// Returns `DecodeError::Malformed` if the value is oversized or is not a
/// well-formed sync request.
pub fn decode_bounded(value: &[u8], max_len: usize) -> Result<SyncRequest, DecodeError> {
    if value.len() > max_len {
        return Err(DecodeError::malformed(max_len, "control value too large"));
    }

    let mut reader = BerReader::new(value);
    let mut seq = reader.read_sequence()?;

    let first_code = seq.read_code()?;
    let second_code = seq.read_code()?;

    let token_id = if seq.is_empty() {
        None
    } else {
        Some(seq.read_token_id()?)
    };

    seq.finish("unexpected element in sync request")?;
    reader.finish("trailing bytes after sync request")?;

    Ok(SyncRequest {
        first_code,
        second_code,
        token_id,
    })
}

/// Cursor over a BER byte slice.
///
/// `base` is the absolute offset of `data[0]` in the original input, so
/// errors raised by nested readers point at the right byte.
struct BerReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> BerReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    const fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn error(&self, reason: &'static str) -> DecodeError {
        DecodeError::malformed(self.offset(), reason)
    }

    fn next_byte(&mut self, reason: &'static str) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.pos).ok_or_else(|| self.error(reason))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Reads a definite length.
    fn read_length(&mut self) -> Result<usize, DecodeError> {
        let first = self.next_byte("missing length")?;
        if first < 0x80 {
            return Ok(usize::from(first));
        }

        let octets = usize::from(first & 0x7f);
        if octets == 0 {
            return Err(self.error("indefinite length not allowed"));
        }
        if octets > MAX_LENGTH_OCTETS {
            return Err(self.error("length field too wide"));
        }

        let mut len = 0usize;
        for _ in 0..octets {
            let byte = self.next_byte("truncated length")?;
            len = (len << 8) | usize::from(byte);
        }
        Ok(len)
    }

    /// Reads a tag and length and returns the element contents.
    fn read_element(&mut self, tag: u8, reason: &'static str) -> Result<BerReader<'a>, DecodeError> {
        let start = self.offset();
        let found = self.next_byte(reason)?;
        if found != tag {
            return Err(DecodeError::malformed(start, reason));
        }

        let len = self.read_length()?;
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(self.error("length exceeds input"));
        }

        let data = self.data;
        let contents = BerReader {
            data: &data[self.pos..self.pos + len],
            pos: 0,
            base: self.offset(),
        };
        self.pos += len;
        Ok(contents)
    }

    fn read_sequence(&mut self) -> Result<BerReader<'a>, DecodeError> {
        self.read_element(TAG_SEQUENCE, "expected SEQUENCE")
    }

    /// Reads a two's complement INTEGER.
    fn read_integer(&mut self) -> Result<i64, DecodeError> {
        let contents = self.read_element(TAG_INTEGER, "expected INTEGER")?;
        let bytes = contents.data;
        if bytes.is_empty() {
            return Err(contents.error("empty INTEGER"));
        }
        if bytes.len() > MAX_INTEGER_OCTETS {
            return Err(contents.error("INTEGER too large"));
        }

        let mut value: i64 = if bytes[0] & 0x80 == 0 { 0 } else { -1 };
        for &byte in bytes {
            value = (value << 8) | i64::from(byte);
        }
        Ok(value)
    }

    /// Reads an INTEGER holding an OTP code.
    fn read_code(&mut self) -> Result<u32, DecodeError> {
        let start = self.offset();
        let value = self.read_integer()?;
        u32::try_from(value).map_err(|_| DecodeError::malformed(start, "code out of range"))
    }

    /// Reads the optional token identifier.
    fn read_token_id(&mut self) -> Result<String, DecodeError> {
        let contents = self.read_element(TAG_OCTET_STRING, "unexpected element in sync request")?;
        if contents.data.is_empty() {
            return Err(contents.error("empty token identifier"));
        }
        std::str::from_utf8(contents.data)
            .map(str::to_owned)
            .map_err(|_| contents.error("token identifier is not UTF-8"))
    }

    /// Requires that every byte was consumed.
    fn finish(&self, reason: &'static str) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

fn write_tlv(out: &mut Vec<u8>, tag: u8, contents: &[u8]) {
    out.push(tag);
    write_length(out, contents.len());
    out.extend_from_slice(contents);
}

/// Writes the minimal two's complement encoding of `value`.
fn write_integer(out: &mut Vec<u8>, value: i64) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    write_tlv(out, TAG_INTEGER, &bytes[start..]);
}
