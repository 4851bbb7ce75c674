//! Delimited Entity Codec
//!
//! This module turns the raw byte stream of a connection into entities
//! and turns responses back into framed output.
//!
//! ## Wire Format
//!
//! An entity is a list of tokens, each followed by the separator byte,
//! closed by the delimiter byte:
//!
//! ```text
//! <keyword>|<arg1>|<arg2>|\n
//! ```
//!
//! There is no escaping and no length prefix. A token containing either
//! framing byte cannot be transmitted.
//!
//! ## How the Decoder Works
//!
//! The decoder looks at the connection buffer and returns either:
//! - `Ok(Some(entity))` - A full entity was found and consumed from the buffer
//! - `Ok(None)` - No delimiter yet, the entity is incomplete
//! - `Err(FrameError)` - A frame was consumed but did not hold a keyword
//!
//! The frame is always removed from the buffer before it is validated, so
//! a bad request never blocks the requests queued behind it.

use crate::protocol::types::Entity;
use bytes::BytesMut;
use thiserror::Error;

/// Maximum size of a single buffered entity (64 KB)
pub const MAX_ENTITY_SIZE: usize = 64 * 1024;

/// Default entity delimiter
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// Default token separator
pub const DEFAULT_SEPARATOR: u8 = b'|';

/// Errors that can occur while decoding an entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The entity contained no tokens, so there is no keyword to dispatch on
    #[error("empty entity: no command keyword")]
    EmptyEntity,
}

/// Result type for decoding operations.
pub type FrameResult<T> = Result<T, FrameError>;

/// Codec for the delimiter/separator framed text protocol.
///
/// # Example
///
/// ```
/// use rfcd::protocol::EntityCodec;
/// use bytes::BytesMut;
///
/// let codec = EntityCodec::new(b'\n', b'|');
/// let mut buffer = BytesMut::from(&b"echo|a|b|\n"[..]);
///
/// let entity = codec.decode(&mut buffer).unwrap().unwrap();
/// assert_eq!(entity.keyword(), "echo");
/// assert_eq!(entity.args(), ["a", "b"]);
/// assert!(buffer.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityCodec {
    delimiter: u8,
    separator: u8,
}

impl Default for EntityCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER, DEFAULT_SEPARATOR)
    }
}

impl EntityCodec {
    /// Creates a codec for the given framing bytes.
    ///
    /// The two bytes must differ; configuration loading enforces this.
    pub fn new(delimiter: u8, separator: u8) -> Self {
        debug_assert_ne!(delimiter, separator);
        Self {
            delimiter,
            separator,
        }
    }

    /// The byte that terminates an entity.
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// The byte that terminates a token.
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Attempts to take one entity off the front of the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entity))` - A complete entity, its bytes removed from `buf`
    /// - `Ok(None)` - No delimiter buffered yet, `buf` is untouched
    /// - `Err(FrameError::EmptyEntity)` - The frame was consumed but held no tokens
    pub fn decode(&self, buf: &mut BytesMut) -> FrameResult<Option<Entity>> {
        let end = match buf.iter().position(|&b| b == self.delimiter) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let frame = buf.split_to(end + 1);
        let tokens = self.split_tokens(&frame[..end]);

        if tokens.is_empty() {
            return Err(FrameError::EmptyEntity);
        }

        Ok(Some(Entity::new(tokens)))
    }

    /// Trims the raw entity and splits it into tokens.
    fn split_tokens(&self, raw: &[u8]) -> Vec<String> {
        let raw = self.trim(raw);
        if raw.is_empty() {
            return Vec::new();
        }

        let mut tokens: Vec<String> = raw
            .split(|&b| b == self.separator)
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect();

        // A well-formed request ends with a separator, which leaves an empty
        // token behind the last real one.
        if tokens.last().is_some_and(|t| t.is_empty()) {
            tokens.pop();
        }

        tokens
    }

    /// Strips surrounding whitespace, but never the separator itself.
    fn trim<'a>(&self, raw: &'a [u8]) -> &'a [u8] {
        let is_trimmable =
            |b: &u8| matches!(*b, b' ' | b'\t' | b'\r' | b'\n') && *b != self.separator;

        let start = raw.iter().position(|b| !is_trimmable(b)).unwrap_or(raw.len());
        let end = raw
            .iter()
            .rposition(|b| !is_trimmable(b))
            .map_or(start, |pos| pos + 1);

        &raw[start..end]
    }

    /// Writes `value` followed by the separator.
    #[inline]
    pub fn encode_field(&self, value: &str, buf: &mut Vec<u8>) {
        buf.extend_from_slice(value.as_bytes());
        buf.push(self.separator);
    }

    /// Writes the delimiter that closes a response entity.
    #[inline]
    pub fn encode_end(&self, buf: &mut Vec<u8>) {
        buf.push(self.delimiter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> EntityCodec {
        EntityCodec::new(b'\n', b'|')
    }

    fn decode_str(input: &str) -> FrameResult<Option<Entity>> {
        let mut buf = BytesMut::from(input.as_bytes());
        codec().decode(&mut buf)
    }

    #[test]
    fn test_decode_simple_entity() {
        let entity = decode_str("echo|a|b|\n").unwrap().unwrap();
        assert_eq!(entity.keyword(), "echo");
        assert_eq!(entity.args(), ["a", "b"]);
    }

    #[test]
    fn test_decode_keyword_only() {
        let entity = decode_str("echo|\n").unwrap().unwrap();
        assert_eq!(entity.keyword(), "echo");
        assert!(entity.args().is_empty());
    }

    #[test]
    fn test_decode_incomplete() {
        let mut buf = BytesMut::from(&b"echo|a|"[..]);
        assert!(codec().decode(&mut buf).unwrap().is_none());
        // Nothing is consumed while waiting for the delimiter
        assert_eq!(&buf[..], b"echo|a|");
    }

    #[test]
    fn test_decode_consumes_only_one_entity() {
        let mut buf = BytesMut::from(&b"echo|a|\necho|b|\n"[..]);

        let first = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.args(), ["a"]);
        assert_eq!(&buf[..], b"echo|b|\n");

        let second = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.args(), ["b"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_trims_whitespace() {
        let entity = decode_str("  \t echo|x|\r\n").unwrap().unwrap();
        assert_eq!(entity.keyword(), "echo");
        assert_eq!(entity.args(), ["x"]);
    }

    #[test]
    fn test_decode_keeps_inner_whitespace() {
        let entity = decode_str("echo| padded |\n").unwrap().unwrap();
        assert_eq!(entity.args(), [" padded "]);
    }

    #[test]
    fn test_decode_keeps_empty_middle_tokens() {
        let entity = decode_str("echo||b|\n").unwrap().unwrap();
        assert_eq!(entity.args(), ["", "b"]);
    }

    #[test]
    fn test_decode_without_trailing_separator() {
        // Only an empty trailing token is dropped
        let entity = decode_str("echo|a\n").unwrap().unwrap();
        assert_eq!(entity.args(), ["a"]);
    }

    #[test]
    fn test_decode_empty_entity() {
        let mut buf = BytesMut::from(&b"\necho|a|\n"[..]);
        assert_eq!(codec().decode(&mut buf), Err(FrameError::EmptyEntity));
        // The bad frame is gone, the next one is still decodable
        let entity = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(entity.args(), ["a"]);
    }

    #[test]
    fn test_decode_whitespace_only_entity() {
        assert_eq!(decode_str(" \t \n"), Err(FrameError::EmptyEntity));
    }

    #[test]
    fn test_decode_separator_only_entity() {
        // "|" splits into ["", ""]; dropping the trailing one leaves an empty keyword
        let entity = decode_str("|\n").unwrap().unwrap();
        assert_eq!(entity.keyword(), "");
    }

    #[test]
    fn test_decode_custom_framing() {
        let codec = EntityCodec::new(b';', b',');
        let mut buf = BytesMut::from(&b"exec,ls,-l,;"[..]);
        let entity = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(entity.keyword(), "exec");
        assert_eq!(entity.args(), ["ls", "-l"]);
    }

    #[test]
    fn test_decode_whitespace_separator_is_not_trimmed() {
        let codec = EntityCodec::new(b'\n', b' ');
        let mut buf = BytesMut::from(&b"echo a b \n"[..]);
        let entity = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(entity.args(), ["a", "b"]);
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let mut buf = BytesMut::from(&b"echo|\xff|\n"[..]);
        let entity = codec().decode(&mut buf).unwrap().unwrap();
        assert_eq!(entity.args(), ["\u{fffd}"]);
    }

    #[test]
    fn test_encode_field_and_end() {
        let mut buf = Vec::new();
        codec().encode_field("OK", &mut buf);
        codec().encode_field("hello", &mut buf);
        codec().encode_field("", &mut buf);
        codec().encode_end(&mut buf);
        assert_eq!(buf, b"OK|hello||\n");
    }
}
