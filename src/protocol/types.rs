//! Protocol Data Types
//!
//! This module defines the request and response units of the protocol.
//!
//! ## Protocol Format
//!
//! Requests and responses are both entities: separator-terminated tokens
//! closed by a delimiter. A response always starts with a status token:
//! - `OK` - The command succeeded, result fields follow
//! - `ERR` - The command failed, at most one diagnostic field follows
//!
//! ## Examples
//!
//! With separator `|` and delimiter `\n`:
//!
//! Request: `echo|a|b|\n`
//! Success: `OK|a|b|\n`
//! Failure: `ERR|Not allowed|\n`
//! Bare failure: `ERR|\n`

use crate::protocol::codec::EntityCodec;
use std::fmt;

/// One decoded client request.
///
/// The first token is the command keyword, the rest are its arguments.
/// An `Entity` always holds at least one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    tokens: Vec<String>,
}

impl Entity {
    pub(crate) fn new(tokens: Vec<String>) -> Self {
        debug_assert!(!tokens.is_empty());
        Self { tokens }
    }

    /// The command keyword.
    pub fn keyword(&self) -> &str {
        &self.tokens[0]
    }

    /// Arguments following the keyword.
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Splits the entity into its keyword and owned arguments.
    pub fn into_parts(mut self) -> (String, Vec<String>) {
        let args = self.tokens.split_off(1);
        let keyword = self.tokens.pop().unwrap_or_default();
        (keyword, args)
    }
}

/// Leading status token of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Err => "ERR",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response entity, ready to be framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub fields: Vec<String>,
}

impl Response {
    /// Creates a successful response carrying `fields` in order.
    pub fn ok(fields: Vec<String>) -> Self {
        Self {
            status: Status::Ok,
            fields,
        }
    }

    /// Creates a bare failure response.
    pub fn err() -> Self {
        Self {
            status: Status::Err,
            fields: Vec::new(),
        }
    }

    /// Creates a failure response with a human-readable diagnostic field.
    ///
    /// Clients should treat the diagnostic as informational only.
    pub fn err_with(diagnostic: impl Into<String>) -> Self {
        Self {
            status: Status::Err,
            fields: vec![diagnostic.into()],
        }
    }

    /// Returns true if this is an `ERR` response.
    pub fn is_err(&self) -> bool {
        self.status == Status::Err
    }

    /// Serializes the response to bytes for sending over the wire.
    pub fn encode(&self, codec: &EntityCodec) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(codec, &mut buf);
        buf
    }

    /// Serializes the response into an existing buffer.
    pub fn encode_into(&self, codec: &EntityCodec, buf: &mut Vec<u8>) {
        codec.encode_field(self.status.as_str(), buf);
        for field in &self.fields {
            codec.encode_field(field, buf);
        }
        codec.encode_end(buf);
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        for field in &self.fields {
            write!(f, " {:?}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parts() {
        let entity = Entity::new(vec!["cp".into(), "/a".into(), "/b".into()]);
        assert_eq!(entity.keyword(), "cp");
        assert_eq!(entity.args(), ["/a", "/b"]);

        let (keyword, args) = entity.into_parts();
        assert_eq!(keyword, "cp");
        assert_eq!(args, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_encode_ok_response() {
        let codec = EntityCodec::new(b'\n', b'|');
        let response = Response::ok(vec!["a".into(), "b".into()]);
        assert_eq!(response.encode(&codec), b"OK|a|b|\n");
    }

    #[test]
    fn test_encode_ok_without_fields() {
        let codec = EntityCodec::new(b';', b',');
        assert_eq!(Response::ok(Vec::new()).encode(&codec), b"OK,;");
    }

    #[test]
    fn test_encode_err_responses() {
        let codec = EntityCodec::new(b'\n', b'|');
        assert_eq!(Response::err().encode(&codec), b"ERR|\n");
        assert_eq!(
            Response::err_with("Not allowed").encode(&codec),
            b"ERR|Not allowed|\n"
        );
        assert!(Response::err().is_err());
        assert!(!Response::ok(Vec::new()).is_err());
    }

    #[test]
    fn test_display() {
        let response = Response::ok(vec!["hello".into(), "".into()]);
        assert_eq!(response.to_string(), r#"OK "hello" """#);
    }
}
