//! Wire Protocol Implementation
//!
//! This module implements the delimited text protocol spoken by rfcd.
//!
//! ## Overview
//!
//! The protocol is kept human-typable over a raw socket: two configurable
//! single-byte markers, no length prefixes and no escaping. A client can
//! drive the daemon with nothing more than `nc`.
//!
//! ## Modules
//!
//! - `codec`: Incremental entity decoder and field encoder
//! - `types`: `Entity`, `Response` and `Status`
//!
//! ## Example
//!
//! ```
//! use rfcd::protocol::{EntityCodec, Response};
//! use bytes::BytesMut;
//!
//! let codec = EntityCodec::new(b'\n', b'|');
//!
//! // Decoding incoming data
//! let mut buffer = BytesMut::from(&b"echo|hi|\n"[..]);
//! let entity = codec.decode(&mut buffer).unwrap().unwrap();
//!
//! // Creating responses
//! let response = Response::ok(entity.args().to_vec());
//! assert_eq!(response.encode(&codec), b"OK|hi|\n");
//! ```

pub mod codec;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::{EntityCodec, FrameError, FrameResult, MAX_ENTITY_SIZE};
pub use types::{Entity, Response, Status};
