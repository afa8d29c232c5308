//! An incremental, pull-style JSON parser for constrained environments.
//!
//! Callers feed bytes in arbitrary-sized chunks, the parser emits one
//! semantic event per [`PullParser::parse`] call, and all working memory
//! lives inside a single caller-supplied buffer whose size the caller
//! controls and can grow on demand. The parser performs no allocation of its
//! own and keeps no input beyond a few trailing bytes of a split multi-byte
//! character.
//!
//! Documents may be UTF-8, UTF-16 little-endian, or UTF-16 big-endian,
//! detected from an optional byte order mark.
//!
//! # Examples
//!
//! ```rust
//! use jsonpull::{ParseEvent, PullParser, ScalarValue};
//!
//! let doc = br#"{"key": [null, true, 3.14]}"#;
//! let mut parser = PullParser::new(vec![0; 256]);
//! loop {
//!     match parser.parse(doc) {
//!         Ok(ParseEvent::EndOfDocument) => break,
//!         Ok(event) => println!("{event:?}"),
//!         Err(err) => panic!("parse failed: {err}"),
//!     }
//! }
//! ```

#![no_std]
extern crate alloc;

#[cfg(test)]
extern crate std;

mod arena;
mod codec;
mod escape_buffer;
mod literal_buffer;

mod chunk_utils;
mod error;
mod event;
mod parser;

pub use chunk_utils::{produce_chunks, produce_prefixes};
pub use codec::Encoding;
pub use error::{BufferTooSmall, ErrorKind, ParserError};
pub use event::{ParseEvent, ScalarValue};
pub use parser::PullParser;
