//! Shared helpers for the parser-level test suites.
//!
//! The parser hands out events borrowing its buffer, so the suites convert
//! them to owned values first, decode name/string payloads from the
//! document's encoding, and reconstruct full documents from event streams to
//! compare against the input.

use alloc::{
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use core::fmt::{self, Write as _};

use quickcheck::{Arbitrary, Gen};

use crate::{Encoding, ErrorKind, ParseEvent, ParserError, PullParser, ScalarValue};

/// Owned mirror of [`ScalarValue`], with text decoded from the document
/// encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedScalar {
    Integer(i64),
    Float(f64),
    Str(String),
    Boolean(bool),
    Null,
}

/// Owned mirror of [`ParseEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedEvent {
    ObjectBegin(Option<String>),
    ObjectEnd(Option<String>),
    ArrayBegin(Option<String>),
    ArrayEnd(Option<String>),
    Name(String),
    Value(Option<String>, OwnedScalar),
    EndOfDocument,
}

/// Decodes name/string payload bytes under the document encoding.
pub fn decode_text(bytes: &[u8], encoding: Encoding) -> String {
    match encoding {
        Encoding::Unknown | Encoding::Utf8 => {
            String::from_utf8(bytes.to_vec()).expect("payload is valid UTF-8")
        }
        Encoding::Utf16Le | Encoding::Utf16Be => {
            let units: Vec<u16> = bytes
                .chunks(2)
                .map(|pair| {
                    if encoding == Encoding::Utf16Be {
                        u16::from_be_bytes([pair[0], pair[1]])
                    } else {
                        u16::from_le_bytes([pair[0], pair[1]])
                    }
                })
                .collect();
            String::from_utf16(&units).expect("payload is valid UTF-16")
        }
    }
}

pub fn own(event: &ParseEvent<'_>, encoding: Encoding) -> OwnedEvent {
    let text = |bytes: &[u8]| decode_text(bytes, encoding);
    let opt = |name: Option<&[u8]>| name.map(text);
    match *event {
        ParseEvent::ObjectBegin { name } => OwnedEvent::ObjectBegin(opt(name)),
        ParseEvent::ObjectEnd { name } => OwnedEvent::ObjectEnd(opt(name)),
        ParseEvent::ArrayBegin { name } => OwnedEvent::ArrayBegin(opt(name)),
        ParseEvent::ArrayEnd { name } => OwnedEvent::ArrayEnd(opt(name)),
        ParseEvent::Name { name } => OwnedEvent::Name(text(name)),
        ParseEvent::Value { name, value } => OwnedEvent::Value(
            opt(name),
            match value {
                ScalarValue::Integer(n) => OwnedScalar::Integer(n),
                ScalarValue::Float(n) => OwnedScalar::Float(n),
                ScalarValue::String(s) => OwnedScalar::Str(text(s)),
                ScalarValue::Boolean(b) => OwnedScalar::Boolean(b),
                ScalarValue::Null => OwnedScalar::Null,
            },
        ),
        ParseEvent::EndOfDocument => OwnedEvent::EndOfDocument,
    }
}

/// Feeds `chunks` in order, switching to the next chunk on end-of-input and
/// doubling the buffer on memory suspensions, until the document completes.
pub fn run_chunks(
    chunks: &[&[u8]],
    buffer_len: usize,
    encoding: Encoding,
) -> Result<Vec<OwnedEvent>, ParserError> {
    let mut parser = PullParser::new(vec![0; buffer_len]);
    let mut events = Vec::new();
    let mut idx = 0;
    loop {
        match parser.parse(chunks[idx]) {
            Ok(event) => {
                let done = event == ParseEvent::EndOfDocument;
                events.push(own(&event, encoding));
                if done {
                    return Ok(events);
                }
            }
            Err(e) if e.kind == ErrorKind::UnexpectedEof => {
                idx += 1;
                if idx == chunks.len() {
                    return Err(e);
                }
            }
            Err(e) if e.kind == ErrorKind::InsufficientMemory => {
                let bigger = vec![0; parser.buffer_len() * 2];
                parser.reallocate(bigger).expect("strictly larger buffer");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parses a whole document in one window with a comfortable buffer.
pub fn parse_document(doc: &[u8], encoding: Encoding) -> Result<Vec<OwnedEvent>, ParserError> {
    run_chunks(&[doc], doc.len() * 2 + 64, encoding)
}

/// Shorthand for UTF-8-compatible documents without a BOM.
pub fn events(doc: &[u8]) -> Result<Vec<OwnedEvent>, ParserError> {
    parse_document(doc, Encoding::Unknown)
}

pub fn name(s: &str) -> Option<String> {
    Some(s.to_string())
}

/// Encodes `text` as UTF-16 with a BOM.
pub fn utf16_doc(text: &str, be: bool) -> Vec<u8> {
    let mut out = if be {
        vec![0xFE, 0xFF]
    } else {
        vec![0xFF, 0xFE]
    };
    for unit in text.encode_utf16() {
        let bytes = if be {
            unit.to_be_bytes()
        } else {
            unit.to_le_bytes()
        };
        out.extend_from_slice(&bytes);
    }
    out
}

/// Encodes `text` as UTF-8 with a BOM.
pub fn utf8_bom_doc(text: &str) -> Vec<u8> {
    let mut out = vec![0xEF, 0xBB, 0xBF];
    out.extend_from_slice(text.as_bytes());
    out
}

// ------------------------------------------------------------------------
// Reference documents for property tests
// ------------------------------------------------------------------------

/// A JSON value that can be rendered to text and compared against a
/// reconstruction from the event stream. Object members keep their order so
/// the comparison is exact.
#[derive(Debug, Clone, PartialEq)]
pub enum TestValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    Array(Vec<TestValue>),
    Object(Vec<(String, TestValue)>),
}

impl fmt::Display for TestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestValue::Null => f.write_str("null"),
            TestValue::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            TestValue::Integer(n) => write!(f, "{n}"),
            // Debug formatting always carries a fraction or an exponent, so
            // the parser classifies the value as a float on the way back.
            TestValue::Float(x) => write!(f, "{x:?}"),
            TestValue::Str(s) => {
                f.write_char('"')?;
                write_escaped_string(s, f)?;
                f.write_char('"')
            }
            TestValue::Array(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_char(']')
            }
            TestValue::Object(members) => {
                f.write_char('{')?;
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    f.write_char('"')?;
                    write_escaped_string(key, f)?;
                    write!(f, "\":{value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    for c in src.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04X}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

fn finite_f64(g: &mut Gen) -> f64 {
    let mut x = f64::arbitrary(g);
    while !x.is_finite() {
        x = f64::arbitrary(g);
    }
    x
}

fn gen_value(g: &mut Gen, depth: usize) -> TestValue {
    let pick = usize::arbitrary(g) % if depth == 0 { 5 } else { 7 };
    match pick {
        0 => TestValue::Null,
        1 => TestValue::Boolean(bool::arbitrary(g)),
        2 => TestValue::Integer(i64::arbitrary(g)),
        3 => TestValue::Float(finite_f64(g)),
        4 => TestValue::Str(String::arbitrary(g)),
        5 => {
            let len = usize::arbitrary(g) % 4;
            TestValue::Array((0..len).map(|_| gen_value(g, depth - 1)).collect())
        }
        _ => {
            let len = usize::arbitrary(g) % 4;
            TestValue::Object(
                (0..len)
                    .map(|_| (String::arbitrary(g), gen_value(g, depth - 1)))
                    .collect(),
            )
        }
    }
}

/// A complete document: the root is always a container.
#[derive(Debug, Clone)]
pub struct TestDocument(pub TestValue);

impl TestDocument {
    pub fn render(&self) -> String {
        format!("{}", self.0)
    }
}

impl Arbitrary for TestDocument {
    fn arbitrary(g: &mut Gen) -> Self {
        let depth = 2;
        let root = if bool::arbitrary(g) {
            let len = usize::arbitrary(g) % 4;
            TestValue::Object(
                (0..len)
                    .map(|_| (String::arbitrary(g), gen_value(g, depth)))
                    .collect(),
            )
        } else {
            let len = usize::arbitrary(g) % 4;
            TestValue::Array((0..len).map(|_| gen_value(g, depth)).collect())
        };
        TestDocument(root)
    }
}

/// Rebuilds the document from an event stream, asserting the stream is
/// well formed along the way: names precede their values, and begin/end
/// events agree on the container's name.
pub fn reconstruct(events: &[OwnedEvent]) -> TestValue {
    enum Building {
        Arr(Vec<TestValue>),
        Obj(Vec<(String, TestValue)>),
    }

    fn attach(stack: &mut [(Option<String>, Building)], name: Option<String>, value: TestValue) {
        match &mut stack.last_mut().expect("open container").1 {
            Building::Obj(members) => {
                members.push((name.expect("object members are named"), value));
            }
            Building::Arr(items) => {
                assert!(name.is_none(), "array items are unnamed");
                items.push(value);
            }
        }
    }

    let mut stack: Vec<(Option<String>, Building)> = Vec::new();
    let mut finished = None;
    let mut pending_name: Option<String> = None;

    for event in events {
        match event {
            OwnedEvent::Name(n) => pending_name = Some(n.clone()),
            OwnedEvent::ObjectBegin(n) | OwnedEvent::ArrayBegin(n) => {
                if !stack.is_empty() {
                    assert_eq!(&pending_name.take(), n, "container name follows its Name event");
                }
                let building = if matches!(event, OwnedEvent::ObjectBegin(_)) {
                    Building::Obj(Vec::new())
                } else {
                    Building::Arr(Vec::new())
                };
                stack.push((n.clone(), building));
            }
            OwnedEvent::Value(n, scalar) => {
                if matches!(stack.last(), Some((_, Building::Obj(_)))) {
                    assert_eq!(&pending_name.take(), n, "value name follows its Name event");
                }
                let value = match scalar {
                    OwnedScalar::Integer(v) => TestValue::Integer(*v),
                    OwnedScalar::Float(v) => TestValue::Float(*v),
                    OwnedScalar::Str(v) => TestValue::Str(v.clone()),
                    OwnedScalar::Boolean(v) => TestValue::Boolean(*v),
                    OwnedScalar::Null => TestValue::Null,
                };
                attach(&mut stack, n.clone(), value);
            }
            OwnedEvent::ObjectEnd(n) | OwnedEvent::ArrayEnd(n) => {
                let (built_name, building) = stack.pop().expect("balanced containers");
                assert_eq!(&built_name, n, "begin and end events agree on the name");
                let value = match building {
                    Building::Arr(items) => TestValue::Array(items),
                    Building::Obj(members) => TestValue::Object(members),
                };
                if stack.is_empty() {
                    finished = Some(value);
                } else {
                    attach(&mut stack, built_name, value);
                }
            }
            OwnedEvent::EndOfDocument => {}
        }
    }

    finished.expect("document completed")
}
