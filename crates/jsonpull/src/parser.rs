//! The pull parser implementation.
//!
//! [`PullParser`] is driven entirely by synchronous [`parse`] calls on one
//! context. Each call decodes characters from the caller's input window,
//! mutates the frame stack inside the caller's buffer, and returns when a
//! state handler produces an event or the parser has to suspend (more input
//! needed, or a larger buffer needed).
//!
//! [`parse`]: PullParser::parse

use alloc::vec::Vec;

use crate::{
    arena::{self, flag, Arena},
    codec::{Char, Decoded, Encoded, Encoding},
    error::{BufferTooSmall, ErrorKind, ParserError},
    escape_buffer::{hex_value, UnicodeEscapeBuffer},
    event::{ParseEvent, ScalarValue},
    literal_buffer::{ExpectedLiteralBuffer, LiteralValue, Step},
};

/// Parsing state, dispatched on for every decoded character.
///
/// The original keyword chains (`t`-`r`-`u`-`e` and friends) collapse into
/// one `Literal` state driven by the literal matcher, and the four
/// `\uXXXX` digit states into one `UnicodeEscape` state driven by the hex
/// accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// No document content has been found yet.
    None,
    /// The first byte of a UTF-8 byte order mark was found.
    Utf8Bom1,
    /// The second byte of a UTF-8 byte order mark was found.
    Utf8Bom2,
    /// The first byte of a UTF-16BE byte order mark was found.
    Utf16BeBom,
    /// The first byte of a UTF-16LE byte order mark was found.
    Utf16LeBom,
    /// A name is expected: an object just opened or a comma followed a pair.
    NameExpected,
    /// Inside a name; characters are being appended.
    Name,
    /// A name was closed and a colon is expected.
    PostName,
    /// A value is expected after a colon, or inside an array.
    ValueExpected,
    /// Inside a string value.
    StringValue,
    /// A backslash was found; an escape character is expected.
    Escape,
    /// Inside the four hex digits of a `\uXXXX` escape.
    UnicodeEscape,
    /// Inside a number.
    NumberValue,
    /// Inside `true`, `false`, or `null`.
    Literal,
    /// A value ended; a comma or closing token is expected.
    PostValue,
}

/// Where the parser is between calls. Errors live here, not in [`State`],
/// so the state a recoverable error must return to is simply the one left
/// in place when the suspension happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Parsing,
    /// The root container closed; every further call reports end of
    /// document.
    Done,
    /// Suspended until the caller supplies more input.
    NeedMoreInput,
    /// Suspended until the caller supplies a larger buffer.
    NeedLargerBuffer,
    /// A terminal error; every further call repeats it.
    Failed(ErrorKind),
}

/// Event codes produced by state handlers, resolved into a [`ParseEvent`]
/// with the published name/value spans at the end of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Code {
    ObjectBegin,
    ObjectEnd,
    ArrayBegin,
    ArrayEnd,
    Name,
    Value,
    EndOfDocument,
}

/// Snapshot taken before each decode so a state can un-consume the last
/// code point (number terminator lookahead, retry after memory growth) even
/// when that code point straddled a chunk boundary.
#[derive(Debug, Clone, Copy, Default)]
struct Rewind {
    stream: [u8; 4],
    stream_len: u8,
    cursor: usize,
    line: u32,
    column: u32,
}

/// The published value between calls, as spans and plain scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    None,
    Integer(i64),
    Float(f64),
    Str { start: u32, len: u32 },
    Boolean(bool),
    Null,
}

/// An incremental pull-style JSON parser over a caller-supplied buffer.
///
/// The parser performs no allocation of its own: the nesting stack and every
/// name/value string live inside the buffer handed to [`new`], and the
/// caller grows that buffer on demand through [`reallocate`]. Input arrives
/// in arbitrary-sized chunks; the parser suspends and resumes at any byte
/// boundary, including the middle of a multi-byte code unit.
///
/// # Examples
///
/// Feeding a document in chunks:
///
/// ```
/// use jsonpull::{ErrorKind, ParseEvent, PullParser};
///
/// let chunks: [&[u8]; 2] = [br#"{"x":[1,"#, br#"2]}"#];
/// let mut parser = PullParser::new(vec![0; 128]);
/// let mut chunk = 0;
/// loop {
///     match parser.parse(chunks[chunk]) {
///         Ok(ParseEvent::EndOfDocument) => break,
///         Ok(event) => println!("{event:?}"),
///         Err(e) if e.kind == ErrorKind::UnexpectedEof => chunk += 1,
///         Err(e) => panic!("parse failed: {e}"),
///     }
/// }
/// ```
///
/// Growing the buffer on demand:
///
/// ```
/// use jsonpull::{ErrorKind, ParseEvent, PullParser};
///
/// let doc = br#"{"a":1}"#;
/// let mut parser = PullParser::new(vec![0; 8]);
/// let mut events = 0;
/// loop {
///     match parser.parse(doc) {
///         Ok(ParseEvent::EndOfDocument) => break,
///         Ok(_) => events += 1,
///         Err(e) if e.kind == ErrorKind::InsufficientMemory => {
///             let old = parser.reallocate(vec![0; parser.buffer_len() * 2]).unwrap();
///             drop(old);
///         }
///         Err(e) => panic!("parse failed: {e}"),
///     }
/// }
/// assert_eq!(events, 4); // ObjectBegin, Name, Value, ObjectEnd
/// ```
///
/// [`new`]: PullParser::new
/// [`reallocate`]: PullParser::reallocate
#[derive(Debug)]
pub struct PullParser {
    arena: Arena,
    encoding: Encoding,

    status: Status,
    state: State,
    /// State to return to after an escape sub-machine finishes.
    escape_return: State,

    /// Identity of the current input window; a different slice resets the
    /// cursor.
    window_ptr: usize,
    window_len: usize,
    cursor: usize,
    /// Leading bytes of a code unit split across input chunks.
    stream: [u8; 4],
    stream_len: u8,
    rewind: Rewind,

    line: u32,
    column: u32,
    depth: u32,
    /// The code point that bumps `line`, so `\r\n` increments only once.
    newline: u32,

    literal: ExpectedLiteralBuffer,
    unicode: UnicodeEscapeBuffer,

    /// Published name span, alive until the deferred cleanup.
    name: Option<(u32, u32)>,
    value: Slot,
    /// Start offset of the string/number value being built.
    value_start: Option<u32>,
}

impl PullParser {
    /// Creates a parser over `buffer`, zeroing it first.
    ///
    /// The buffer holds the nesting stack and all in-flight strings; a
    /// buffer smaller than one frame header cannot even open the root
    /// container and will report [`ErrorKind::InsufficientMemory`] until it
    /// is grown.
    #[must_use]
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            arena: Arena::new(buffer),
            encoding: Encoding::Unknown,
            status: Status::Parsing,
            state: State::None,
            escape_return: State::None,
            window_ptr: 0,
            window_len: 0,
            cursor: 0,
            stream: [0; 4],
            stream_len: 0,
            rewind: Rewind::default(),
            line: 1,
            column: 0,
            depth: 0,
            newline: 0,
            literal: ExpectedLiteralBuffer::none(),
            unicode: UnicodeEscapeBuffer::new(),
            name: None,
            value: Slot::None,
            value_start: None,
        }
    }

    /// Swaps in a strictly larger buffer, copying the old contents.
    ///
    /// Parsing state is maintained: if the parser was suspended on
    /// [`ErrorKind::InsufficientMemory`], the next [`parse`] call resumes
    /// with the character that overran. Returns the old buffer, which the
    /// caller may drop.
    ///
    /// # Errors
    ///
    /// Hands the replacement back as [`BufferTooSmall`] when it is not
    /// strictly larger than the current buffer.
    ///
    /// [`parse`]: PullParser::parse
    pub fn reallocate(&mut self, new_buffer: Vec<u8>) -> Result<Vec<u8>, BufferTooSmall> {
        let old = self.arena.reallocate(new_buffer).map_err(BufferTooSmall)?;
        if self.status == Status::NeedLargerBuffer {
            self.status = Status::Parsing;
        }
        Ok(old)
    }

    /// Begins or continues parsing `input`.
    ///
    /// Calling again with the *same* slice continues where the last call
    /// stopped; a different slice (pointer or length) is treated as a new
    /// input window starting at its first byte, which is how the caller
    /// supplies the next
    /// chunk after [`ErrorKind::UnexpectedEof`]. Bytes of a code unit split
    /// across chunks are carried over and combined with the new window.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::UnexpectedEof`] and [`ErrorKind::InsufficientMemory`]
    /// are suspensions the caller heals with more input or a larger buffer;
    /// all other kinds are terminal and repeat on every subsequent call.
    pub fn parse(&mut self, input: &[u8]) -> Result<ParseEvent<'_>, ParserError> {
        if input.is_empty() {
            return Err(self.error(ErrorKind::InvalidInput));
        }

        // Deferred actions first, so the previous event's name and value
        // were observable for exactly one call.
        if let Some(code) = self.run_deferred() {
            return Ok(self.resolve(code));
        }

        match self.status {
            Status::Done => return Ok(ParseEvent::EndOfDocument),
            Status::Failed(kind) => return Err(self.error(kind)),
            Status::NeedLargerBuffer => return Err(self.error(ErrorKind::InsufficientMemory)),
            // The state to resume into was left in place; whether the input
            // actually moved on is discovered by decoding below.
            Status::NeedMoreInput => self.status = Status::Parsing,
            Status::Parsing => {}
        }

        let ptr = input.as_ptr() as usize;
        if ptr != self.window_ptr || input.len() != self.window_len {
            self.window_ptr = ptr;
            self.window_len = input.len();
            self.cursor = 0;
        }

        let code = self.run(input)?;
        Ok(self.resolve(code))
    }

    /// Nesting depth at the last emitted event. Begin events report the
    /// depth at which the container was found; the increase takes effect on
    /// the following call.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Line of the character last parsed, starting at 1.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Column, in code points, of the character last parsed. Byte order
    /// marks do not count.
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// The document encoding, fixed once a byte order mark is consumed.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Length of the adopted buffer in bytes.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.arena.len()
    }

    // --------------------------------------------------------------------
    // Deferred actions
    // --------------------------------------------------------------------

    /// Executes the flags the previous call left on the top frame:
    /// depth changes, the pending pop, and the post-value cleanup, in that
    /// order. Popping the root ends the document.
    fn run_deferred(&mut self) -> Option<Code> {
        let top = self.arena.top()?;
        if self.arena.flags(top) & flag::INCREMENT_DEPTH != 0 {
            self.depth += 1;
            self.arena.clear_flags(top, flag::INCREMENT_DEPTH);
        }
        if self.arena.flags(top) & flag::DECREMENT_DEPTH != 0 {
            self.depth -= 1;
            self.arena.clear_flags(top, flag::DECREMENT_DEPTH);
        }
        if self.arena.flags(top) & flag::MUST_POP != 0 {
            let parent = self.arena.parent(top);
            self.arena.pop();
            if parent.is_none() {
                self.status = Status::Done;
                return Some(Code::EndOfDocument);
            }
        }
        // The pop may have moved the top; the cleanup belongs to whichever
        // frame owns the just-surrendered name or value.
        let top = self.arena.top()?;
        if self.arena.flags(top) & flag::POST_VALUE_CLEANUP != 0 {
            self.arena.cleanup_data(top);
            self.name = None;
            self.value = Slot::None;
            self.arena.clear_flags(
                top,
                flag::HAS_NAME
                    | flag::COMMA_PENDING
                    | flag::DECIMAL_SEEN
                    | flag::EXPONENT_SEEN
                    | flag::SIGN_SEEN
                    | flag::POST_VALUE_CLEANUP,
            );
        }
        None
    }

    // --------------------------------------------------------------------
    // Main loop
    // --------------------------------------------------------------------

    fn run(&mut self, input: &[u8]) -> Result<Code, ParserError> {
        loop {
            // Every state from NameExpected onward assumes an open frame;
            // reaching one without a frame is a bug, not bad input.
            if needs_frame(self.state) && self.arena.top().is_none() {
                return Err(self.fail(ErrorKind::Internal));
            }
            let c = self.next_char(input)?;
            if let Some(code) = self.dispatch(c)? {
                return Ok(code);
            }
        }
    }

    /// Decodes one code point from the carry-over stream plus the input
    /// window, advancing the cursor and the line/column counters.
    fn next_char(&mut self, input: &[u8]) -> Result<Char, ParserError> {
        self.rewind = Rewind {
            stream: self.stream,
            stream_len: self.stream_len,
            cursor: self.cursor,
            line: self.line,
            column: self.column,
        };

        let carried = usize::from(self.stream_len);
        let remaining = &input[self.cursor..];
        let mut window = [0u8; 4];
        window[..carried].copy_from_slice(&self.stream[..carried]);
        let avail = (carried + remaining.len()).min(4);
        window[carried..avail].copy_from_slice(&remaining[..avail - carried]);

        let c = match self.encoding.decode(&window[..avail]) {
            Decoded::Char(c) => c,
            Decoded::Terminator => {
                // A NUL ends the stream here for good. Nothing is consumed,
                // so a healed call sees it again.
                return Err(self.suspend(Status::NeedMoreInput, ErrorKind::UnexpectedEof));
            }
            Decoded::Incomplete => {
                // Carry every remaining byte of this code unit across the
                // gap; the next window completes it.
                self.stream[..avail].copy_from_slice(&window[..avail]);
                self.stream_len = avail as u8;
                self.cursor = input.len();
                return Err(self.suspend(Status::NeedMoreInput, ErrorKind::UnexpectedEof));
            }
        };

        let bytes = usize::from(c.bytes);
        if bytes >= carried {
            self.stream_len = 0;
            self.cursor += bytes - carried;
        } else {
            // The decode settled on fewer bytes than were carried (an
            // unpaired UTF-16 surrogate); keep the tail for the next decode.
            self.stream.copy_within(bytes..carried, 0);
            self.stream_len = (carried - bytes) as u8;
        }

        if is_newline(c.value) {
            if self.newline == 0 {
                self.newline = c.value;
            }
            if c.value == self.newline {
                self.line += 1;
            }
            self.column = 0;
        } else {
            self.column += 1;
        }

        Ok(c)
    }

    /// Un-consumes the last decoded code point so the outer state parses it
    /// again.
    fn stay(&mut self) {
        let r = self.rewind;
        self.stream = r.stream;
        self.stream_len = r.stream_len;
        self.cursor = r.cursor;
        self.line = r.line;
        self.column = r.column;
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(&mut self, c: Char) -> Result<Option<Code>, ParserError> {
        let v = c.value;
        match self.state {
            State::None => {
                if v == u32::from(b'{') || v == u32::from(b'[') {
                    return self.begin_token(v).map(Some);
                } else if v == 0xEF {
                    // The UTF-8 BOM is [EF] BB BF.
                    self.state = State::Utf8Bom1;
                    self.column -= 1;
                } else if v == 0xFE {
                    // The UTF-16BE BOM is [FE] FF.
                    self.state = State::Utf16BeBom;
                    self.column -= 1;
                } else if v == 0xFF {
                    // The UTF-16LE BOM is [FF] FE.
                    self.state = State::Utf16LeBom;
                    self.column -= 1;
                } else if !is_whitespace(v) {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf8Bom1 => {
                self.column -= 1;
                if v == 0xBB {
                    self.state = State::Utf8Bom2;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf8Bom2 => {
                self.column -= 1;
                if v == 0xBF {
                    self.state = State::None;
                    self.encoding = Encoding::Utf8;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf16BeBom => {
                self.column -= 1;
                if v == 0xFF {
                    self.state = State::None;
                    self.encoding = Encoding::Utf16Be;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Utf16LeBom => {
                self.column -= 1;
                if v == 0xFE {
                    self.state = State::None;
                    self.encoding = Encoding::Utf16Le;
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::NameExpected => {
                if v == u32::from(b'"') {
                    let top = self.top_frame()?;
                    self.arena.or_flags(top, flag::HAS_NAME);
                    self.state = State::Name;
                } else if v == u32::from(b'}') || v == u32::from(b']') {
                    return self.end_token(v).map(Some);
                } else if !is_whitespace(v) {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Name => {
                if v == u32::from(b'"') {
                    self.append_terminator()?;
                    let top = self.top_frame()?;
                    self.name = self.name_span(top);
                    self.state = State::PostName;
                    return Ok(Some(Code::Name));
                } else if v == u32::from(b'\\') {
                    self.escape_return = State::Name;
                    self.state = State::Escape;
                } else {
                    self.append_raw(c)?;
                }
            }
            State::PostName => {
                if v == u32::from(b':') {
                    self.state = State::ValueExpected;
                } else if !is_whitespace(v) {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::ValueExpected => {
                if v == u32::from(b'"') {
                    let top = self.top_frame()?;
                    self.value_start = Some(self.arena.end(top) + 1);
                    self.state = State::StringValue;
                } else if is_digit(v) || v == u32::from(b'-') {
                    let top = self.top_frame()?;
                    self.value_start = Some(self.arena.end(top) + 1);
                    self.append_ascii(v as u8)?;
                    self.state = State::NumberValue;
                } else if v == u32::from(b't') || v == u32::from(b'f') || v == u32::from(b'n') {
                    self.literal = ExpectedLiteralBuffer::new(v);
                    self.state = State::Literal;
                } else if v == u32::from(b'{') || v == u32::from(b'[') {
                    return self.begin_token(v).map(Some);
                } else if v == u32::from(b'}') || v == u32::from(b']') {
                    return self.end_token(v).map(Some);
                } else if !is_whitespace(v) {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::StringValue => {
                if v == u32::from(b'"') {
                    let top = self.top_frame()?;
                    let Some(start) = self.value_start.take() else {
                        return Err(self.fail(ErrorKind::Internal));
                    };
                    let len = self.arena.end(top) + 1 - start;
                    self.value = Slot::Str { start, len };
                    self.arena.or_flags(top, flag::POST_VALUE_CLEANUP);
                    self.state = State::PostValue;
                    return Ok(Some(Code::Value));
                } else if v == u32::from(b'\\') {
                    self.escape_return = State::StringValue;
                    self.state = State::Escape;
                } else {
                    self.append_raw(c)?;
                }
            }
            State::Escape => {
                // Exactly these characters may follow a backslash; `u` opens
                // the four-digit sub-machine.
                let mapped = if v == u32::from(b'"') || v == u32::from(b'\\') || v == u32::from(b'/')
                {
                    v
                } else if v == u32::from(b'b') {
                    0x08
                } else if v == u32::from(b'f') {
                    0x0C
                } else if v == u32::from(b'n') {
                    u32::from(b'\n')
                } else if v == u32::from(b'r') {
                    u32::from(b'\r')
                } else if v == u32::from(b't') {
                    u32::from(b'\t')
                } else if v == u32::from(b'u') {
                    self.unicode.reset();
                    self.state = State::UnicodeEscape;
                    return Ok(None);
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                };
                let encoded = self.encoding.encode(mapped);
                self.append_encoded(encoded)?;
                self.state = self.escape_return;
                self.escape_return = State::None;
            }
            State::UnicodeEscape => {
                let Some(digit) = hex_value(v) else {
                    return Err(self.fail(ErrorKind::Syntax));
                };
                if let Some(scalar) = self.unicode.feed(digit) {
                    // Each \uXXXX is encoded on its own; surrogate halves
                    // produce an empty encoding and append nothing.
                    let encoded = self.encoding.encode(u32::from(scalar));
                    if let Err(e) = self.append_encoded(encoded) {
                        // Roll the digit back so reparsing it after the
                        // buffer grows completes the escape exactly once.
                        self.unicode.pop_digit();
                        return Err(e);
                    }
                    self.unicode.reset();
                    self.state = self.escape_return;
                    self.escape_return = State::None;
                }
            }
            State::NumberValue => {
                if is_digit(v) {
                    self.append_ascii(v as u8)?;
                } else if v == u32::from(b'.') {
                    let top = self.top_frame()?;
                    if self.arena.flags(top) & flag::DECIMAL_SEEN != 0 {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.append_ascii(b'.')?;
                    let top = self.top_frame()?;
                    self.arena.or_flags(top, flag::DECIMAL_SEEN);
                } else if v == u32::from(b'e') || v == u32::from(b'E') {
                    let top = self.top_frame()?;
                    if self.arena.flags(top) & flag::EXPONENT_SEEN != 0 {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.append_ascii(v as u8)?;
                    let top = self.top_frame()?;
                    self.arena.or_flags(top, flag::EXPONENT_SEEN);
                } else if v == u32::from(b'+') || v == u32::from(b'-') {
                    let top = self.top_frame()?;
                    let flags = self.arena.flags(top);
                    // A sign is only valid once, right of the exponent
                    // marker.
                    if flags & flag::EXPONENT_SEEN == 0 || flags & flag::SIGN_SEEN != 0 {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.append_ascii(v as u8)?;
                    let top = self.top_frame()?;
                    self.arena.or_flags(top, flag::SIGN_SEEN);
                } else if is_whitespace(v)
                    || v == u32::from(b',')
                    || v == u32::from(b']')
                    || v == u32::from(b'}')
                {
                    return self.finish_number(v).map(Some);
                } else {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
            State::Literal => match self.literal.step(v) {
                Step::NeedMore => {}
                Step::Done(keyword) => {
                    self.value = match keyword {
                        LiteralValue::True => Slot::Boolean(true),
                        LiteralValue::False => Slot::Boolean(false),
                        LiteralValue::Null => Slot::Null,
                    };
                    let top = self.top_frame()?;
                    self.arena.or_flags(top, flag::POST_VALUE_CLEANUP);
                    self.state = State::PostValue;
                    return Ok(Some(Code::Value));
                }
                Step::Reject => return Err(self.fail(ErrorKind::Syntax)),
            },
            State::PostValue => {
                if v == u32::from(b'}') || v == u32::from(b']') {
                    return self.end_token(v).map(Some);
                } else if v == u32::from(b',') {
                    let top = self.top_frame()?;
                    if self.arena.flags(top) & flag::COMMA_PENDING != 0 {
                        return Err(self.fail(ErrorKind::Syntax));
                    }
                    self.arena.or_flags(top, flag::COMMA_PENDING);
                    self.state = if self.arena.flags(top) & flag::IS_ARRAY != 0 {
                        State::ValueExpected
                    } else {
                        State::NameExpected
                    };
                } else if !is_whitespace(v) {
                    return Err(self.fail(ErrorKind::Syntax));
                }
            }
        }
        Ok(None)
    }

    // --------------------------------------------------------------------
    // Token helpers
    // --------------------------------------------------------------------

    /// Opens an object or array: publishes the container's name from the
    /// frame that becomes its parent, pushes a new frame, and schedules the
    /// depth increase.
    fn begin_token(&mut self, token: u32) -> Result<Code, ParserError> {
        self.name = match self.arena.top() {
            Some(top) if self.arena.flags(top) & flag::HAS_NAME != 0 => self.name_span(top),
            _ => None,
        };
        self.value = Slot::None;

        if self.arena.push().is_err() {
            self.stay();
            return Err(self.suspend(Status::NeedLargerBuffer, ErrorKind::InsufficientMemory));
        }
        let top = self.top_frame()?;
        self.arena
            .or_flags(top, flag::POST_VALUE_CLEANUP | flag::INCREMENT_DEPTH);

        if token == u32::from(b'{') {
            self.state = State::NameExpected;
            Ok(Code::ObjectBegin)
        } else {
            self.arena.or_flags(top, flag::IS_ARRAY);
            self.state = State::ValueExpected;
            Ok(Code::ArrayBegin)
        }
    }

    /// Closes an object or array. The frame itself is popped on the next
    /// call so the close event can still expose the container's name, which
    /// lives in the parent frame's data.
    fn end_token(&mut self, token: u32) -> Result<Code, ParserError> {
        let top = self.top_frame()?;
        let is_array = self.arena.flags(top) & flag::IS_ARRAY != 0;
        if is_array != (token == u32::from(b']')) {
            return Err(self.fail(ErrorKind::TokenMismatch));
        }
        if self.arena.flags(top) & flag::COMMA_PENDING != 0 {
            // Trailing commas are not allowed.
            return Err(self.fail(ErrorKind::Syntax));
        }

        // Containers are values, so a comma or another closing token
        // follows.
        self.state = State::PostValue;
        self.name = None;
        self.arena
            .or_flags(top, flag::MUST_POP | flag::DECREMENT_DEPTH);

        if let Some(parent) = self.arena.parent(top) {
            if self.arena.flags(parent) & flag::HAS_NAME != 0 {
                self.name = self.name_span(parent);
            }
            self.arena.or_flags(parent, flag::POST_VALUE_CLEANUP);
        }

        Ok(if is_array {
            Code::ArrayEnd
        } else {
            Code::ObjectEnd
        })
    }

    /// Parses the captured number text and publishes the value. The
    /// terminating character is rewound unless it was whitespace.
    fn finish_number(&mut self, terminator: u32) -> Result<Code, ParserError> {
        let top = self.top_frame()?;
        let Some(start) = self.value_start.take() else {
            return Err(self.fail(ErrorKind::Internal));
        };
        let end = self.arena.end(top);
        let is_float =
            self.arena.flags(top) & (flag::DECIMAL_SEEN | flag::EXPONENT_SEEN) != 0;
        // Number characters are ASCII by construction. Unparsable captures
        // (a bare minus, integer overflow) fall back to zero, as the
        // original's atoi/atof did.
        let slot = {
            let text = self.arena.slice(start, end + 1 - start);
            let text = core::str::from_utf8(text).unwrap_or("");
            if is_float {
                Slot::Float(text.parse().unwrap_or(0.0))
            } else {
                Slot::Integer(text.parse().unwrap_or(0))
            }
        };
        self.value = slot;
        self.arena.or_flags(top, flag::POST_VALUE_CLEANUP);
        self.state = State::PostValue;
        if !is_whitespace(terminator) {
            self.stay();
        }
        Ok(Code::Value)
    }

    // --------------------------------------------------------------------
    // Buffer plumbing
    // --------------------------------------------------------------------

    fn append_raw(&mut self, c: Char) -> Result<(), ParserError> {
        let bytes = usize::from(c.bytes);
        self.append_bytes(&c.raw[..bytes])
    }

    fn append_encoded(&mut self, e: Encoded) -> Result<(), ParserError> {
        let bytes = usize::from(e.bytes);
        self.append_bytes(&e.raw[..bytes])
    }

    fn append_ascii(&mut self, b: u8) -> Result<(), ParserError> {
        self.append_bytes(&[b])
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> Result<(), ParserError> {
        if self.arena.append(bytes).is_err() {
            // Rewind so the same character is reparsed once the caller has
            // grown the buffer.
            self.stay();
            return Err(self.suspend(Status::NeedLargerBuffer, ErrorKind::InsufficientMemory));
        }
        Ok(())
    }

    fn append_terminator(&mut self) -> Result<(), ParserError> {
        let width = self.encoding.terminator_len();
        if self.arena.append_terminator(width).is_err() {
            self.stay();
            return Err(self.suspend(Status::NeedLargerBuffer, ErrorKind::InsufficientMemory));
        }
        Ok(())
    }

    /// The name stored at `frame`'s data start: everything up to the
    /// terminator.
    fn name_span(&self, frame: u32) -> Option<(u32, u32)> {
        let start = arena::data_start(frame);
        let end = self.arena.end(frame);
        let term = self.encoding.terminator_len() as u32;
        (end + 1 >= start + term).then(|| (start, end + 1 - term - start))
    }

    fn top_frame(&mut self) -> Result<u32, ParserError> {
        match self.arena.top() {
            Some(top) => Ok(top),
            None => Err(self.fail(ErrorKind::Internal)),
        }
    }

    // --------------------------------------------------------------------
    // Errors & event resolution
    // --------------------------------------------------------------------

    fn error(&self, kind: ErrorKind) -> ParserError {
        ParserError {
            kind,
            line: self.line,
            column: self.column,
        }
    }

    fn fail(&mut self, kind: ErrorKind) -> ParserError {
        self.status = Status::Failed(kind);
        self.error(kind)
    }

    fn suspend(&mut self, status: Status, kind: ErrorKind) -> ParserError {
        self.status = status;
        self.error(kind)
    }

    fn resolve(&self, code: Code) -> ParseEvent<'_> {
        let name = self.name.map(|(start, len)| self.arena.slice(start, len));
        match code {
            Code::ObjectBegin => ParseEvent::ObjectBegin { name },
            Code::ObjectEnd => ParseEvent::ObjectEnd { name },
            Code::ArrayBegin => ParseEvent::ArrayBegin { name },
            Code::ArrayEnd => ParseEvent::ArrayEnd { name },
            Code::Name => ParseEvent::Name {
                name: name.unwrap_or(&[]),
            },
            Code::Value => ParseEvent::Value {
                name,
                value: match self.value {
                    Slot::Integer(n) => ScalarValue::Integer(n),
                    Slot::Float(n) => ScalarValue::Float(n),
                    Slot::Str { start, len } => {
                        ScalarValue::String(self.arena.slice(start, len))
                    }
                    Slot::Boolean(b) => ScalarValue::Boolean(b),
                    Slot::None | Slot::Null => ScalarValue::Null,
                },
            },
            Code::EndOfDocument => ParseEvent::EndOfDocument,
        }
    }
}

fn needs_frame(state: State) -> bool {
    !matches!(
        state,
        State::None
            | State::Utf8Bom1
            | State::Utf8Bom2
            | State::Utf16BeBom
            | State::Utf16LeBom
    )
}

fn is_newline(v: u32) -> bool {
    v == u32::from(b'\n') || v == u32::from(b'\r')
}

fn is_whitespace(v: u32) -> bool {
    v == u32::from(b' ') || v == u32::from(b'\t') || is_newline(v)
}

fn is_digit(v: u32) -> bool {
    (0x30..=0x39).contains(&v)
}
