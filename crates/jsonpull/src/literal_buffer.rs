//! Matcher for the `true`, `false`, and `null` keyword chains.

/// Which keyword the matcher is walking through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiteralValue {
    Null,
    True,
    False,
}

/// What happened after feeding one more character into the literal matcher?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Character matched, but the literal is not finished yet.
    NeedMore,
    /// Character matched *and* it was the last byte of the literal.
    Done(LiteralValue),
    /// Character did **not** match the expected byte.
    Reject,
}

/// `None`  ➜  not in the middle of a literal
/// `Some`  ➜  `(remaining_bytes, keyword)` while matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExpectedLiteralBuffer(Option<(&'static [u8], LiteralValue)>);

impl ExpectedLiteralBuffer {
    /// No literal is in flight.
    pub(crate) fn none() -> Self {
        ExpectedLiteralBuffer(None)
    }

    /// Start matching after the *first* character (`n`, `t`, or `f`).
    pub(crate) fn new(first: u32) -> Self {
        match first {
            n if n == u32::from(b'n') => ExpectedLiteralBuffer(Some((b"ull", LiteralValue::Null))),
            t if t == u32::from(b't') => ExpectedLiteralBuffer(Some((b"rue", LiteralValue::True))),
            f if f == u32::from(b'f') => ExpectedLiteralBuffer(Some((b"alse", LiteralValue::False))),
            _ => ExpectedLiteralBuffer::none(),
        }
    }

    /// Give the matcher the next input character and learn what to do next.
    pub(crate) fn step(&mut self, c: u32) -> Step {
        let Some((bytes, keyword)) = self.0.take() else {
            return Step::Reject;
        };

        match bytes.split_first() {
            Some((&expected, rest)) if u32::from(expected) == c => {
                if rest.is_empty() {
                    Step::Done(keyword)
                } else {
                    self.0 = Some((rest, keyword));
                    Step::NeedMore
                }
            }
            _ => {
                // Mismatch – restore the state we took at the top.
                self.0 = Some((bytes, keyword));
                Step::Reject
            }
        }
    }
}
