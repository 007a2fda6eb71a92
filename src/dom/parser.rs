//! Stage 2: the tape builder.
//!
//! A pushdown automaton over the structural index stream. Each token's
//! first byte dispatches: containers push and pop a small frame stack,
//! scalars call the shared kernels, keys must be followed by a colon. The
//! automaton never re-reads input bytes between tokens, and it stops with
//! `TrailingContent` unless the token after the root value is the `len`
//! sentinel.
//!
//! The parser context owns every buffer (structural indexes, tape,
//! string buffer, frame stack) and reuses them across parses. A document
//! borrows the context, so no parsed value can outlive it and no second
//! parse can begin while one is being read.

use crate::atoms;
use crate::error::{Error, Result};
use crate::number::{self, ParsedNumber};
use crate::padded::PADDING;
use crate::stage1;
use crate::strings;

use super::tape::{Document, TapeDoc, TapeTag, close_payload, word};

/// Default maximum document size (bytes): structural offsets are 32-bit.
pub const DEFAULT_MAX_CAPACITY: usize = u32::MAX as usize;

/// Default maximum container nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// A reusable DOM parsing context.
///
/// Every method that parses takes `&mut self`; give each thread its own
/// parser rather than sharing one behind a lock.
pub struct Parser {
    indexes: Vec<u32>,
    doc: TapeDoc,
    stack: Vec<Frame>,
    scratch: Vec<u8>,
    max_capacity: usize,
    max_depth: usize,
}

struct Frame {
    open_idx: u32,
    count: u32,
    is_array: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            indexes: Vec::new(),
            doc: TapeDoc::default(),
            stack: Vec::new(),
            scratch: Vec::new(),
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Cap the document size this parser accepts; larger inputs fail with
    /// `Capacity` before any scanning happens.
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            max_capacity: max_capacity.min(DEFAULT_MAX_CAPACITY),
            ..Self::new()
        }
    }

    /// Change the container nesting limit.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse one document from a padded buffer.
    ///
    /// `buf[..json_len]` is the document; `buf` must extend at least
    /// [`PADDING`] bytes further. The returned [`Document`] borrows this
    /// parser; parsing again requires dropping it first.
    pub fn parse<'a>(&'a mut self, buf: &'a [u8], json_len: usize) -> Result<Document<'a>> {
        assert!(
            buf.len() >= json_len + PADDING,
            "buffer must include PADDING extra bytes"
        );
        if json_len > self.max_capacity {
            return Err(Error::Capacity);
        }
        stage1::index_document(buf, json_len, &mut self.indexes)?;
        self.build_tape(buf, json_len)?;
        Ok(Document::new(&self.doc))
    }

    /// Run the automaton over `self.indexes`, filling `self.doc`.
    pub(crate) fn build_tape(&mut self, buf: &[u8], json_len: usize) -> Result<()> {
        let mut builder = TapeBuilder {
            buf,
            len: json_len,
            indexes: &self.indexes,
            pos: 0,
            doc: &mut self.doc,
            stack: &mut self.stack,
            scratch: &mut self.scratch,
            max_depth: self.max_depth,
        };
        builder.build(true)
    }

    /// Variant used by the document stream: parse one document starting
    /// at structural position `token_pos` without requiring the sentinel
    /// afterwards. Returns the structural position after the document.
    pub(crate) fn build_tape_partial(
        &mut self,
        buf: &[u8],
        json_len: usize,
        token_pos: usize,
    ) -> Result<usize> {
        let mut builder = TapeBuilder {
            buf,
            len: json_len,
            indexes: &self.indexes,
            pos: token_pos,
            doc: &mut self.doc,
            stack: &mut self.stack,
            scratch: &mut self.scratch,
            max_depth: self.max_depth,
        };
        builder.build(false)?;
        Ok(builder.pos)
    }

    pub(crate) fn indexes(&self) -> &[u32] {
        &self.indexes
    }

    pub(crate) fn index_input(&mut self, buf: &[u8], json_len: usize) -> Result<()> {
        if json_len > self.max_capacity {
            return Err(Error::Capacity);
        }
        stage1::index_document(buf, json_len, &mut self.indexes)
    }

    pub(crate) fn document(&self) -> Document<'_> {
        Document::new(&self.doc)
    }
}

/// Automaton states, one per row group of the transition table.
enum State {
    ObjectBegin,
    ObjectField,
    ObjectContinue,
    ArrayBegin,
    ArrayValue,
    ArrayContinue,
    DocumentEnd,
}

struct TapeBuilder<'a> {
    buf: &'a [u8],
    len: usize,
    indexes: &'a [u32],
    pos: usize,
    doc: &'a mut TapeDoc,
    stack: &'a mut Vec<Frame>,
    scratch: &'a mut Vec<u8>,
    max_depth: usize,
}

impl TapeBuilder<'_> {
    /// Next structural token: `(byte offset, first byte)`. At or past the
    /// sentinel the byte is reported as 0, which matches no grammar rule.
    #[inline]
    fn advance(&mut self) -> (usize, u8) {
        let off = self
            .indexes
            .get(self.pos)
            .map_or(self.len, |&o| o as usize);
        self.pos += 1;
        if off >= self.len {
            (off, 0)
        } else {
            (off, self.buf[off])
        }
    }

    fn build(&mut self, require_sentinel: bool) -> Result<()> {
        self.doc.tape.clear();
        self.doc.strings.clear();
        self.stack.clear();
        self.doc
            .tape
            .try_reserve(self.len + 8)
            .map_err(|_| Error::MemAlloc)?;
        self.doc
            .strings
            .try_reserve(self.len + 64)
            .map_err(|_| Error::MemAlloc)?;

        // Root placeholder, patched once the close position is known.
        self.doc.tape.push(word(TapeTag::Root, 0));

        let (off, c) = self.advance();
        if off >= self.len {
            return Err(Error::Empty);
        }
        let mut state = match c {
            b'{' => {
                self.push_container(false)?;
                State::ObjectBegin
            }
            b'[' => {
                self.push_container(true)?;
                State::ArrayBegin
            }
            _ => {
                self.visit_root_scalar(off, c)?;
                State::DocumentEnd
            }
        };

        loop {
            state = match state {
                State::ObjectBegin => {
                    let (off, c) = self.advance();
                    match c {
                        b'}' => self.close_container()?,
                        b'"' => self.member(off)?,
                        _ => return Err(Error::TapeError),
                    }
                }
                State::ObjectField => {
                    let (off, c) = self.advance();
                    if c == b'"' {
                        self.member(off)?
                    } else {
                        return Err(Error::TapeError);
                    }
                }
                State::ObjectContinue => {
                    let (_, c) = self.advance();
                    match c {
                        b',' => State::ObjectField,
                        b'}' => self.close_container()?,
                        _ => return Err(Error::TapeError),
                    }
                }
                State::ArrayBegin => {
                    let (off, c) = self.advance();
                    if c == b']' {
                        self.close_container()?
                    } else {
                        self.bump_count();
                        self.value(off, c, State::ArrayContinue)?
                    }
                }
                State::ArrayValue => {
                    let (off, c) = self.advance();
                    if c == b']' {
                        // A comma promised another value.
                        return Err(Error::TapeError);
                    }
                    self.bump_count();
                    self.value(off, c, State::ArrayContinue)?
                }
                State::ArrayContinue => {
                    let (_, c) = self.advance();
                    match c {
                        b',' => State::ArrayValue,
                        b']' => self.close_container()?,
                        _ => return Err(Error::TapeError),
                    }
                }
                State::DocumentEnd => break,
            };
        }

        if require_sentinel {
            let next = self
                .indexes
                .get(self.pos)
                .map_or(self.len, |&o| o as usize);
            if next < self.len {
                return Err(Error::TrailingContent);
            }
        }

        let end = self.doc.tape.len() as u64;
        self.doc.tape.push(word(TapeTag::Root, 0));
        self.doc.tape[0] = word(TapeTag::Root, end);
        Ok(())
    }

    /// Object member: key string, colon, then the value.
    fn member(&mut self, key_off: usize) -> Result<State> {
        self.bump_count();
        self.visit_string(key_off)?;
        let (_, c) = self.advance();
        if c != b':' {
            return Err(Error::TapeError);
        }
        let (off, c) = self.advance();
        self.value(off, c, State::ObjectContinue)
    }

    /// Consume one value token; containers change state, scalars emit and
    /// fall through to `continue_state`.
    fn value(&mut self, off: usize, c: u8, continue_state: State) -> Result<State> {
        match c {
            b'{' => {
                self.push_container(false)?;
                Ok(State::ObjectBegin)
            }
            b'[' => {
                self.push_container(true)?;
                Ok(State::ArrayBegin)
            }
            b'"' => {
                self.visit_string(off)?;
                Ok(continue_state)
            }
            b't' => {
                if !atoms::is_valid_true_atom(&self.buf[off..]) {
                    return Err(Error::TAtomError);
                }
                self.doc.tape.push(word(TapeTag::True, 0));
                Ok(continue_state)
            }
            b'f' => {
                if !atoms::is_valid_false_atom(&self.buf[off..]) {
                    return Err(Error::FAtomError);
                }
                self.doc.tape.push(word(TapeTag::False, 0));
                Ok(continue_state)
            }
            b'n' => {
                if !atoms::is_valid_null_atom(&self.buf[off..]) {
                    return Err(Error::NAtomError);
                }
                self.doc.tape.push(word(TapeTag::Null, 0));
                Ok(continue_state)
            }
            b'-' | b'0'..=b'9' => {
                self.visit_number(&self.buf[off..])?;
                Ok(continue_state)
            }
            _ => Err(Error::TapeError),
        }
    }

    fn push_container(&mut self, is_array: bool) -> Result<()> {
        if self.stack.len() >= self.max_depth {
            return Err(Error::DepthError);
        }
        let open_idx = self.doc.tape.len() as u32;
        let tag = if is_array {
            TapeTag::StartArray
        } else {
            TapeTag::StartObject
        };
        self.doc.tape.push(word(tag, 0));
        self.stack.push(Frame {
            open_idx,
            count: 0,
            is_array,
        });
        Ok(())
    }

    /// Write the close cell, back-patch the open cell, pop, and hand back
    /// the parent's continue state.
    fn close_container(&mut self) -> Result<State> {
        let frame = self.stack.pop().ok_or(Error::TapeError)?;
        let close_idx = self.doc.tape.len() as u64;
        let tag = if frame.is_array {
            TapeTag::EndArray
        } else {
            TapeTag::EndObject
        };
        self.doc
            .tape
            .push(word(tag, close_payload(frame.open_idx, frame.count)));
        let open = frame.open_idx as usize;
        let open_tag = if frame.is_array {
            TapeTag::StartArray
        } else {
            TapeTag::StartObject
        };
        self.doc.tape[open] = word(open_tag, close_idx);
        Ok(match self.stack.last() {
            None => State::DocumentEnd,
            Some(parent) if parent.is_array => State::ArrayContinue,
            Some(_) => State::ObjectContinue,
        })
    }

    #[inline]
    fn bump_count(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.count = frame.count.saturating_add(1);
        }
    }

    fn visit_string(&mut self, off: usize) -> Result<()> {
        let (_, prefix) = strings::parse_string(self.buf, off + 1, &mut self.doc.strings)?;
        self.doc
            .tape
            .push(word(TapeTag::String, u64::from(prefix)));
        Ok(())
    }

    fn visit_number(&mut self, src: &[u8]) -> Result<()> {
        let (parsed, _) = number::parse_number(src)?;
        match parsed {
            ParsedNumber::I64(v) => {
                self.doc.tape.push(word(TapeTag::Int64, 0));
                self.doc.tape.push(v as u64);
            }
            ParsedNumber::U64(v) => {
                self.doc.tape.push(word(TapeTag::Uint64, 0));
                self.doc.tape.push(v);
            }
            ParsedNumber::F64(v) => {
                self.doc.tape.push(word(TapeTag::Double, 0));
                self.doc.tape.push(v.to_bits());
            }
        }
        Ok(())
    }

    /// Root scalars may end at the very last input byte; numbers and
    /// atoms are staged through a space-padded scratch copy so the
    /// kernels never interpret caller padding.
    fn visit_root_scalar(&mut self, off: usize, c: u8) -> Result<()> {
        match c {
            b'"' => self.visit_string(off),
            b't' | b'f' | b'n' | b'-' | b'0'..=b'9' => {
                self.scratch.clear();
                self.scratch.extend_from_slice(&self.buf[off..self.len]);
                self.scratch.resize(self.len - off + PADDING, b' ');
                let scratch = std::mem::take(self.scratch);
                let r = match c {
                    b't' => {
                        if atoms::is_valid_true_atom(&scratch) {
                            self.doc.tape.push(word(TapeTag::True, 0));
                            Ok(())
                        } else {
                            Err(Error::TAtomError)
                        }
                    }
                    b'f' => {
                        if atoms::is_valid_false_atom(&scratch) {
                            self.doc.tape.push(word(TapeTag::False, 0));
                            Ok(())
                        } else {
                            Err(Error::FAtomError)
                        }
                    }
                    b'n' => {
                        if atoms::is_valid_null_atom(&scratch) {
                            self.doc.tape.push(word(TapeTag::Null, 0));
                            Ok(())
                        } else {
                            Err(Error::NAtomError)
                        }
                    }
                    _ => self.visit_number(&scratch),
                };
                *self.scratch = scratch;
                r
            }
            _ => Err(Error::TapeError),
        }
    }
}
