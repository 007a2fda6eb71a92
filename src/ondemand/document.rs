//! The on-demand cursor: a strictly forward walk over the structural
//! token stream that materializes values only when asked.
//!
//! The cursor is (token position, nesting depth). Containers hand out
//! handles that remember the depth they live at; abandoning a handle is
//! fine because the next operation on the parent first fast-forwards the
//! cursor back to the parent's depth, counting only structural tokens and
//! never re-reading input bytes in between. Accessors that fail with
//! `IncorrectType` leave the cursor in place so a different accessor can
//! be tried.

use crate::atoms;
use crate::error::{Error, Result};
use crate::number::{self, ParsedNumber};
use crate::padded::PADDING;
use crate::strings::{self, read_prefixed};

use super::parser::Parser;

/// A cursor positioned on one JSON document. Borrow of the parser that
/// produced it; strings returned by accessors stay valid until the next
/// string-returning call.
pub struct Document<'a> {
    parser: &'a mut Parser,
    buf: &'a [u8],
    len: usize,
    /// Position in the structural index array.
    token: usize,
    /// Number of containers the cursor is currently inside.
    depth: usize,
}

impl<'a> Document<'a> {
    pub(super) fn new(parser: &'a mut Parser, buf: &'a [u8], len: usize) -> Self {
        Self {
            parser,
            buf,
            len,
            token: 0,
            depth: 0,
        }
    }

    /// Current token: `(byte offset, first byte)`; byte 0 at the sentinel.
    #[inline]
    fn peek(&self) -> (usize, u8) {
        let off = self
            .parser
            .indexes
            .get(self.token)
            .map_or(self.len, |&o| o as usize);
        if off >= self.len {
            (off, 0)
        } else {
            (off, self.buf[off])
        }
    }

    #[inline]
    fn advance(&mut self) {
        self.token += 1;
    }

    /// True once the cursor has consumed everything up to the sentinel.
    pub fn at_end(&self) -> bool {
        self.peek().0 >= self.len
    }

    /// Fast-forward until the cursor is back at `target` depth, skipping
    /// whatever remains of deeper containers. Token-level only.
    fn skip_to_depth(&mut self, target: usize) -> Result<()> {
        while self.depth > target {
            let (off, c) = self.peek();
            if off >= self.len {
                return Err(Error::TapeError);
            }
            match c {
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => self.depth -= 1,
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skip one whole value sitting at the cursor.
    fn skip_value(&mut self) -> Result<()> {
        let (off, c) = self.peek();
        if off >= self.len {
            return Err(Error::TapeError);
        }
        match c {
            b'{' | b'[' => {
                let here = self.depth;
                self.depth += 1;
                self.advance();
                self.skip_to_depth(here)
            }
            b'}' | b']' | b':' | b',' => Err(Error::TapeError),
            _ => {
                self.advance();
                Ok(())
            }
        }
    }

    // --- scalar reads (shared by Document and Value) ---

    /// Parse the number at the cursor without advancing. Root numbers may
    /// run to the end of input, so they go through a space-padded scratch
    /// copy; nested numbers always have a real terminator in the buffer.
    fn peek_number(&mut self) -> Result<ParsedNumber> {
        let (off, c) = self.peek();
        if !matches!(c, b'-' | b'0'..=b'9') {
            return Err(Error::IncorrectType);
        }
        let parsed = if self.depth == 0 {
            self.parser.scratch.clear();
            self.parser.scratch.extend_from_slice(&self.buf[off..self.len]);
            let scratch_len = self.len - off + PADDING;
            self.parser.scratch.resize(scratch_len, b' ');
            number::parse_number(&self.parser.scratch)?.0
        } else {
            number::parse_number(&self.buf[off..])?.0
        };
        Ok(parsed)
    }

    fn read_i64(&mut self) -> Result<i64> {
        match self.peek_number()? {
            ParsedNumber::I64(v) => {
                self.advance();
                Ok(v)
            }
            ParsedNumber::U64(v) => match i64::try_from(v) {
                Ok(v) => {
                    self.advance();
                    Ok(v)
                }
                Err(_) => Err(Error::NumberOutOfRange),
            },
            ParsedNumber::F64(_) => Err(Error::IncorrectType),
        }
    }

    fn read_u64(&mut self) -> Result<u64> {
        match self.peek_number()? {
            ParsedNumber::U64(v) => {
                self.advance();
                Ok(v)
            }
            ParsedNumber::I64(v) => match u64::try_from(v) {
                Ok(v) => {
                    self.advance();
                    Ok(v)
                }
                Err(_) => Err(Error::NumberOutOfRange),
            },
            ParsedNumber::F64(_) => Err(Error::IncorrectType),
        }
    }

    fn read_f64(&mut self) -> Result<f64> {
        let v = match self.peek_number()? {
            ParsedNumber::F64(v) => v,
            ParsedNumber::I64(v) => v as f64,
            ParsedNumber::U64(v) => v as f64,
        };
        self.advance();
        Ok(v)
    }

    fn read_bool(&mut self) -> Result<bool> {
        let (off, c) = self.peek();
        match c {
            b't' => {
                if self.atom_valid(off, c) {
                    self.advance();
                    Ok(true)
                } else {
                    Err(Error::TAtomError)
                }
            }
            b'f' => {
                if self.atom_valid(off, c) {
                    self.advance();
                    Ok(false)
                } else {
                    Err(Error::FAtomError)
                }
            }
            _ => Err(Error::IncorrectType),
        }
    }

    fn read_is_null(&mut self) -> Result<bool> {
        let (off, c) = self.peek();
        if c != b'n' {
            return Ok(false);
        }
        if self.atom_valid(off, c) {
            self.advance();
            Ok(true)
        } else {
            Err(Error::NAtomError)
        }
    }

    /// Validate an atom at `off`, staging root atoms through the scratch
    /// copy for the same reason as numbers.
    fn atom_valid(&mut self, off: usize, c: u8) -> bool {
        let check = |src: &[u8]| match c {
            b't' => atoms::is_valid_true_atom(src),
            b'f' => atoms::is_valid_false_atom(src),
            _ => atoms::is_valid_null_atom(src),
        };
        if self.depth == 0 {
            self.parser.scratch.clear();
            self.parser.scratch.extend_from_slice(&self.buf[off..self.len]);
            let scratch_len = self.len - off + PADDING;
            self.parser.scratch.resize(scratch_len, b' ');
            check(&self.parser.scratch)
        } else {
            check(&self.buf[off..])
        }
    }

    fn read_string(&mut self) -> Result<&str> {
        let (off, c) = self.peek();
        if c != b'"' {
            return Err(Error::IncorrectType);
        }
        self.parser.strings.clear();
        let (_, prefix) = strings::parse_string(self.buf, off + 1, &mut self.parser.strings)?;
        self.advance();
        let bytes = read_prefixed(&self.parser.strings, prefix);
        std::str::from_utf8(bytes).map_err(|_| Error::StringError)
    }

    /// Decode the key at `key_off` and compare with `name` (unescaped,
    /// case-sensitive bytes).
    fn key_equals(&mut self, key_off: usize, name: &str) -> Result<bool> {
        self.parser.strings.clear();
        let (_, prefix) = strings::parse_string(self.buf, key_off + 1, &mut self.parser.strings)?;
        Ok(read_prefixed(&self.parser.strings, prefix) == name.as_bytes())
    }

    fn open_container(&mut self, open: u8) -> Result<(usize, usize)> {
        let (_, c) = self.peek();
        if c != open {
            return Err(Error::IncorrectType);
        }
        if self.depth >= self.parser.max_depth {
            return Err(Error::DepthError);
        }
        self.advance();
        self.depth += 1;
        Ok((self.depth, self.token))
    }

    // --- public accessors on the root value ---

    pub fn get_object(&mut self) -> Result<Object<'_, 'a>> {
        let (depth, start) = self.open_container(b'{')?;
        Ok(Object {
            doc: self,
            depth,
            start_token: start,
            pending_value: None,
        })
    }

    pub fn get_array(&mut self) -> Result<Array<'_, 'a>> {
        let (depth, start) = self.open_container(b'[')?;
        Ok(Array {
            doc: self,
            depth,
            start_token: start,
            pending_value: None,
        })
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        self.read_bool()
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.read_i64()
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.read_u64()
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.read_f64()
    }

    pub fn get_string(&mut self) -> Result<&str> {
        self.read_string()
    }

    pub fn is_null(&mut self) -> Result<bool> {
        self.read_is_null()
    }
}

/// A value handle produced by object field lookups and array iteration.
/// Consuming it (or letting it drop unconsumed) both leave the cursor in
/// a state the parent container can continue from.
pub struct Value<'b, 'a> {
    doc: &'b mut Document<'a>,
}

impl<'a> Value<'_, 'a> {
    pub fn get_object(&mut self) -> Result<Object<'_, 'a>> {
        let (depth, start) = self.doc.open_container(b'{')?;
        Ok(Object {
            doc: &mut *self.doc,
            depth,
            start_token: start,
            pending_value: None,
        })
    }

    pub fn get_array(&mut self) -> Result<Array<'_, 'a>> {
        let (depth, start) = self.doc.open_container(b'[')?;
        Ok(Array {
            doc: &mut *self.doc,
            depth,
            start_token: start,
            pending_value: None,
        })
    }

    pub fn get_bool(&mut self) -> Result<bool> {
        self.doc.read_bool()
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        self.doc.read_i64()
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        self.doc.read_u64()
    }

    pub fn get_f64(&mut self) -> Result<f64> {
        self.doc.read_f64()
    }

    pub fn get_string(&mut self) -> Result<&str> {
        self.doc.read_string()
    }

    pub fn is_null(&mut self) -> Result<bool> {
        self.doc.read_is_null()
    }
}

/// An object being walked. Forward-only; see [`Object::find_field`] for
/// the ordering contract.
pub struct Object<'b, 'a> {
    doc: &'b mut Document<'a>,
    depth: usize,
    start_token: usize,
    /// Token index of a handed-out value the caller may not have
    /// consumed; skipped lazily on the next operation.
    pending_value: Option<usize>,
}

impl<'a> Object<'_, 'a> {
    /// Normalize the cursor to a field boundary: clean up after an
    /// abandoned child container or an unconsumed value. Returns `false`
    /// once this object's closing brace has already been consumed.
    fn normalize(&mut self) -> Result<bool> {
        if self.doc.depth < self.depth {
            return Ok(false);
        }
        self.doc.skip_to_depth(self.depth)?;
        if let Some(t) = self.pending_value.take() {
            if self.doc.token == t {
                self.doc.skip_value()?;
            }
        }
        Ok(true)
    }

    /// Scan forward for `name`, comparing against each unescaped key.
    ///
    /// The cursor never rewinds past work already done: a search that did
    /// not start at the first field wraps around the object once, so any
    /// single field can be found regardless of call order, but a field
    /// can only be visited once per pass.
    pub fn find_field(&mut self, name: &str) -> Result<Value<'_, 'a>> {
        if !self.normalize()? {
            return Err(Error::NoSuchField);
        }
        let search_start = self.doc.token;
        let mut expect_comma = search_start != self.start_token;
        let mut wrapped = false;
        loop {
            if wrapped && self.doc.token >= search_start {
                return Err(Error::NoSuchField);
            }
            let (_, c) = self.doc.peek();
            if expect_comma {
                match c {
                    b',' => self.doc.advance(),
                    b'}' => {
                        if !wrapped && search_start != self.start_token {
                            wrapped = true;
                            self.doc.token = self.start_token;
                            expect_comma = false;
                            continue;
                        }
                        return Err(Error::NoSuchField);
                    }
                    _ => return Err(Error::TapeError),
                }
            } else if c == b'}' {
                return Err(Error::NoSuchField);
            }
            expect_comma = true;

            let (key_off, kc) = self.doc.peek();
            if kc != b'"' {
                return Err(Error::TapeError);
            }
            let matched = self.doc.key_equals(key_off, name)?;
            self.doc.advance();
            let (_, colon) = self.doc.peek();
            if colon != b':' {
                return Err(Error::TapeError);
            }
            self.doc.advance();
            if matched {
                self.pending_value = Some(self.doc.token);
                return Ok(Value {
                    doc: &mut *self.doc,
                });
            }
            self.doc.skip_value()?;
        }
    }

    /// Next field in source order, or `None` at the closing brace.
    pub fn next_field(&mut self) -> Result<Option<Field<'_, 'a>>> {
        if !self.normalize()? {
            return Ok(None);
        }
        let (_, c) = self.doc.peek();
        if c == b'}' {
            self.doc.advance();
            self.doc.depth -= 1;
            return Ok(None);
        }
        if self.doc.token != self.start_token {
            if c != b',' {
                return Err(Error::TapeError);
            }
            self.doc.advance();
        }
        let (key_off, kc) = self.doc.peek();
        if kc != b'"' {
            return Err(Error::TapeError);
        }
        self.doc.advance();
        let (_, colon) = self.doc.peek();
        if colon != b':' {
            return Err(Error::TapeError);
        }
        self.doc.advance();
        self.pending_value = Some(self.doc.token);
        Ok(Some(Field {
            doc: &mut *self.doc,
            key_off,
        }))
    }
}

/// One object field: the key plus a value handle at the cursor.
pub struct Field<'b, 'a> {
    doc: &'b mut Document<'a>,
    key_off: usize,
}

impl<'b, 'a> Field<'b, 'a> {
    /// The unescaped key. Valid until the next string-returning call.
    pub fn key(&mut self) -> Result<&str> {
        self.doc.parser.strings.clear();
        let (_, prefix) =
            strings::parse_string(self.doc.buf, self.key_off + 1, &mut self.doc.parser.strings)?;
        let bytes = read_prefixed(&self.doc.parser.strings, prefix);
        std::str::from_utf8(bytes).map_err(|_| Error::StringError)
    }

    /// The field's value, consuming the field handle.
    pub fn value(self) -> Value<'b, 'a> {
        Value { doc: self.doc }
    }
}

/// An array being walked, forward-only.
pub struct Array<'b, 'a> {
    doc: &'b mut Document<'a>,
    depth: usize,
    start_token: usize,
    pending_value: Option<usize>,
}

impl<'a> Array<'_, 'a> {
    /// See [`Object::normalize`].
    fn normalize(&mut self) -> Result<bool> {
        if self.doc.depth < self.depth {
            return Ok(false);
        }
        self.doc.skip_to_depth(self.depth)?;
        if let Some(t) = self.pending_value.take() {
            if self.doc.token == t {
                self.doc.skip_value()?;
            }
        }
        Ok(true)
    }

    /// Next element in source order, or `None` at the closing bracket.
    pub fn next_element(&mut self) -> Result<Option<Value<'_, 'a>>> {
        if !self.normalize()? {
            return Ok(None);
        }
        let (_, c) = self.doc.peek();
        if c == b']' {
            self.doc.advance();
            self.doc.depth -= 1;
            return Ok(None);
        }
        if self.doc.token != self.start_token {
            if c != b',' {
                return Err(Error::TapeError);
            }
            self.doc.advance();
        }
        self.pending_value = Some(self.doc.token);
        Ok(Some(Value {
            doc: &mut *self.doc,
        }))
    }
}
