//! The on-demand parsing context.
//!
//! Runs stage 1 only; values are materialized later, one at a time, as
//! the caller walks the [`Document`](super::Document) cursor. The context
//! owns the structural index array, the string buffer the cursor decodes
//! into, and the scratch buffer for root scalars, all reused across
//! `iterate` calls.

use crate::dom::{DEFAULT_MAX_CAPACITY, DEFAULT_MAX_DEPTH};
use crate::error::{Error, Result};
use crate::padded::PADDING;
use crate::stage1;

use super::document::Document;

/// A reusable on-demand parsing context. Parsing takes `&mut self`;
/// give each thread its own parser.
pub struct Parser {
    pub(super) indexes: Vec<u32>,
    pub(super) strings: Vec<u8>,
    pub(super) scratch: Vec<u8>,
    max_capacity: usize,
    pub(super) max_depth: usize,
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
            strings: Vec::new(),
            scratch: Vec::new(),
            max_capacity: DEFAULT_MAX_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Cap the document size this parser accepts.
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            max_capacity: max_capacity.min(DEFAULT_MAX_CAPACITY),
            ..Self::new()
        }
    }

    /// Change the container nesting limit enforced while walking.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Index `buf[..json_len]` and return a cursor positioned at the root
    /// value. Only stage 1 runs here; no tape is built.
    ///
    /// The returned [`Document`] borrows this parser exclusively.
    pub fn iterate<'a>(&'a mut self, buf: &'a [u8], json_len: usize) -> Result<Document<'a>> {
        assert!(
            buf.len() >= json_len + PADDING,
            "buffer must include PADDING extra bytes"
        );
        if json_len > self.max_capacity {
            return Err(Error::Capacity);
        }
        stage1::index_document(buf, json_len, &mut self.indexes)?;
        if self.indexes.first().is_none_or(|&o| o as usize >= json_len) {
            return Err(Error::Empty);
        }
        self.strings.clear();
        Ok(Document::new(self, buf, json_len))
    }
}
