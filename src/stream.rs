//! parse-many: a stream of whitespace-separated top-level documents in
//! one padded buffer (NDJSON and friends).
//!
//! Stage 1 runs once over the whole buffer; the stream then replays the
//! structural indexes through stage 2 one document at a time, reusing the
//! parser's tape and string buffer for each. `next` is a lending call:
//! each yielded [`Document`] borrows the parser and must be dropped
//! before the next one is requested.

use crate::dom::{Document, Parser};
use crate::error::Result;
use crate::padded::PADDING;
use crate::stage1;

/// Iterator-style access to a multi-document buffer. Created by
/// [`DocumentStream::new`].
pub struct DocumentStream<'a> {
    parser: &'a mut Parser,
    buf: &'a [u8],
    len: usize,
    token_pos: usize,
    finished: bool,
}

impl<'a> DocumentStream<'a> {
    /// Index the whole buffer and position the stream at the first
    /// document.
    ///
    /// Stage-1 errors (invalid UTF-8 anywhere, unclosed string) surface
    /// here; grammar errors surface per document from [`next`].
    ///
    /// [`next`]: DocumentStream::next
    pub fn new(parser: &'a mut Parser, buf: &'a [u8], json_len: usize) -> Result<Self> {
        assert!(
            buf.len() >= json_len + PADDING,
            "buffer must include PADDING extra bytes"
        );
        parser.index_input(buf, json_len)?;
        Ok(Self {
            parser,
            buf,
            len: json_len,
            token_pos: 0,
            finished: false,
        })
    }

    /// Parse and yield the next document, or `None` after the last one.
    /// A grammar error ends the stream.
    #[allow(clippy::should_implement_trait)] // lending iterator, not Iterator
    pub fn next(&mut self) -> Option<Result<Document<'_>>> {
        if self.finished {
            return None;
        }
        let next_off = self
            .parser
            .indexes()
            .get(self.token_pos)
            .map_or(self.len, |&o| o as usize);
        if next_off >= self.len {
            self.finished = true;
            return None;
        }
        match self
            .parser
            .build_tape_partial(self.buf, self.len, self.token_pos)
        {
            Ok(next_pos) => {
                self.token_pos = next_pos;
                Some(Ok(self.parser.document()))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    /// Bytes after the last complete top-level value, per the stage-1
    /// streaming boundary. Non-zero means the buffer ends mid-document.
    pub fn truncated_bytes(&self) -> usize {
        self.len - stage1::last_document_boundary(self.buf, self.len, self.parser.indexes())
    }
}
