//! gj: a high-throughput JSON parser that scans input in 64-byte blocks
//! instead of byte by byte.
//!
//! Parsing runs in two stages. Stage 1 classifies every byte of the
//! padded input in wide blocks, validates UTF-8, and emits the offset of
//! each structural character. Stage 2 feeds those offsets through a
//! pushdown automaton that validates the grammar and builds a flat
//! 64-bit-word tape: the DOM. The [`ondemand`] module consumes the same
//! stage-1 output lazily, materializing only the values the caller walks
//! to; [`stream`] iterates multi-document buffers; [`parallel`] fans
//! NDJSON out across cores.
//!
//! Every entry point takes `(buf, json_len)` where the buffer extends at
//! least [`PADDING`] readable bytes past `json_len`; see [`padded`] for
//! the convenience types that satisfy the contract.
//!
//! ```no_run
//! use gj::padded::PaddedBytes;
//!
//! let input = PaddedBytes::from(r#"{"a":1,"b":[true,null,"x"]}"#);
//! let mut parser = gj::dom::Parser::new();
//! let doc = parser.parse(&input, input.json_len())?;
//! assert_eq!(doc.root().at_key("a")?.get_i64()?, 1);
//! assert_eq!(doc.root().at_key("b")?.at_index(2)?.get_str()?, "x");
//! # Ok::<(), gj::Error>(())
//! ```

pub mod dom;
pub mod error;
pub mod ondemand;
pub mod padded;
pub mod parallel;
pub mod stream;

mod atoms;
mod minify;
mod number;
mod stage1;
mod strings;

pub use error::{Error, Result};
pub use minify::{minify, minify_into};
pub use padded::{PADDING, PaddedBytes, pad_buffer};
pub use stream::DocumentStream;

/// Strip UTF-8 BOM (U+FEFF, bytes EF BB BF) from the beginning of a buffer.
///
/// The parser itself treats a BOM as garbage, per RFC 8259; callers who
/// accept BOM-prefixed files call this first.
pub fn strip_bom(buf: &mut Vec<u8>) {
    if buf.starts_with(&[0xEF, 0xBB, 0xBF]) {
        buf.drain(..3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_bom_present() {
        let mut buf = vec![0xEF, 0xBB, 0xBF, b'"', b'h', b'i', b'"'];
        strip_bom(&mut buf);
        assert_eq!(buf, b"\"hi\"");
    }

    #[test]
    fn strip_bom_absent() {
        let mut buf = b"\"hi\"".to_vec();
        strip_bom(&mut buf);
        assert_eq!(buf, b"\"hi\"");
    }

    #[test]
    fn strip_bom_empty() {
        let mut buf = Vec::new();
        strip_bom(&mut buf);
        assert!(buf.is_empty());
    }

    #[test]
    fn strip_bom_only_bom() {
        let mut buf = vec![0xEF, 0xBB, 0xBF];
        strip_bom(&mut buf);
        assert!(buf.is_empty());
    }
}
