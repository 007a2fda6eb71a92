//! Standalone minification: strip whitespace outside strings, keep every
//! other byte untouched.
//!
//! This is the classifier with a different consumer bolted on; no grammar
//! validation happens, so invalid-but-tokenizable JSON minifies without
//! complaint. The operation is idempotent, and parsing minified output is
//! equivalent to parsing the original.

use crate::error::Result;
use crate::padded::PADDING;
use crate::stage1;

/// Minify `buf[..json_len]` into a fresh buffer.
///
/// `buf` must include [`PADDING`] extra readable bytes after `json_len`.
/// The only errors surfaced are stage-1 errors: invalid UTF-8 and an
/// unclosed string.
pub fn minify(buf: &[u8], json_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    minify_into(buf, json_len, &mut out)?;
    Ok(out)
}

/// Minify into a caller-supplied buffer (cleared first).
pub fn minify_into(buf: &[u8], json_len: usize, out: &mut Vec<u8>) -> Result<()> {
    assert!(
        buf.len() >= json_len + PADDING,
        "buffer must include PADDING extra bytes"
    );
    stage1::minify_document(buf, json_len, out)
}
