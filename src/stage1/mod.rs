//! Stage 1: the structural indexer.
//!
//! One streaming pass over the padded input classifies every byte along
//! three axes (whitespace, operator, inside-a-string) and emits the byte
//! offset of every structural character: the six operators plus the first
//! byte of every atom (`"`, `t`, `f`, `n`, `-`, `0`-`9`) outside strings.
//! UTF-8 validation rides along on the same blocks. The only errors this
//! stage can surface are invalid UTF-8 and an unclosed string; everything
//! grammatical waits for stage 2.
//!
//! The emitted index array ends with two sentinel entries equal to
//! `json_len`, so stage 2 can always peek one token ahead without a bounds
//! check.

pub(crate) mod bits;
mod classify;
mod utf8;

use bits::prefix_xor;

use crate::error::{Error, Result};
use classify::Block;
use utf8::Utf8Validator;

/// Per-block scanner state carried across the 64-byte windows.
struct Scanner {
    /// All-ones while the scan position is inside a string literal.
    prev_in_string: u64,
    /// Set when the last byte of the previous block was an active escape.
    prev_escaped: u64,
    /// Set when the last byte of the previous block was a non-quote scalar.
    prev_scalar: u64,
    utf8: Utf8Validator,
}

impl Scanner {
    fn new() -> Self {
        Self {
            prev_in_string: 0,
            prev_escaped: 0,
            prev_scalar: 0,
            utf8: Utf8Validator::new(),
        }
    }

    /// Positions escaped by an active backslash, with carry across blocks.
    ///
    /// A backslash is active only when it is not itself escaped, i.e. when
    /// it terminates an odd-length backslash run. Branchless form: odd-run
    /// parity falls out of one addition over the run.
    #[inline]
    fn next_escaped(&mut self, backslash: u64) -> u64 {
        const ODD_BITS: u64 = 0xAAAA_AAAA_AAAA_AAAA;
        let potential_escape = backslash & !self.prev_escaped;
        let maybe_escaped = potential_escape << 1;
        let maybe_escaped_and_odd = maybe_escaped | ODD_BITS;
        let even_series_and_odd = maybe_escaped_and_odd.wrapping_sub(potential_escape);
        let escape_and_terminal = even_series_and_odd ^ ODD_BITS;
        let escaped = escape_and_terminal ^ (backslash | self.prev_escaped);
        let escape = escape_and_terminal & backslash;
        self.prev_escaped = escape >> 63;
        escaped
    }

    /// Scan one block; returns the structural mask and the mask of
    /// whitespace outside strings (the minifier's removal set).
    #[inline]
    fn next(&mut self, raw: &[u8; 64]) -> (u64, u64) {
        let block = Block::load(raw, 0);
        self.utf8.check_block(raw, block.high_bits());

        let backslash = block.eq(b'\\');
        let escaped = self.next_escaped(backslash);
        let quote = block.eq(b'"') & !escaped;

        // Region from each opening quote (inclusive) to its closing quote
        // (exclusive), with polarity carried across blocks.
        let in_string = prefix_xor(quote) ^ self.prev_in_string;
        // Interior plus closing quote: the part that can never hold a
        // structural token. The opening quote stays visible as the start
        // of the string atom.
        let string_tail = in_string ^ quote;
        self.prev_in_string = ((in_string as i64) >> 63) as u64;

        let classes = block.classify();
        let scalar = classes.scalar();
        let nonquote_scalar = scalar & !quote;
        let follows_nonquote_scalar = bits::follows(nonquote_scalar, &mut self.prev_scalar);

        let potential_scalar_start = scalar & !follows_nonquote_scalar;
        let potential_structural = classes.op | potential_scalar_start;
        let structurals = potential_structural & !string_tail;

        let ws_outside_string = classes.whitespace & !in_string;
        (structurals, ws_outside_string)
    }

    /// End-of-input checks: dangling string polarity, UTF-8 verdict.
    fn finish(&self) -> Result<()> {
        self.utf8.finish()?;
        if self.prev_in_string != 0 {
            return Err(Error::UnclosedString);
        }
        Ok(())
    }
}

/// Append the offsets of all set bits of `mask` (base-relative) to `out`.
#[inline]
fn extract_bits(mut mask: u64, base: usize, out: &mut Vec<u32>) {
    while mask != 0 {
        out.push((base + mask.trailing_zeros() as usize) as u32);
        mask &= mask - 1;
    }
}

/// Run stage 1 over `buf[..json_len]`, filling `indexes` with structural
/// offsets followed by two `json_len` sentinels.
///
/// `buf` must satisfy the padded-buffer contract. The final partial block
/// is staged through a space-padded local copy so padding bytes are never
/// interpreted.
pub(crate) fn index_document(buf: &[u8], json_len: usize, indexes: &mut Vec<u32>) -> Result<()> {
    debug_assert!(buf.len() >= json_len + crate::padded::PADDING);
    indexes.clear();
    // Worst case: one structural per input byte, plus two sentinels.
    indexes
        .try_reserve(json_len + 2)
        .map_err(|_| Error::MemAlloc)?;

    let mut scanner = Scanner::new();
    let mut pos = 0;
    while pos + 64 <= json_len {
        let block: &[u8; 64] = buf[pos..pos + 64].try_into().unwrap();
        let (structurals, _) = scanner.next(block);
        extract_bits(structurals, pos, indexes);
        pos += 64;
    }
    if pos < json_len {
        let mut block = [b' '; 64];
        block[..json_len - pos].copy_from_slice(&buf[pos..json_len]);
        let (structurals, _) = scanner.next(&block);
        extract_bits(structurals, pos, indexes);
    }
    scanner.finish()?;
    indexes.push(json_len as u32);
    indexes.push(json_len as u32);
    Ok(())
}

/// Minify `buf[..json_len]` into `out`: drop whitespace outside strings,
/// keep everything else byte for byte.
///
/// Runs the same scanner as [`index_document`] but consumes the whitespace
/// mask instead of the structural mask. Surfaces the same stage-1 errors.
pub(crate) fn minify_document(buf: &[u8], json_len: usize, out: &mut Vec<u8>) -> Result<()> {
    debug_assert!(buf.len() >= json_len + crate::padded::PADDING);
    out.clear();
    out.try_reserve(json_len).map_err(|_| Error::MemAlloc)?;

    let mut scanner = Scanner::new();
    let mut pos = 0;
    while pos + 64 <= json_len {
        let block: &[u8; 64] = buf[pos..pos + 64].try_into().unwrap();
        let (_, ws) = scanner.next(block);
        copy_kept(block, ws, 64, out);
        pos += 64;
    }
    if pos < json_len {
        let remaining = json_len - pos;
        let mut block = [b' '; 64];
        block[..remaining].copy_from_slice(&buf[pos..json_len]);
        let (_, ws) = scanner.next(&block);
        // The fabricated space padding is whitespace outside any string
        // (an unclosed string errors below), so it drops out on its own;
        // the cap is belt and braces against writing past the real input.
        copy_kept(&block, ws, remaining, out);
    }
    scanner.finish()
}

#[inline]
fn copy_kept(block: &[u8; 64], ws_mask: u64, limit: usize, out: &mut Vec<u8>) {
    let mut keep = !ws_mask;
    if limit < 64 {
        keep &= (1u64 << limit) - 1;
    }
    while keep != 0 {
        let i = keep.trailing_zeros() as usize;
        // Copy the contiguous kept run starting at i.
        let run = (keep >> i).trailing_ones() as usize;
        out.extend_from_slice(&block[i..i + run]);
        if i + run == 64 {
            break;
        }
        keep &= !(((1u64 << run) - 1) << i);
    }
}

/// Byte offset just past the last complete top-level value, given the
/// structural indexes for the buffer (sentinels included).
///
/// This is the streaming mode of stage 1: a forward walk over the
/// depth-zero positions remembered from the main scan. Scalars at depth
/// zero complete at their own token; containers complete at the matching
/// close.
pub(crate) fn last_document_boundary(buf: &[u8], json_len: usize, indexes: &[u32]) -> usize {
    let mut depth = 0usize;
    let mut boundary = 0usize;
    let mut pending_scalar = false;
    for &idx in indexes {
        let offset = idx as usize;
        if offset >= json_len {
            break;
        }
        // A depth-zero scalar from the previous iteration ends where the
        // next token (or the sentinel) begins.
        if pending_scalar {
            boundary = offset;
            pending_scalar = false;
        }
        match buf[offset] {
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    boundary = offset + 1;
                }
            }
            b':' | b',' => {}
            _ if depth == 0 => pending_scalar = true,
            _ => {}
        }
    }
    if pending_scalar {
        // A trailing depth-zero scalar runs to the end of the input.
        boundary = json_len;
    }
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::padded::pad_buffer;

    fn structurals(json: &[u8]) -> Vec<u32> {
        let buf = pad_buffer(json);
        let mut idx = Vec::new();
        index_document(&buf, json.len(), &mut idx).unwrap();
        // Strip the sentinels for comparison.
        assert_eq!(idx[idx.len() - 1], json.len() as u32);
        assert_eq!(idx[idx.len() - 2], json.len() as u32);
        idx.truncate(idx.len() - 2);
        idx
    }

    fn offsets_of(json: &[u8], chars: &[u8]) -> Vec<u32> {
        json.iter()
            .enumerate()
            .filter(|(_, b)| chars.contains(b))
            .map(|(i, _)| i as u32)
            .collect()
    }

    #[test]
    fn simple_object() {
        let json = br#"{"a":1}"#;
        assert_eq!(structurals(json), vec![0, 1, 4, 5, 6]);
    }

    #[test]
    fn atoms_emit_first_byte_only() {
        let json = b"[123, true, null]";
        assert_eq!(structurals(json), vec![0, 1, 4, 6, 10, 12, 16]);
    }

    #[test]
    fn operators_inside_strings_are_invisible() {
        let json = br#"["{[,:]}"]"#;
        assert_eq!(structurals(json), vec![0, 1, 9]);
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let json = br#"["a\"b", 1]"#;
        assert_eq!(structurals(json), vec![0, 1, 7, 9, 10]);
    }

    #[test]
    fn escaped_backslash_then_quote_closes_string() {
        // "a\\": the backslash escapes itself, the quote closes.
        let json = br#"["a\\", 1]"#;
        assert_eq!(structurals(json), vec![0, 1, 6, 8, 9]);
    }

    #[test]
    fn odd_backslash_run_crossing_block_boundary() {
        // Put a run of backslashes so the block boundary splits it.
        let mut json = Vec::new();
        json.push(b'"');
        json.extend_from_slice(&vec![b'x'; 61]);
        json.extend_from_slice(br#"\\\""#); // escaped backslash + escaped quote
        json.extend_from_slice(b"y\"");
        let idx = structurals(&json);
        assert_eq!(idx, vec![0]); // one string token, quote at 0
    }

    #[test]
    fn string_spanning_block_boundary() {
        let mut json = Vec::new();
        json.extend_from_slice(b"[\"");
        json.extend_from_slice(&vec![b'a'; 100]);
        json.extend_from_slice(b"\",1]");
        let idx = structurals(&json);
        assert_eq!(idx, vec![0, 1, 103, 104, 105]);
    }

    #[test]
    fn number_spanning_block_boundary() {
        // 60 spaces, then a number crossing the 64-byte line: one token.
        let mut json = vec![b' '; 60];
        json.extend_from_slice(b"123456789123");
        let idx = structurals(&json);
        assert_eq!(idx, vec![60]);
    }

    #[test]
    fn scalar_after_closing_quote_is_a_token() {
        // Trailing garbage stays visible so stage 2 can reject it.
        let json = br#""a"x"#;
        assert_eq!(structurals(json), vec![0, 3]);
    }

    #[test]
    fn whitespace_only_has_no_structurals() {
        assert_eq!(structurals(b"  \t\n  "), Vec::<u32>::new());
        assert_eq!(structurals(b""), Vec::<u32>::new());
    }

    #[test]
    fn unclosed_string_is_detected() {
        let buf = pad_buffer(br#"{"a": "never closed}"#);
        let mut idx = Vec::new();
        assert_eq!(
            index_document(&buf, 20, &mut idx),
            Err(Error::UnclosedString)
        );
    }

    #[test]
    fn invalid_utf8_is_detected() {
        let json = [b'[', 0xFF, b']'];
        let buf = pad_buffer(&json);
        let mut idx = Vec::new();
        assert_eq!(index_document(&buf, 3, &mut idx), Err(Error::Utf8Error));
    }

    #[test]
    fn all_ops_found_in_large_doc() {
        let json: Vec<u8> = br#"{"a":[1,2,{"b":null}],"c":{"d":[true,false]}}"#
            .iter()
            .copied()
            .collect();
        let idx = structurals(&json);
        let ops = offsets_of(&json, b"{}[]:,");
        for o in ops {
            assert!(idx.contains(&o), "missing op at {o}");
        }
    }

    // --- minify ---

    fn minified(json: &[u8]) -> Vec<u8> {
        let buf = pad_buffer(json);
        let mut out = Vec::new();
        minify_document(&buf, json.len(), &mut out).unwrap();
        out
    }

    #[test]
    fn minify_drops_outside_whitespace_only() {
        assert_eq!(
            minified(br#"{ "a" : "b c" , "d" : [ 1 , 2 ] }"#),
            br#"{"a":"b c","d":[1,2]}"#.to_vec()
        );
    }

    #[test]
    fn minify_preserves_escaped_quotes() {
        assert_eq!(
            minified(br#"{ "a\"b" : 1 }"#),
            br#"{"a\"b":1}"#.to_vec()
        );
    }

    #[test]
    fn minify_is_idempotent() {
        let once = minified(br#"{ "a" : [ true , null ] }"#);
        assert_eq!(minified(&once), once);
    }

    #[test]
    fn minify_unclosed_string_errors() {
        let json = br#"{"a": "oops"#;
        let buf = pad_buffer(json);
        let mut out = Vec::new();
        assert_eq!(
            minify_document(&buf, json.len(), &mut out),
            Err(Error::UnclosedString)
        );
    }

    // --- streaming boundary ---

    fn boundary(json: &[u8]) -> usize {
        let buf = pad_buffer(json);
        let mut idx = Vec::new();
        index_document(&buf, json.len(), &mut idx).unwrap();
        last_document_boundary(&buf, json.len(), &idx)
    }

    #[test]
    fn boundary_after_last_complete_container() {
        assert_eq!(boundary(br#"{"a":1} {"b":2}"#), 15);
        assert_eq!(boundary(br#"{"a":1} {"b""#), 7);
    }

    #[test]
    fn boundary_with_scalar_documents() {
        assert_eq!(boundary(b"1 2 3"), 5);
        assert_eq!(boundary(b"[1] 42"), 6);
    }

    #[test]
    fn boundary_empty_input() {
        assert_eq!(boundary(b"   "), 0);
    }
}
