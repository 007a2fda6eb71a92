//! Parallel NDJSON (newline-delimited JSON) processing.
//!
//! Splits NDJSON input into ~1MB chunks at newline boundaries, parses the
//! chunks in parallel via rayon, and returns the per-line results in input
//! order. Every worker uses its own parser context; contexts share
//! nothing.

use memchr::memchr_iter;
use rayon::prelude::*;

use crate::dom::{Document, Parser};
use crate::error::Result;
use crate::padded::pad_buffer;

/// Target size for parallel chunks.
const CHUNK_TARGET_SIZE: usize = 1024 * 1024;

/// Cut `buf` into pieces of roughly `target_size` bytes, each ending on
/// a newline so no line is ever split between workers. The final piece
/// takes whatever remains.
pub fn split_chunks(buf: &[u8], target_size: usize) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while buf.len() - start > target_size {
        let probe = start + target_size;
        let Some(nl) = memchr::memchr(b'\n', &buf[probe..]) else {
            break;
        };
        chunks.push(&buf[start..=probe + nl]);
        start = probe + nl + 1;
    }
    if start < buf.len() {
        chunks.push(&buf[start..]);
    }
    chunks
}

/// Parse every non-empty NDJSON line and map `f` over the documents,
/// returning results in input order.
///
/// Parallelizes across cores for data larger than one chunk; the closure
/// runs on worker threads, each with a thread-local parser context. The
/// first parse error aborts the whole run.
pub fn process_ndjson<R, F>(data: &[u8], f: F) -> Result<Vec<R>>
where
    F: Fn(Document<'_>) -> R + Sync,
    R: Send,
{
    let chunks = split_chunks(data, CHUNK_TARGET_SIZE);
    if chunks.len() <= 1 {
        return process_chunk(data, &f);
    }

    let results: Result<Vec<Vec<R>>> = chunks
        .par_iter()
        .map(|&chunk| process_chunk(chunk, &f))
        .collect();
    let results = results?;

    let total: usize = results.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for r in results {
        out.extend(r);
    }
    Ok(out)
}

/// Process a single chunk of NDJSON lines sequentially with one parser.
fn process_chunk<R, F>(chunk: &[u8], f: &F) -> Result<Vec<R>>
where
    F: Fn(Document<'_>) -> R,
{
    let mut parser = Parser::new();
    let mut out = Vec::new();

    let mut start = 0;
    for nl_pos in memchr_iter(b'\n', chunk) {
        process_line(&chunk[start..nl_pos], &mut parser, f, &mut out)?;
        start = nl_pos + 1;
    }
    // Handle last line without trailing newline
    if start < chunk.len() {
        process_line(&chunk[start..], &mut parser, f, &mut out)?;
    }

    Ok(out)
}

/// Parse one NDJSON line (if non-blank) and apply `f`.
fn process_line<R, F>(line: &[u8], parser: &mut Parser, f: &F, out: &mut Vec<R>) -> Result<()>
where
    F: Fn(Document<'_>) -> R,
{
    // Trim trailing whitespace
    let end = line
        .iter()
        .rposition(|&b| !matches!(b, b' ' | b'\t' | b'\r'))
        .map_or(0, |p| p + 1);
    let trimmed = &line[..end];

    if trimmed.is_empty() {
        return Ok(());
    }

    let padded = pad_buffer(trimmed);
    let doc = parser.parse(&padded, trimmed.len())?;
    out.push(f(doc));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_chunks_basic() {
        let data = b"line1\nline2\nline3\n";
        let chunks = split_chunks(data, 6);
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        assert_eq!(total, data.len());
        // All chunks except possibly the last end with newline
        for (i, chunk) in chunks.iter().enumerate() {
            if i < chunks.len() - 1 {
                assert!(chunk.ends_with(b"\n"));
            }
        }
    }

    #[test]
    fn split_chunks_single() {
        let data = b"line1\n";
        let chunks = split_chunks(data, 1024 * 1024);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], data);
    }

    #[test]
    fn split_chunks_empty() {
        assert!(split_chunks(b"", 1024).is_empty());
    }

    #[test]
    fn process_ndjson_basic() {
        let data = b"{\"name\":\"alice\"}\n{\"name\":\"bob\"}\n";
        let names = process_ndjson(data, |doc| {
            doc.root()
                .at_key("name")
                .and_then(|e| e.get_str().map(str::to_owned))
                .unwrap_or_default()
        })
        .unwrap();
        assert_eq!(names, vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn process_ndjson_skips_blank_lines() {
        let data = b"1\n\n2\n  \n3\n";
        let values = process_ndjson(data, |doc| doc.root().get_i64().unwrap()).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn process_ndjson_no_trailing_newline() {
        let data = b"{\"a\":1}\n{\"a\":2}";
        let count = process_ndjson(data, |_| ()).unwrap().len();
        assert_eq!(count, 2);
    }

    #[test]
    fn process_ndjson_propagates_errors() {
        let data = b"{\"a\":1}\nnot json\n";
        assert!(process_ndjson(data, |_| ()).is_err());
    }

    #[test]
    fn process_ndjson_empty_input() {
        assert_eq!(process_ndjson(b"", |_| ()).unwrap().len(), 0);
    }

    #[test]
    fn results_stay_in_input_order_across_chunks() {
        // Enough lines to exercise ordering even with small chunks.
        let mut data = Vec::new();
        for i in 0..500 {
            data.extend_from_slice(format!("{i}\n").as_bytes());
        }
        let values = process_ndjson(&data, |doc| doc.root().get_i64().unwrap()).unwrap();
        let expected: Vec<i64> = (0..500).collect();
        assert_eq!(values, expected);
    }
}
