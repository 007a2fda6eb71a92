//! Padded input buffers.
//!
//! Every parse entry point takes `(buf, json_len)` where `buf` extends at
//! least [`PADDING`] readable bytes past `json_len`. The block loops in
//! stage 1 and the word loops in the scalar kernels rely on this to load
//! past the last byte without bounds branches. The padding bytes are never
//! interpreted: the final partial block is re-read through a space-padded
//! local copy, and root scalars are parsed from a padded scratch buffer.
//!
//! This module supplies the convenience layer: an owning [`PaddedBytes`],
//! a `pad_buffer` copy helper, and file loaders (mmap-backed where the OS
//! page tail provides the padding for free).

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::Path;

/// Number of readable bytes callers must guarantee past `json_len`.
///
/// Equal to the widest block the scanner loads (64 bytes). Published and
/// stable.
pub const PADDING: usize = 64;

/// An owned byte buffer with a zero-filled [`PADDING`]-byte tail.
///
/// `Deref`s to the *padded* slice; `json_len()` is the logical document
/// length. This is the easiest way to satisfy the input contract when the
/// data does not already live in a padded allocation.
#[derive(Debug, Clone)]
pub struct PaddedBytes {
    buf: Vec<u8>,
    json_len: usize,
}

impl PaddedBytes {
    /// Copy `data` into a fresh buffer with a zeroed padding tail.
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(data.len() + PADDING);
        buf.extend_from_slice(data);
        buf.resize(data.len() + PADDING, 0);
        Self {
            buf,
            json_len: data.len(),
        }
    }

    /// Take ownership of `data`, extending it with a zeroed padding tail.
    pub fn from_vec(mut data: Vec<u8>) -> Self {
        let json_len = data.len();
        data.resize(json_len + PADDING, 0);
        Self {
            buf: data,
            json_len,
        }
    }

    /// Logical length of the document (excluding padding).
    pub fn json_len(&self) -> usize {
        self.json_len
    }
}

impl Deref for PaddedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl From<&[u8]> for PaddedBytes {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl From<&str> for PaddedBytes {
    fn from(data: &str) -> Self {
        Self::from_slice(data.as_bytes())
    }
}

impl From<Vec<u8>> for PaddedBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

/// Create a padded copy of an in-memory slice.
///
/// The returned `Vec` is `data.len() + PADDING` bytes; the tail is zeroed.
pub fn pad_buffer(data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(data.len() + PADDING);
    buf.extend_from_slice(data);
    buf.resize(data.len() + PADDING, 0);
    buf
}

/// Read a file into a Vec with [`PADDING`] extra zeroed bytes at the end.
pub fn read_padded(path: &Path) -> io::Result<Vec<u8>> {
    let data = fs::read(path)?;
    let mut buf = Vec::with_capacity(data.len() + PADDING);
    buf.extend_from_slice(&data);
    buf.resize(data.len() + PADDING, 0);
    Ok(buf)
}

// ---------------------------------------------------------------------------
// PaddedFile: zero-copy file loading
// ---------------------------------------------------------------------------

/// A read-only, page-aligned mapping of an entire file. Unmapped on drop.
///
/// The mapping always covers whole pages. Bytes between the end of the
/// file and the end of the last page read as zero, which is what makes
/// mapped loading attractive here: when that zero tail is at least
/// [`PADDING`] wide, the input contract is satisfied without copying
/// anything.
#[cfg(unix)]
struct Mapping {
    base: *mut libc::c_void,
    len: usize,
}

// SAFETY: the pages are mapped PROT_READ and MAP_PRIVATE; nothing ever
// writes through `base`, so the mapping may be read from any thread.
#[cfg(unix)]
unsafe impl Send for Mapping {}
#[cfg(unix)]
unsafe impl Sync for Mapping {}

#[cfg(unix)]
impl Mapping {
    /// Map `path` if the page tail past `file_len` is wide enough to
    /// stand in for the padding. Returns `None` when it is not, or when
    /// any step fails; the caller falls back to an owned read, which will
    /// also surface whatever I/O error stopped us here.
    fn open(path: &Path, file_len: usize) -> Option<Self> {
        use std::os::unix::io::AsRawFd;

        let page = usize::try_from(unsafe { libc::sysconf(libc::_SC_PAGESIZE) }).ok()?;
        let len = file_len.checked_next_multiple_of(page)?;
        if file_len == 0 || len - file_len < PADDING {
            return None;
        }

        let file = fs::File::open(path).ok()?;
        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return None;
        }
        // The parser walks the buffer front to back exactly once.
        unsafe { libc::madvise(base, len, libc::MADV_SEQUENTIAL) };
        Some(Self { base, len })
    }

    fn bytes(&self) -> &[u8] {
        // SAFETY: `base` points at `len` mapped readable bytes for as
        // long as this value lives.
        unsafe { std::slice::from_raw_parts(self.base.cast::<u8>(), self.len) }
    }
}

#[cfg(unix)]
impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe { libc::munmap(self.base, self.len) };
    }
}

/// A file loaded with the required padding, either as a page mapping
/// (when the page tail covers the padding) or as an owned buffer with a
/// zeroed tail appended.
pub struct PaddedFile {
    #[cfg(unix)]
    mapping: Option<Mapping>,
    heap: Vec<u8>,
    json_len: usize,
}

impl PaddedFile {
    /// Logical length of the file content (excluding padding).
    pub fn json_len(&self) -> usize {
        self.json_len
    }
}

impl Deref for PaddedFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        #[cfg(unix)]
        if let Some(mapping) = &self.mapping {
            return mapping.bytes();
        }
        &self.heap
    }
}

/// Read a file into a padded buffer suitable for parsing.
///
/// Maps the file when the kernel's page-tail zeroes can serve as the
/// padding; otherwise (tiny files, file length within [`PADDING`] bytes
/// of a page boundary, `GJ_NO_MMAP` set for benchmarking, or any mmap
/// failure) reads it into an owned buffer and appends the tail.
///
/// Returns `(buffer, json_len)` where `buffer[..json_len]` is the file
/// content and `buffer[json_len..json_len + PADDING]` is guaranteed zeroed.
pub fn read_padded_file(path: &Path) -> io::Result<(PaddedFile, usize)> {
    #[cfg(unix)]
    if std::env::var_os("GJ_NO_MMAP").is_none() {
        let file_len = fs::metadata(path)?.len() as usize;
        if let Some(mapping) = Mapping::open(path, file_len) {
            let pf = PaddedFile {
                mapping: Some(mapping),
                heap: Vec::new(),
                json_len: file_len,
            };
            return Ok((pf, file_len));
        }
    }

    let mut heap = fs::read(path)?;
    let json_len = heap.len();
    heap.resize(json_len + PADDING, 0);
    Ok((
        PaddedFile {
            #[cfg(unix)]
            mapping: None,
            heap,
            json_len,
        },
        json_len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_buffer_zeroes_tail() {
        let json = br#"{"a":1}"#;
        let buf = pad_buffer(json);
        assert_eq!(buf.len(), json.len() + PADDING);
        assert_eq!(&buf[..json.len()], json);
        assert!(buf[json.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn padded_bytes_from_slice() {
        let pb = PaddedBytes::from_slice(b"[1,2,3]");
        assert_eq!(pb.json_len(), 7);
        assert_eq!(&pb[..7], b"[1,2,3]");
        assert!(pb.len() >= 7 + PADDING);
        assert!(pb[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn padded_bytes_from_vec_reuses_allocation() {
        let v = b"null".to_vec();
        let pb = PaddedBytes::from_vec(v);
        assert_eq!(pb.json_len(), 4);
        assert_eq!(&pb[..4], b"null");
    }

    #[test]
    fn padded_bytes_empty() {
        let pb = PaddedBytes::from_slice(b"");
        assert_eq!(pb.json_len(), 0);
        assert_eq!(pb.len(), PADDING);
    }

    #[test]
    fn read_padded_file_roundtrip() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let json = br#"{"mmap": true, "value": 42}"#;
        use std::io::Write;
        tmp.write_all(json).unwrap();
        tmp.flush().unwrap();

        let (pf, json_len) = read_padded_file(tmp.path()).unwrap();
        assert_eq!(json_len, json.len());
        assert_eq!(&pf[..json_len], json);
        // Verify padding is zeroed
        assert!(pf.len() >= json_len + PADDING);
        assert!(pf[json_len..json_len + PADDING].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_padded_file_empty() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let (pf, json_len) = read_padded_file(tmp.path()).unwrap();
        assert_eq!(json_len, 0);
        assert!(pf.len() >= PADDING);
    }

    #[test]
    fn padded_file_deref_slice() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        tmp.write_all(b"test data").unwrap();
        tmp.flush().unwrap();

        let (pf, json_len) = read_padded_file(tmp.path()).unwrap();
        let slice: &[u8] = &pf;
        assert_eq!(&slice[..json_len], b"test data");
    }
}
