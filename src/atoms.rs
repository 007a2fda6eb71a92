//! Matchers for the three literal atoms: `true`, `false`, `null`.
//!
//! Each atom is matched with one word compare against the source bytes
//! followed by a terminator check: the byte after the atom must be a
//! structural character, whitespace, or the zero byte used to pad the
//! root-scalar scratch buffer. Callers guarantee the reads stay within
//! the padded buffer.

/// Bytes that may legally terminate an atom or a number: the six
/// operators, JSON whitespace, and NUL (scratch padding).
static STRUCTURAL_OR_WHITESPACE: [bool; 256] = {
    let mut t = [false; 256];
    t[b'{' as usize] = true;
    t[b'}' as usize] = true;
    t[b'[' as usize] = true;
    t[b']' as usize] = true;
    t[b':' as usize] = true;
    t[b',' as usize] = true;
    t[b' ' as usize] = true;
    t[b'\t' as usize] = true;
    t[b'\n' as usize] = true;
    t[b'\r' as usize] = true;
    t[0] = true;
    t
};

#[inline]
pub(crate) fn is_structural_or_whitespace(b: u8) -> bool {
    STRUCTURAL_OR_WHITESPACE[b as usize]
}

#[inline]
fn word4(src: &[u8]) -> u32 {
    u32::from_le_bytes(src[..4].try_into().unwrap())
}

/// `src` points at a 't'; true iff the next bytes spell `true` followed by
/// a terminator.
#[inline]
pub(crate) fn is_valid_true_atom(src: &[u8]) -> bool {
    src.len() >= 5
        && word4(src) == u32::from_le_bytes(*b"true")
        && is_structural_or_whitespace(src[4])
}

/// `src` points at an 'f'; true iff the next bytes spell `false` followed
/// by a terminator.
#[inline]
pub(crate) fn is_valid_false_atom(src: &[u8]) -> bool {
    src.len() >= 6
        && word4(&src[1..]) == u32::from_le_bytes(*b"alse")
        && is_structural_or_whitespace(src[5])
}

/// `src` points at an 'n'; true iff the next bytes spell `null` followed
/// by a terminator.
#[inline]
pub(crate) fn is_valid_null_atom(src: &[u8]) -> bool {
    src.len() >= 5
        && word4(src) == u32::from_le_bytes(*b"null")
        && is_structural_or_whitespace(src[4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn true_atom() {
        assert!(is_valid_true_atom(b"true,"));
        assert!(is_valid_true_atom(b"true]"));
        assert!(is_valid_true_atom(b"true\0extra"));
        assert!(!is_valid_true_atom(b"truex"));
        assert!(!is_valid_true_atom(b"tru, "));
        assert!(!is_valid_true_atom(b"True,"));
    }

    #[test]
    fn false_atom() {
        assert!(is_valid_false_atom(b"false}"));
        assert!(is_valid_false_atom(b"false "));
        assert!(!is_valid_false_atom(b"falsey"));
        assert!(!is_valid_false_atom(b"fals, "));
    }

    #[test]
    fn null_atom() {
        assert!(is_valid_null_atom(b"null,"));
        assert!(is_valid_null_atom(b"null\n"));
        assert!(!is_valid_null_atom(b"nul,!"));
        assert!(!is_valid_null_atom(b"nullx"));
    }

    #[test]
    fn terminator_table() {
        for b in [b'{', b'}', b'[', b']', b':', b',', b' ', b'\t', b'\n', b'\r', 0u8] {
            assert!(is_structural_or_whitespace(b));
        }
        for b in [b'a', b'0', b'"', b'-', 0xFF] {
            assert!(!is_structural_or_whitespace(b));
        }
    }
}
