//! Error taxonomy shared by every layer of the parser.
//!
//! The enum is flat: one variant per failure class, each with a stable
//! integer tag (`code()`) so FFI callers and logs can match on a number
//! that never changes between releases. Parsing errors are fatal for the
//! current document; consumer errors (`IncorrectType`, `NoSuchField`, ...)
//! apply to a single accessor call only.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way a parse or an accessor can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The document is larger than the parser's configured capacity.
    #[error("document exceeds the parser's configured capacity")]
    Capacity,
    /// An internal buffer could not be allocated.
    #[error("memory allocation failed while growing a parser buffer")]
    MemAlloc,
    /// The input is not valid UTF-8.
    #[error("input is not valid UTF-8")]
    Utf8Error,
    /// A string literal was opened but never closed.
    #[error("string literal opened with '\"' but never closed")]
    UnclosedString,
    /// A grammar violation not covered by a more specific error.
    #[error("the JSON document has an improper structure")]
    TapeError,
    /// Container nesting exceeded the configured maximum depth.
    #[error("nesting depth exceeds the configured maximum")]
    DepthError,
    /// Bad escape sequence, invalid surrogate pair, or an unescaped
    /// control character inside a string literal.
    #[error("problem while parsing a string literal")]
    StringError,
    /// A number token violates the RFC 8259 number grammar.
    #[error("problem while parsing a number")]
    NumberError,
    /// A token starting with 't' is not exactly `true`.
    #[error("'true' atom is malformed")]
    TAtomError,
    /// A token starting with 'f' is not exactly `false`.
    #[error("'false' atom is malformed")]
    FAtomError,
    /// A token starting with 'n' is not exactly `null`.
    #[error("'null' atom is malformed")]
    NAtomError,
    /// The input is empty or contains only whitespace.
    #[error("input is empty or contains only whitespace")]
    Empty,
    /// An accessor was called on a value of a different JSON type.
    #[error("accessor called on a JSON value of the wrong type")]
    IncorrectType,
    /// A strict integer accessor was called on a number that does not
    /// fit the requested width.
    #[error("number does not fit in the requested integer width")]
    NumberOutOfRange,
    /// An object field lookup found no matching key.
    #[error("no field with the requested key in this object")]
    NoSuchField,
    /// An array index is past the end of the array.
    #[error("array index is out of bounds")]
    IndexOutOfBounds,
    /// Non-whitespace bytes follow the root value.
    #[error("non-whitespace content after the end of the document")]
    TrailingContent,
}

impl Error {
    /// Stable integer tag for this error. Tags are append-only and never
    /// renumbered.
    pub fn code(self) -> u32 {
        match self {
            Error::Capacity => 1,
            Error::MemAlloc => 2,
            Error::Utf8Error => 3,
            Error::UnclosedString => 4,
            Error::TapeError => 5,
            Error::DepthError => 6,
            Error::StringError => 7,
            Error::NumberError => 8,
            Error::TAtomError => 9,
            Error::FAtomError => 10,
            Error::NAtomError => 11,
            Error::Empty => 12,
            Error::IncorrectType => 13,
            Error::NumberOutOfRange => 14,
            Error::NoSuchField => 15,
            Error::IndexOutOfBounds => 16,
            Error::TrailingContent => 17,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique() {
        let all = [
            Error::Capacity,
            Error::MemAlloc,
            Error::Utf8Error,
            Error::UnclosedString,
            Error::TapeError,
            Error::DepthError,
            Error::StringError,
            Error::NumberError,
            Error::TAtomError,
            Error::FAtomError,
            Error::NAtomError,
            Error::Empty,
            Error::IncorrectType,
            Error::NumberOutOfRange,
            Error::NoSuchField,
            Error::IndexOutOfBounds,
            Error::TrailingContent,
        ];
        let mut codes: Vec<u32> = all.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn messages_are_human_readable() {
        assert!(Error::TapeError.to_string().contains("structure"));
        assert!(Error::Utf8Error.to_string().contains("UTF-8"));
        assert!(!Error::NoSuchField.to_string().is_empty());
    }
}
