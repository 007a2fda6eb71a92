//! The on-demand API: walk the document lazily, parsing only the values
//! the caller touches. Stage 2 never runs and no tape is built.
//!
//! ```no_run
//! use gj::padded::PaddedBytes;
//!
//! let input = PaddedBytes::from(r#"{"user":{"id":7,"name":"ada"}}"#);
//! let mut parser = gj::ondemand::Parser::new();
//! let mut doc = parser.iterate(&input, input.json_len())?;
//! let mut root = doc.get_object()?;
//! let mut user = root.find_field("user")?;
//! let mut user = user.get_object()?;
//! let id = user.find_field("id")?.get_i64()?;
//! assert_eq!(id, 7);
//! # Ok::<(), gj::Error>(())
//! ```
//!
//! The cursor is strictly forward-only: fields may be looked up out of
//! source order (the lookup wraps around the object once), but containers
//! cannot be walked twice.

mod document;
mod parser;

pub use document::{Array, Document, Field, Object, Value};
pub use parser::Parser;
