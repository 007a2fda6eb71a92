//! The eager DOM API: parse once, then navigate a flat tape with
//! random access.
//!
//! ```no_run
//! use gj::padded::PaddedBytes;
//!
//! let input = PaddedBytes::from(r#"{"name":"alice","scores":[10,20]}"#);
//! let mut parser = gj::dom::Parser::new();
//! let doc = parser.parse(&input, input.json_len())?;
//! let name = doc.root().at_key("name")?.get_str()?;
//! assert_eq!(name, "alice");
//! # Ok::<(), gj::Error>(())
//! ```

mod parser;
mod serialize;
mod tape;

pub use parser::{DEFAULT_MAX_CAPACITY, DEFAULT_MAX_DEPTH, Parser};
pub use serialize::{to_minified_string, to_minified_vec};
pub use tape::{ArrayIter, Document, DomArray, DomObject, Element, JsonType, ObjectIter};
