//! # srcmd Core
//!
//! Text-protocol layer for Markdown notebooks and streamed LLM markup.
//!
//! Two engines live here:
//!
//! - The **srcmd codec** decodes a Markdown notebook into typed [`Cell`]s and
//!   encodes cells back into Markdown that round-trips byte for byte.
//! - The **incremental tag parser** rebuilds nested, attributed tags from
//!   arbitrarily split chunks of model output and reports each tag as soon
//!   as it closes.
//!
//! ## Quick Start
//!
//! ```rust
//! use srcmd_core::{decode, encode, EncodeOptions};
//!
//! let text = "<!-- srcbook:{\"language\":\"javascript\"} -->\n\n# Hello\n\n\
//!             <details>\n  <summary>package.json</summary>\n\n```json\n{}\n```\n</details>\n";
//! let decoded = decode(text).unwrap();
//! let encoded = encode(&decoded.cells, &decoded.metadata, EncodeOptions::inline()).unwrap();
//! assert_eq!(encoded, text);
//! ```
//!
//! ## Errors
//!
//! Decoding reports every grammar violation at once:
//!
//! ```rust
//! let errors = srcmd_core::decode("## Not a title\n").unwrap_err();
//! assert_eq!(
//!     errors.messages(),
//!     [
//!         "Document must contain exactly one h1 heading",
//!         "Document must contain exactly one package.json",
//!     ]
//! );
//! ```

pub mod cell;
pub mod codec;
pub mod convert;
pub mod dir;
pub mod encode;
pub mod error;
pub mod group;
pub mod id;
pub mod lexer;
pub mod plan;
pub mod span;
pub mod tags;
pub mod validate;

pub use cell::{Cell, CellKind, CellStatus, CodeLanguage, SrcbookMetadata};
pub use codec::{decode, decode_fragment, Decoded, Fragment};
pub use convert::ExternalSource;
pub use dir::{read_dir, write_dir, FileSystem, OsFileSystem};
pub use encode::{encode, EncodeOptions};
pub use error::{
    DecodeError, DecodeErrors, DirError, EncodeError, ErrorList, PlanError, TagError, TagErrors,
};
pub use plan::{parse_plan, parse_project, Plan, PlanAction, PlanChunk, PlanParser};
pub use tags::{Tag, TagParser, TagSink};
