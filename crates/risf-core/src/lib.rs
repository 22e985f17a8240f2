#![forbid(unsafe_code)]

//! risf contract crate.
//!
//! This crate is **contract-only**: no GL handles, no windowing, no render
//! state. It defines the ISF source-file model — the `/* … */` header
//! directive split, the parsed header document (inputs, persistent buffers,
//! passes), and the engine-wide error type re-exported by the runtime.
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]

pub mod directive;
pub mod error;
pub mod header;

pub use directive::{split_directive, SplitSource};
pub use error::EngineError;
pub use header::{BufferDecl, Header, InputDecl, InputKind, LongEntry, PassDecl};
