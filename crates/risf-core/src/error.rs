use std::path::PathBuf;

use thiserror::Error;

use crate::header::InputKind;

/// Engine-level errors used across risf crates.
///
/// Contract rule: this type lives in `risf-core` and is re-exported by the
/// runtime. Nothing here is ever allowed to propagate as a panic across the
/// render loop; callers recover at the `load`/`reload`/set boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    // ---- Source / header (contract-level) ----
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid format: missing or empty header directive")]
    MalformedSource,

    #[error("header failed to parse as JSON: {0}")]
    InvalidHeaderJson(#[from] serde_json::Error),

    #[error("header is not a JSON object")]
    HeaderNotObject,

    // ---- Code generation ----
    #[error("image name mismatch: {0}")]
    UnresolvedImageMacro(String),

    // ---- Runtime-facing (backend) ----
    #[error("vertex shader compile error: {0}")]
    VertexCompile(String),

    #[error("fragment shader compile error: {0}")]
    FragmentCompile(String),

    #[error("program link error: {0}")]
    Link(String),

    #[error("backend object creation failed: {0}")]
    GlCreate(String),

    // ---- Uniform access ----
    #[error("uniform '{name}' is {actual}, not {requested}")]
    TypeMismatch {
        name: String,
        requested: InputKind,
        actual: InputKind,
    },

    #[error("uniform not found: {0}")]
    UnknownUniform(String),

    // ---- Fallback ----
    #[error("unsupported feature: {0}")]
    Unsupported(String),
}
