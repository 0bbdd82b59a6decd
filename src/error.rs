//! The closed error taxonomy for the pipeline.
//!
//! Every stage fails fast: a `GrimoireError` produced by one stage is never
//! swallowed or retried by a later one. Construction helpers are provided
//! per variant so call sites stay short.

use std::fmt;
use std::path::PathBuf;

/// Pixel-space location attached to geometry errors, plus the source path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub path: Option<PathBuf>,
    pub pixel: Option<(u32, u32)>,
}

impl Location {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), pixel: None }
    }

    pub fn pixel(path: impl Into<PathBuf>, x: u32, y: u32) -> Self {
        Self { path: Some(path.into()), pixel: Some((x, y)) }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.pixel) {
            (Some(p), Some((x, y))) => write!(f, "{} @ ({x}, {y})", p.display()),
            (Some(p), None) => write!(f, "{}", p.display()),
            (None, _) => write!(f, "<in-memory>"),
        }
    }
}

/// The closed set of error kinds the pipeline and its CLI collaborator can
/// raise. One variant per row of the spec's error table.
#[derive(Debug, thiserror::Error)]
pub enum GrimoireError {
    #[error("file not found: {location}")]
    FileNotFound { location: Location },

    #[error("unsupported format at {location}: {reason}")]
    UnsupportedFormat { location: Location, reason: String },

    #[error("image processing failed at {location}: {reason}")]
    ImageProcessingError {
        location: Location,
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("no symbols detected in {location}")]
    NoSymbolsDetected { location: Location },

    #[error("no outer circle found in {location}")]
    NoOuterCircle { location: Location },

    #[error("symbol at {location} resists classification: {reason}")]
    InvalidSymbolShape { location: Location, reason: String },

    #[error("syntax error at {location}: {reason}")]
    SyntaxError { location: Location, reason: String },

    #[error("unexpected unknown symbol reachable from main at {location}")]
    UnexpectedSymbol { location: Location },

    #[error("no DoubleCircle symbol found in {location}; missing main entry")]
    MissingMainEntry { location: Location },

    #[error("connection at {location} references a nonexistent symbol: {reason}")]
    InvalidConnection { location: Location, reason: String },

    #[error("code generation failed: {reason}")]
    CompilationError { reason: String },

    #[error("target runtime execution failed: {reason}")]
    ExecutionError {
        reason: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("could not write output to {location}")]
    FileWriteError {
        location: Location,
        #[source]
        cause: std::io::Error,
    },
}

impl GrimoireError {
    /// The stable machine-readable code used for the CLI's `ERROR: <kind>`
    /// prefix. Kept separate from `Display` so the human message can be
    /// richer without breaking the stable prefix contract.
    pub fn kind(&self) -> &'static str {
        match self {
            GrimoireError::FileNotFound { .. } => "FileNotFound",
            GrimoireError::UnsupportedFormat { .. } => "UnsupportedFormat",
            GrimoireError::ImageProcessingError { .. } => "ImageProcessingError",
            GrimoireError::NoSymbolsDetected { .. } => "NoSymbolsDetected",
            GrimoireError::NoOuterCircle { .. } => "NoOuterCircle",
            GrimoireError::InvalidSymbolShape { .. } => "InvalidSymbolShape",
            GrimoireError::SyntaxError { .. } => "SyntaxError",
            GrimoireError::UnexpectedSymbol { .. } => "UnexpectedSymbol",
            GrimoireError::MissingMainEntry { .. } => "MissingMainEntry",
            GrimoireError::InvalidConnection { .. } => "InvalidConnection",
            GrimoireError::CompilationError { .. } => "CompilationError",
            GrimoireError::ExecutionError { .. } => "ExecutionError",
            GrimoireError::FileWriteError { .. } => "FileWriteError",
        }
    }

    /// A localisable suggestion string. Only the `en` catalogue is
    /// implemented (see SPEC_FULL.md §6.2); this returns the English text
    /// regardless of the selected locale and callers fall back via
    /// `config::Locale`.
    pub fn suggestion(&self) -> &'static str {
        match self {
            GrimoireError::FileNotFound { .. } => "check that the image path is correct",
            GrimoireError::UnsupportedFormat { .. } => {
                "use a PNG, JPEG, GIF, or WebP file whose extension matches its contents"
            }
            GrimoireError::ImageProcessingError { .. } => "verify the file is not corrupted",
            GrimoireError::NoSymbolsDetected { .. } => {
                "increase ink contrast or check the image is not blank"
            }
            GrimoireError::NoOuterCircle { .. } => {
                "draw a single enclosing circle around the whole diagram"
            }
            GrimoireError::InvalidSymbolShape { .. } => {
                "redraw the shape with clearer, closed strokes"
            }
            GrimoireError::SyntaxError { .. } => "check the diagram's connection topology",
            GrimoireError::UnexpectedSymbol { .. } => {
                "replace the unrecognised shape with a known symbol"
            }
            GrimoireError::MissingMainEntry { .. } => {
                "draw exactly one double circle as the program's entry point"
            }
            GrimoireError::InvalidConnection { .. } => "remove the dangling connection line",
            GrimoireError::CompilationError { .. } => "ensure the diagram has a main entry",
            GrimoireError::ExecutionError { .. } => "check that the target runtime is installed",
            GrimoireError::FileWriteError { .. } => "check the output path is writable",
        }
    }
}

pub type Result<T> = std::result::Result<T, GrimoireError>;
