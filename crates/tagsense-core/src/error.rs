//! Error types for tagsense.
//!
//! Errors are organized by concern so callers can decide what is fatal to a
//! single image, to a request, or to the process. Each carries enough context
//! (reference, path, shape) to be actionable on its own.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for tagsense operations.
#[derive(Error, Debug)]
pub enum TagSenseError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Image loading or normalization errors
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Model loading or inference errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Tag tree / label vocabulary errors
    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),

    /// Dataset preprocessing and training hand-off errors
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// gRPC transport errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// A suggestion request failed
    #[error("Suggest failed: {0}")]
    Suggest(#[from] SuggestError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// The HTTP client could not be built from the configured limits
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failures resolving or normalizing a single image reference.
///
/// An `ImageError` concerns exactly one image; whether it fails the whole
/// request depends on the configured invalid-image policy.
#[derive(Error, Debug)]
pub enum ImageError {
    /// Local file does not exist
    #[error("Image not found: {reference}")]
    NotFound { reference: String },

    /// Local file could not be read
    #[error("Cannot read {reference}: {message}")]
    Read { reference: String, message: String },

    /// Remote reference could not be fetched
    #[error("Cannot fetch {reference}: {message}")]
    Fetch { reference: String, message: String },

    /// Zero-byte source
    #[error("Image is empty: {reference}")]
    Empty { reference: String },

    /// Source exceeds the configured size limit
    #[error("Image too large: {reference} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        reference: String,
        size_mb: u64,
        max_mb: u64,
    },

    /// Decoded dimensions exceed the configured limit
    #[error("Image dimensions too large: {reference} ({width}x{height} > {max_dim})")]
    DimensionsTooLarge {
        reference: String,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Signature does not match a supported raster format
    #[error("Unsupported image format: {reference}")]
    UnsupportedFormat { reference: String },

    /// Verification or full decode failed
    #[error("Corrupt image {reference}: {message}")]
    Corrupt { reference: String, message: String },
}

impl ImageError {
    /// The image reference this error concerns.
    pub fn reference(&self) -> &str {
        match self {
            Self::NotFound { reference }
            | Self::Read { reference, .. }
            | Self::Fetch { reference, .. }
            | Self::Empty { reference }
            | Self::FileTooLarge { reference, .. }
            | Self::DimensionsTooLarge { reference, .. }
            | Self::UnsupportedFormat { reference }
            | Self::Corrupt { reference, .. } => reference,
        }
    }
}

/// Model artifact and inference errors.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A required artifact file is missing
    #[error("Model file not found: {0}")]
    NotFound(PathBuf),

    /// The ONNX graph could not be loaded
    #[error("Failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// `config.json` or `preprocessor_config.json` is malformed
    #[error("Invalid model config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Label vocabulary embedded in the model is malformed
    #[error("Invalid label vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),

    /// Predict called with no images
    #[error("Cannot run inference on an empty batch")]
    EmptyBatch,

    /// Tensor or output dimensions disagree
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// ONNX Runtime reported a failure during the run
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Tag tree and label id errors.
#[derive(Error, Debug)]
pub enum VocabularyError {
    /// Tag tree document could not be read
    #[error("Failed to read tag tree: {0}")]
    Io(#[from] std::io::Error),

    /// Tag tree document could not be parsed
    #[error("Failed to parse tag tree: {0}")]
    Parse(#[from] serde_json::Error),

    /// The same id appears twice in a tag tree
    #[error("Duplicate tag id {0}")]
    DuplicateId(u32),

    /// An `id2label` key is not a non-negative integer
    #[error("Invalid label id {0:?}")]
    InvalidId(String),
}

/// Dataset preprocessing, extraction and training hand-off errors.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// No `metadata.jsonl` found under the input directory
    #[error("No metadata.jsonl found in {0}")]
    MissingMetadata(PathBuf),

    /// A metadata line is not a JSON object with a `file_name`
    #[error("Invalid metadata at {path}:{line}: {message}")]
    Metadata {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// `tags.json` is required but missing
    #[error("Tag tree not found: {0}")]
    MissingTags(PathBuf),

    /// The tag tree could not be loaded
    #[error("Invalid tag tree {path}: {source}")]
    Tags {
        path: PathBuf,
        #[source]
        source: VocabularyError,
    },

    /// A metadata `tags` vector does not match the label count
    #[error("{path}: entry {file_name} has {actual} label flags, expected {expected}")]
    LabelWidth {
        path: PathBuf,
        file_name: String,
        expected: usize,
        actual: usize,
    },

    /// The external trainer failed
    #[error("Trainer failed: {0}")]
    Trainer(String),

    /// Filesystem error with path context
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Transport-level errors for the gRPC service.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured listen address is not a socket address
    #[error("Invalid listen address {addr:?}: {message}")]
    InvalidAddress { addr: String, message: String },

    /// The request pipeline could not be built
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// tonic transport failure (bind, accept, connect)
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// A client call returned a non-OK status
    #[error("Call failed: {0}")]
    Status(#[from] tonic::Status),
}

/// Why a single `Suggest` request failed.
#[derive(Error, Debug)]
pub enum SuggestError {
    /// An image in the request could not be normalized
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The model batch could not be evaluated
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The worker queue is full
    #[error("Server busy: request queue is full ({capacity} pending)")]
    Saturated { capacity: usize },

    /// The worker handling the request went away before replying
    #[error("Worker terminated before completing the request: {0}")]
    WorkerLost(String),
}

/// Convenience type alias for tagsense results.
pub type Result<T> = std::result::Result<T, TagSenseError>;
