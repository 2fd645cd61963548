//! Request-level tag suggestion: references in, ordered suggestions out.

pub mod assembler;
pub mod pipeline;

pub use assembler::{assemble, Suggestion};
pub use pipeline::SuggestionPipeline;
