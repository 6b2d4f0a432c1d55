//! Inference over reconciled tables.

mod pipeline;

pub use pipeline::infer;
