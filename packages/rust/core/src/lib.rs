//! Conversion pipeline for feedscribe.
//!
//! Ties the feed parser and the Markdown renderer together with field
//! normalization, document assembly and file output.

pub mod assembler;
pub mod normalize;
pub mod pipeline;
pub mod writer;

pub use pipeline::{
    ConvertConfig, ConvertSummary, ItemOutcome, NamingOptions, ProgressReporter, SilentProgress,
    convert_feed, convert_feed_with, convert_item, convert_items,
};
