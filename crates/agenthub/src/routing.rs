//! Deciding which agents should answer a prompt.
//!
//! The model-driven [`classifier`] runs first; [`keywords`] then adds any agent whose routing
//! hint appears in the prompt. Keyword matching only ever adds to the selection.

pub mod classifier;
pub mod keywords;

pub use classifier::{parse_alias_list, Classifier, ParsedAliases};
pub use keywords::{match_keywords, merge_selection};
