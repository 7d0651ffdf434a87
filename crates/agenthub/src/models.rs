//! These models represent the objects passed around by the hub
//!
//! There are several different related formats we need to interact with:
//! - ask requests, sent from the UI to the hub and forwarded to agents
//! - agent replies, returned by each specialist agent
//! - openai-compatible chat messages, sent from the hub to the language model
//! - parsed documents, produced by the ingestion pipeline
//!
//! We always immediately convert wire data into the internal structs. Optional fields on the
//! wire stay `Option` here, and variants that the wire distinguishes by "which field is set"
//! are proper enums.
pub mod agent;
pub mod content;
pub mod document;
pub mod message;
pub mod reply;
pub mod request;
pub mod response;
pub mod role;
