//! Completion-client abstraction for finsight
//!
//! This crate defines the seam between the analysis engine and whatever LLM
//! service ultimately serves it. The engine consumes full-text responses only:
//! one system prompt, one user prompt, one model id in, one text reply out.
//! Streaming, tool use and conversation history are concerns of the transport
//! implementation, not of this contract.

pub mod client;
pub mod error;

pub use client::{CompletionClient, CompletionOptions, CompletionOptionsBuilder};
pub use error::{LlmError, Result};
