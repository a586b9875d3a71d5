#![deny(missing_docs)]
//! guMCP agent library.
//!
//! Agent graph with guMCP documentation context, E2B sandboxed Python
//! execution and the guMCP documentation generator.

/// Agent graph, state and tools.
pub mod agent;
/// Configuration management.
pub mod config;
/// guMCP documentation generator.
pub mod docs;
/// LLM providers and client.
pub mod llm;
/// Log setup with secret redaction.
pub mod logging;
/// Remote sandboxing for code execution.
pub mod sandbox;
