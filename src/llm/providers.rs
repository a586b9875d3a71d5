//! Concrete LLM providers

mod zai;

pub use zai::ZaiProvider;
