//! Parley streams chat completions from an OpenAI-compatible backend into a
//! live transcript.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the transcript model, the streaming ingestion pipeline
//!   ([`core::stream`]), configuration, and credential lookup.
//! - [`api`] defines the wire payloads, the HTTP transport, and the model
//!   catalog client.
//! - [`cli`] parses arguments and drives one-shot prompts from the terminal.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
