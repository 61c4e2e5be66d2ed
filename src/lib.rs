//! Tempo - a minimal tool-calling agent loop
//!
//! Sends the conversation to Gemini, runs the tools the model asks for,
//! feeds the results back and stops once the model answers without
//! requesting more tools.

pub mod agent;
pub mod tools;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{Error, Result};
