//! Shared types for ThreadChat: messages, tool calls, configuration,
//! the common error type, and structured trace events.

pub mod config;
pub mod error;
pub mod tool;
pub mod trace;
