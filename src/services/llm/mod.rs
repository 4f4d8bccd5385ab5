//! Types shared with the LLM chat loop.
//!
//! The chat loop itself lives outside this crate; it consumes the tool
//! definitions exposed here and hands back `ToolCall` values for execution.

pub mod types;
