//! Protocol layer for the chat server
//!
//! This module provides:
//! - Streaming line decoding over raw socket bytes
//! - Rendering of every server-to-client wire line

pub mod line;
pub mod messages;

// Re-export commonly used types
pub use line::{DEFAULT_MAX_LINE_LEN, LineCodec};
pub use messages::*;
