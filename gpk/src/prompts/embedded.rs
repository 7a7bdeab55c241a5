//! Embedded prompt frame
//!
//! Compiled into the binary from the .pmt file at build time.

/// Frame wrapped around every category prompt
pub const FRAME: &str = include_str!("../../prompts/frame.pmt");

/// Fixed first line of every prompt
pub const PREAMBLE: &str =
    "You help gamers by analyzing screenshots and returning concise, verified, game-specific answers.";
