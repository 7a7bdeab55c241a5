//! Prompt templates
//!
//! Category prompts are wrapped in an embedded handlebars frame (`prompts/frame.pmt`)
//! that adds the preamble, the Game/Category header and an optional OCR excerpt.
//! Secondary queries are filled from the headings of an AI response, with a
//! generic synthesized query as the caller's fallback.

pub mod embedded;
mod fallback;
mod render;
mod secondary;

pub use fallback::synthesize_fallback_query;
pub use render::{TemplateEngine, map_legacy_category};
pub use secondary::{SecondaryQueryError, extract_token_value, render_secondary_query};
