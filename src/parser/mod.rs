//! Pattern matching module for extracting content from raw HTML
//!
//! This module contains:
//! - `ParserDescriptor`: an immutable name + regex + transform + filter value
//! - Standard descriptors for sentence text and link discovery
//! - HTML transforms applied before matching

mod descriptor;
mod standard;
mod transform;

pub use descriptor::{Filter, ParserDescriptor, Transform};
pub use standard::{StandardParser, DEFAULT_LINK_PATTERN, DEFAULT_TEXT_PATTERN};
pub use transform::{strip_tags, visible_text, TransformKind};
