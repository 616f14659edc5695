use crate::parser::{strip_tags, ParserDescriptor};
use crate::ConfigError;

/// Sentence-like text: starts with a capital or digit, ends with `.`, `!` or `?`
/// that is not followed by a word character
pub const DEFAULT_TEXT_PATTERN: &str = r"([A-Z0-9][A-Za-z0-9 ,.-]+?[!.?])(?:\W|$)";

/// Quoted `href` attribute values, absolute or relative
pub const DEFAULT_LINK_PATTERN: &str = r#"href\s*=\s*["']([^"']+)["']"#;

/// Built-in descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardParser {
    /// Plain-text sentences with tags stripped
    Text,
    /// Link discovery from `href` attributes
    Links,
}

impl StandardParser {
    /// Looks up a standard parser by its configuration name
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "links" | "link" => Ok(Self::Links),
            other => Err(ConfigError::Validation(format!(
                "standard parser '{}' doesn't exist (expected 'text' or 'links')",
                other
            ))),
        }
    }

    /// Returns the default descriptor name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Links => "link",
        }
    }

    /// Builds the descriptor under its default name
    pub fn descriptor(&self) -> ParserDescriptor {
        self.named(self.name())
            .unwrap_or_else(|e| panic!("built-in pattern failed to compile: {}", e))
    }

    /// Builds the descriptor under a custom name
    ///
    /// Collectors write to a file named after the descriptor, so jobs that
    /// should not share output give their descriptors distinct names.
    pub fn named(&self, name: &str) -> Result<ParserDescriptor, ConfigError> {
        match self {
            Self::Text => Ok(ParserDescriptor::new(name, DEFAULT_TEXT_PATTERN)?
                .with_transform(strip_tags)),
            Self::Links => ParserDescriptor::new(name, DEFAULT_LINK_PATTERN),
        }
    }
}
