use crate::ConfigError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Named languages with a known URL marker code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Croatian,
    German,
    French,
    Spanish,
    Polish,
    Russian,
    Ukrainian,
    Italian,
    Dutch,
}

impl Language {
    /// Returns the marker code that appears in localized URLs
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Croatian => "hr",
            Self::German => "de",
            Self::French => "fr",
            Self::Spanish => "es",
            Self::Polish => "po",
            Self::Russian => "ru",
            Self::Ukrainian => "uk",
            Self::Italian => "it",
            Self::Dutch => "nl",
        }
    }
}

/// A validated language marker and its compiled URL pattern
///
/// A link matches when the code appears as a subdomain (`en.example.com`),
/// a domain segment (`example.en.com`) or a path segment (`/en/`).
#[derive(Debug, Clone)]
pub struct LanguageCode {
    code: String,
    pattern: Regex,
}

impl LanguageCode {
    /// Creates a language marker from a 2 or 3 letter ASCII code
    pub fn new(code: &str) -> Result<Self, ConfigError> {
        let code = code.trim().to_ascii_lowercase();

        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "language code must be 2 or 3 ASCII letters, got '{}'",
                code
            )));
        }

        let pattern = Regex::new(&format!(
            r"\.{code}[./]|[./]{code}\.|/{code}/",
            code = regex::escape(&code)
        ))
        .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self { code, pattern })
    }

    /// Returns the normalized code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Tests whether a link carries this language marker
    pub fn matches(&self, link: &str) -> bool {
        self.pattern.is_match(link)
    }
}

impl From<Language> for LanguageCode {
    fn from(language: Language) -> Self {
        Self::new(language.code()).expect("named language codes are two ASCII letters")
    }
}

impl FromStr for LanguageCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq for LanguageCode {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for LanguageCode {}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}
