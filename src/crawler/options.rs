use crate::url::LanguageCode;
use serde::Deserialize;
use std::fmt;

/// Switches that change how a crawl job behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrapeOption {
    /// Log every fetch and accumulation event
    DebugMode,
    /// Persist visited and unvisited links on close
    SaveLinks,
    /// Persist collected content on flush and close
    SaveParsedElements,
    /// Ignore collector limits and run until the frontier is exhausted
    Unlimited,
    /// Only follow links on the seed's site
    StayOnWebsite,
}

impl ScrapeOption {
    pub const ALL: [ScrapeOption; 5] = [
        Self::DebugMode,
        Self::SaveLinks,
        Self::SaveParsedElements,
        Self::Unlimited,
        Self::StayOnWebsite,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Returns the configuration name of the option
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DebugMode => "debug-mode",
            Self::SaveLinks => "save-links",
            Self::SaveParsedElements => "save-parsed-elements",
            Self::Unlimited => "unlimited",
            Self::StayOnWebsite => "stay-on-website",
        }
    }
}

impl fmt::Display for ScrapeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of [`ScrapeOption`] flags plus the optional language restriction
///
/// # Example
///
/// ```
/// use harvest_ripple::{OptionSet, ScrapeOption};
///
/// let options = OptionSet::new()
///     .with(ScrapeOption::SaveParsedElements)
///     .with(ScrapeOption::StayOnWebsite);
///
/// assert!(options.contains(ScrapeOption::StayOnWebsite));
/// assert!(!options.contains(ScrapeOption::Unlimited));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    flags: u8,
    language: Option<LanguageCode>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `option` enabled
    pub fn with(mut self, option: ScrapeOption) -> Self {
        self.insert(option);
        self
    }

    /// Returns the set restricted to links carrying a language marker
    pub fn restrict_language(mut self, language: LanguageCode) -> Self {
        self.language = Some(language);
        self
    }

    pub fn insert(&mut self, option: ScrapeOption) {
        self.flags |= option.bit();
    }

    pub fn remove(&mut self, option: ScrapeOption) {
        self.flags &= !option.bit();
    }

    pub fn contains(&self, option: ScrapeOption) -> bool {
        self.flags & option.bit() != 0
    }

    /// Language restriction, if any
    pub fn language(&self) -> Option<&LanguageCode> {
        self.language.as_ref()
    }

    /// Iterates over the enabled flags
    pub fn iter(&self) -> impl Iterator<Item = ScrapeOption> + '_ {
        ScrapeOption::ALL
            .into_iter()
            .filter(move |option| self.contains(*option))
    }
}

impl FromIterator<ScrapeOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = ScrapeOption>>(iter: I) -> Self {
        let mut options = Self::new();
        for option in iter {
            options.insert(option);
        }
        options
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.iter().map(|o| o.as_str().to_string()).collect();
        if let Some(language) = &self.language {
            names.push(format!("restrict-language({})", language));
        }
        write!(f, "[{}]", names.join(", "))
    }
}
