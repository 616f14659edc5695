use crate::ConfigError;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Pre-processing step applied to raw HTML before matching
pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Predicate applied to every match; `false` drops the match
pub type Filter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Describes how to pull one kind of content out of a page
///
/// A descriptor is immutable once built and cheap to clone, so several
/// collectors (and several jobs) may share the same descriptor.
///
/// When the pattern defines capture groups, the first group is the matched
/// text; otherwise the whole match is used. This lets a pattern anchor on
/// surrounding context (`href="(...)"`) without returning it.
#[derive(Clone)]
pub struct ParserDescriptor {
    name: String,
    pattern: Regex,
    transform: Option<Transform>,
    filter: Option<Filter>,
}

impl ParserDescriptor {
    /// Creates a descriptor from a name and a regular expression
    ///
    /// # Returns
    ///
    /// * `Ok(ParserDescriptor)` - The compiled descriptor
    /// * `Err(ConfigError)` - The name is empty or the pattern does not compile
    ///
    /// # Example
    ///
    /// ```
    /// use harvest_ripple::parser::ParserDescriptor;
    ///
    /// let years = ParserDescriptor::new("years", r"\b(1[89]\d\d|20\d\d)\b").unwrap();
    /// let found = years.extract("Founded in 1998, relaunched in 2021.");
    /// assert!(found.contains("1998"));
    /// assert!(found.contains("2021"));
    /// ```
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "parser name cannot be empty".to_string(),
            ));
        }

        let pattern = Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("pattern for '{}' does not compile: {}", name, e))
        })?;

        Ok(Self {
            name,
            pattern,
            transform: None,
            filter: None,
        })
    }

    /// Sets the transform applied to the HTML before matching
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let transform: Transform = Arc::new(transform);
        self.transform = Some(transform);
        self
    }

    /// Adds a filter; filters compose, and a match must pass all of them
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        let combined: Filter = match self.filter.take() {
            Some(previous) => Arc::new(move |s: &str| previous(s) && filter(s)),
            None => Arc::new(filter),
        };
        self.filter = Some(combined);
        self
    }

    /// Keeps only matches whose whitespace-separated word count is in range
    pub fn with_word_bounds(self, min: Option<usize>, max: Option<usize>) -> Self {
        if min.is_none() && max.is_none() {
            return self;
        }
        self.with_filter(move |s: &str| {
            let words = s.split_whitespace().count();
            min.map_or(true, |m| words >= m) && max.map_or(true, |m| words <= m)
        })
    }

    /// Returns the descriptor name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the source of the compiled pattern
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Extracts the set of filtered matches from a page
    ///
    /// Duplicates within one page collapse into a single entry.
    pub fn extract(&self, html: &str) -> HashSet<String> {
        let text: Cow<'_, str> = match &self.transform {
            Some(transform) => Cow::Owned(transform(html)),
            None => Cow::Borrowed(html),
        };

        let grouped = self.pattern.captures_len() > 1;
        let mut found = HashSet::new();

        for caps in self.pattern.captures_iter(&text) {
            let matched = if grouped { caps.get(1) } else { caps.get(0) };
            let Some(matched) = matched else { continue };

            let value = matched.as_str();
            if value.is_empty() {
                continue;
            }
            if self.filter.as_ref().map_or(true, |filter| filter(value)) {
                found.insert(value.to_string());
            }
        }

        found
    }
}

impl fmt::Debug for ParserDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserDescriptor")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("transform", &self.transform.is_some())
            .field("filter", &self.filter.is_some())
            .finish()
    }
}
