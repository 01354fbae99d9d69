//! # Wildcard Pattern Matching
//!
//! Schema patterns used by the criteria pipeline, compiled once to regular
//! expressions and matched many times.
//!
//! - `*` matches any sequence of characters (including none)
//! - `?` matches exactly one character
//! - every other character matches itself; regex metacharacters are escaped
//! - the pattern must match the whole text
//!
//! Matching is case-sensitive by default, because quoted source identifiers
//! are. Use [`PatternMatcher::case_insensitive`] when that is not wanted.
//!
//! ## Example
//!
//! ```rust
//! use rivven_plog::common::pattern::{PatternMatcher, PatternSet};
//!
//! let matcher = PatternMatcher::new("SOE.*").unwrap();
//! assert!(matcher.matches("SOE.ORDERS"));
//! assert!(!matcher.matches("HR.EMPLOYEES"));
//!
//! let mut set = PatternSet::new();
//! set.add("SYS.*").unwrap();
//! set.add("DBVREP*.*").unwrap();
//! assert!(set.matches("DBVREP_01.DDL_LOG"));
//! assert!(!set.matches("SOE.ORDERS"));
//! ```

use regex::Regex;

/// Error type for pattern operations
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
    #[error("Empty pattern")]
    EmptyPattern,
}

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    /// Original pattern string (for display/debugging)
    pattern: String,
    /// Compiled, anchored regex
    regex: Regex,
    /// Whether this is a wildcard-only pattern (matches everything)
    is_wildcard: bool,
}

impl PatternMatcher {
    /// Compile a case-sensitive wildcard pattern.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Self::build(pattern, false)
    }

    /// Compile a case-insensitive wildcard pattern.
    pub fn case_insensitive(pattern: &str) -> Result<Self, PatternError> {
        Self::build(pattern, true)
    }

    fn build(pattern: &str, case_insensitive: bool) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::EmptyPattern);
        }

        let regex = regex::RegexBuilder::new(&wildcard_to_regex(pattern))
            .case_insensitive(case_insensitive)
            .build()?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            is_wildcard: pattern.chars().all(|c| c == '*'),
        })
    }

    /// Check if text matches the pattern
    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        if self.is_wildcard {
            return true;
        }
        self.regex.is_match(text)
    }

    /// Get the original pattern string
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check if this is a wildcard pattern (matches everything)
    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }
}

/// A set of patterns for "matches any" checks
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<PatternMatcher>,
    has_wildcard: bool,
}

impl PatternSet {
    /// Create an empty pattern set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern set from a list of wildcard patterns
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Add a wildcard pattern to the set
    pub fn add(&mut self, pattern: &str) -> Result<(), PatternError> {
        let matcher = PatternMatcher::new(pattern)?;
        if matcher.is_wildcard {
            self.has_wildcard = true;
        }
        self.patterns.push(matcher);
        Ok(())
    }

    /// Check if text matches any pattern in the set
    #[inline]
    pub fn matches(&self, text: &str) -> bool {
        if self.has_wildcard {
            return true;
        }
        self.patterns.iter().any(|p| p.matches(text))
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Get the number of patterns in the set
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Iterate over the patterns
    pub fn iter(&self) -> impl Iterator<Item = &PatternMatcher> {
        self.patterns.iter()
    }
}

/// Convert a wildcard pattern to an anchored regex
///
/// Escapes special regex characters and converts:
/// - `*` → `.*`
/// - `?` → `.`
fn wildcard_to_regex(pattern: &str) -> String {
    let escaped = regex::escape(pattern);
    let regex_pattern = escaped.replace(r"\*", ".*").replace(r"\?", ".");
    format!("^{}$", regex_pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matcher_exact() {
        let matcher = PatternMatcher::new("SOE.ORDERS").unwrap();
        assert!(matcher.matches("SOE.ORDERS"));
        assert!(!matcher.matches("soe.orders"));
        assert!(!matcher.matches("SOE.ORDERS2"));
    }

    #[test]
    fn test_pattern_matcher_case_insensitive() {
        let matcher = PatternMatcher::case_insensitive("soe.*").unwrap();
        assert!(matcher.matches("SOE.ORDERS"));
        assert!(matcher.matches("soe.orders"));
    }

    #[test]
    fn test_pattern_matcher_wildcard() {
        let matcher = PatternMatcher::new("*").unwrap();
        assert!(matcher.matches("anything"));
        assert!(matcher.matches(""));
        assert!(matcher.is_wildcard());
    }

    #[test]
    fn test_pattern_matcher_star() {
        let matcher = PatternMatcher::new("DBVREP*.*").unwrap();
        assert!(matcher.matches("DBVREP.X"));
        assert!(matcher.matches("DBVREP_01.DDL"));
        assert!(!matcher.matches("DBVREPX"));
    }

    #[test]
    fn test_pattern_matcher_question() {
        let matcher = PatternMatcher::new("SOE.ORDER?").unwrap();
        assert!(matcher.matches("SOE.ORDERS"));
        assert!(!matcher.matches("SOE.ORDER"));
        assert!(!matcher.matches("SOE.ORDERSX"));
    }

    #[test]
    fn test_metacharacters_escaped() {
        let matcher = PatternMatcher::new("A.B").unwrap();
        assert!(matcher.matches("A.B"));
        assert!(!matcher.matches("AXB"));

        let matcher = PatternMatcher::new("T[1]+").unwrap();
        assert!(matcher.matches("T[1]+"));
        assert!(!matcher.matches("T1"));
    }

    #[test]
    fn test_pattern_set() {
        let set = PatternSet::from_patterns(&["SYS.*", "DBVREP.*"]).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches("SYS.OBJ$"));
        assert!(set.matches("DBVREP.SEQ"));
        assert!(!set.matches("SYSTEM.HELP"));
    }

    #[test]
    fn test_pattern_set_wildcard() {
        let mut set = PatternSet::new();
        set.add("*").unwrap();
        assert!(set.has_wildcard);
        assert!(set.matches("anything"));
    }

    #[test]
    fn test_error_cases() {
        assert!(matches!(
            PatternMatcher::new(""),
            Err(PatternError::EmptyPattern)
        ));
    }
}
