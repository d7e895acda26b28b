//! Tiered item-name matching.
//!
//! NeXus names are checked against a strict pattern first and the
//! corpus's relaxed `validItemName` pattern second. Names that match
//! neither are still legal HDF5 names; they are reported as non-conforming
//! unless the name itself could not be decoded.
//!
//! | order | status | tier          | meaning                                      |
//! |-------|--------|---------------|----------------------------------------------|
//! | 1     | OK     | strict        | matches the most stringent NeXus rule        |
//! | 2     | NOTE   | relaxed       | matches the generally accepted NeXus rule    |
//! | 3     | ERROR  | decode error  | the name is not valid text                   |
//! | 4     | WARN   | HDF5 only     | acceptable to HDF5 but not to NeXus          |

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Result, ValidatorError};
use crate::{Pattern, PatternTier, SchemaProvider, StatusKind};

/// Corpus pattern for item names (relaxed tier).
pub const VALID_ITEM_NAME: &str = "validItemName";
/// Built-in strict variant of [`VALID_ITEM_NAME`].
pub const VALID_ITEM_NAME_STRICT: &str = "validItemName-strict";
/// Corpus pattern for class names.
pub const VALID_NX_CLASS_NAME: &str = "validNXClassName";
/// Corpus pattern for link target addresses.
pub const VALID_TARGET_NAME: &str = "validTargetName";

/// Patterns the corpus must define exactly once.
pub const REQUIRED_PATTERNS: [&str; 3] = [VALID_ITEM_NAME, VALID_NX_CLASS_NAME, VALID_TARGET_NAME];

const STRICT_ITEM_NAME: &str = "[a-z_][a-z0-9_]*";

/// Conformance tier of a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameTier {
    Strict,
    Relaxed,
    DecodeError,
    Hdf5Only,
}

impl NameTier {
    pub fn status(self) -> StatusKind {
        match self {
            Self::Strict => StatusKind::Ok,
            Self::Relaxed => StatusKind::Note,
            Self::DecodeError => StatusKind::Error,
            Self::Hdf5Only => StatusKind::Warn,
        }
    }
}

/// Compiled, full-string-anchored pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub name: String,
    /// Expression as written in the corpus, without anchors.
    pub source: String,
    pub tier: PatternTier,
    regex: Regex,
}

impl CompiledPattern {
    fn compile(pattern: &Pattern) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{})$", pattern.regex)).map_err(|source| {
            ValidatorError::InvalidPattern {
                name: pattern.name.clone(),
                source,
            }
        })?;
        Ok(Self {
            name: pattern.name.clone(),
            source: pattern.regex.clone(),
            tier: pattern.tier,
            regex,
        })
    }

    /// Returns `true` if the whole of `text` matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Name classifier built from the corpus patterns.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::*;
///
/// let mut bundle = DefinitionBundle::new("test");
/// bundle.patterns = vec![
///     Pattern::new("validItemName", "[A-Za-z_][A-Za-z0-9_]*", PatternTier::Relaxed),
///     Pattern::new("validNXClassName", "NX[a-z_]+", PatternTier::Custom),
///     Pattern::new("validTargetName", "(/[A-Za-z_][A-Za-z0-9_]*)+", PatternTier::Custom),
/// ];
///
/// let matcher = PatternMatcher::from_schema(&bundle).unwrap();
/// assert_eq!(matcher.classify("sample"), NameTier::Strict);
/// assert_eq!(matcher.classify("Sample"), NameTier::Relaxed);
/// assert_eq!(matcher.classify("two words"), NameTier::Hdf5Only);
/// ```
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: HashMap<String, CompiledPattern>,
}

impl PatternMatcher {
    /// Compiles the required corpus patterns plus the built-in strict one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::SchemaPatternMissing`] when the corpus does
    /// not define exactly one pattern for a required name, or
    /// [`ValidatorError::InvalidPattern`] when a pattern does not compile.
    pub fn from_schema<S: SchemaProvider + ?Sized>(schema: &S) -> Result<Self> {
        let mut patterns = HashMap::new();
        for name in REQUIRED_PATTERNS {
            let definitions = schema.named_patterns(name);
            if definitions.len() != 1 {
                return Err(ValidatorError::SchemaPatternMissing {
                    name: name.to_string(),
                    found: definitions.len(),
                });
            }
            patterns.insert(name.to_string(), CompiledPattern::compile(definitions[0])?);
        }

        let strict = Pattern::new(VALID_ITEM_NAME_STRICT, STRICT_ITEM_NAME, PatternTier::Strict);
        patterns.insert(strict.name.clone(), CompiledPattern::compile(&strict)?);

        Ok(Self { patterns })
    }

    /// Returns a compiled pattern by name.
    pub fn get(&self, name: &str) -> Option<&CompiledPattern> {
        self.patterns.get(name)
    }

    /// Classifies a short item name.
    pub fn classify(&self, short_name: &str) -> NameTier {
        if self.matches(VALID_ITEM_NAME_STRICT, short_name) {
            NameTier::Strict
        } else if self.matches(VALID_ITEM_NAME, short_name) {
            NameTier::Relaxed
        } else if short_name.contains(char::REPLACEMENT_CHARACTER) {
            NameTier::DecodeError
        } else {
            NameTier::Hdf5Only
        }
    }

    /// Test name and comment reported for a tier.
    pub fn describe(&self, tier: NameTier) -> (&'static str, String) {
        match tier {
            NameTier::Strict => (
                VALID_ITEM_NAME_STRICT,
                format!("strict re: {}", self.source_of(VALID_ITEM_NAME_STRICT)),
            ),
            NameTier::Relaxed => (
                VALID_ITEM_NAME,
                format!("relaxed re: {}", self.source_of(VALID_ITEM_NAME)),
            ),
            NameTier::DecodeError | NameTier::Hdf5Only => (
                VALID_ITEM_NAME,
                "valid HDF5 item name, not valid with NeXus".to_string(),
            ),
        }
    }

    fn matches(&self, name: &str, text: &str) -> bool {
        self.patterns.get(name).is_some_and(|p| p.is_match(text))
    }

    fn source_of(&self, name: &str) -> &str {
        self.patterns
            .get(name)
            .map(|p| p.source.as_str())
            .unwrap_or_default()
    }
}
