//! Validation outcomes.
//!
//! Every check the validator performs ends up as a [`Finding`] with one of
//! the seven [`StatusKind`] values. Statuses are ordered by the attention a
//! finding needs and are only used for filtering and reporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of one finding.
///
/// # Examples
///
/// ```
/// use nxvalidate_core::StatusKind;
///
/// assert!(StatusKind::Ok < StatusKind::Warn);
/// assert_eq!(StatusKind::Error.to_string(), "ERROR");
/// assert_eq!("note".parse::<StatusKind>().unwrap(), StatusKind::Note);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusKind {
    Ok,
    Note,
    Warn,
    Error,
    Todo,
    Unused,
    Comment,
}

impl StatusKind {
    /// All statuses in order.
    pub const ALL: [StatusKind; 7] = [
        Self::Ok,
        Self::Note,
        Self::Warn,
        Self::Error,
        Self::Todo,
        Self::Unused,
        Self::Comment,
    ];

    /// Short name used in reports.
    pub fn key(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Note => "NOTE",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Todo => "TODO",
            Self::Unused => "UNUSED",
            Self::Comment => "COMMENT",
        }
    }

    /// One-line meaning of the status.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "meets NeXus specification",
            Self::Note => "does not meet NeXus specification, but acceptable",
            Self::Warn => "does not meet NeXus specification, not generally acceptable",
            Self::Error => "violates NeXus specification",
            Self::Todo => "validation not implemented yet",
            Self::Unused => "optional NeXus item not used in data file",
            Self::Comment => "comment from the validator source code",
        }
    }

    /// `Ok` when `passed`, otherwise `failed`.
    pub fn pass_or(passed: bool, failed: StatusKind) -> Self {
        if passed { Self::Ok } else { failed }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

/// Every status.
pub const SHOW_ALL: &[StatusKind] = &StatusKind::ALL;

/// Definite problems only.
pub const SHOW_NOT_OK: &[StatusKind] = &[StatusKind::Error, StatusKind::Warn];

/// Everything that needs a look.
pub const SHOW_ERRORS: &[StatusKind] = &[
    StatusKind::Warn,
    StatusKind::Error,
    StatusKind::Todo,
    StatusKind::Unused,
];

/// Result of one check at one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub test_name: String,
    /// Absolute node address, optionally suffixed with `@attribute`.
    pub address: String,
    pub status: StatusKind,
    pub comment: String,
}

impl Finding {
    pub fn new(
        test_name: impl Into<String>,
        address: impl Into<String>,
        status: StatusKind,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            address: address.into(),
            status,
            comment: comment.into(),
        }
    }
}

/// All findings recorded at one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub address: String,
    /// Schema-relative path of the address, absent for the file root.
    pub classpath: Option<String>,
    pub findings: Vec<Finding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_order_follows_attention() {
        let mut shuffled = vec![
            StatusKind::Comment,
            StatusKind::Error,
            StatusKind::Ok,
            StatusKind::Todo,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                StatusKind::Ok,
                StatusKind::Error,
                StatusKind::Todo,
                StatusKind::Comment
            ]
        );
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let raw = serde_json::to_string(&StatusKind::Warn).unwrap();
        assert_eq!(raw, "\"WARN\"");
        let back: StatusKind = serde_json::from_str("\"UNUSED\"").unwrap();
        assert_eq!(back, StatusKind::Unused);
    }

    #[test]
    fn test_status_from_str_rejects_unknown() {
        assert!("fatal".parse::<StatusKind>().is_err());
    }

    #[test]
    fn test_filter_presets() {
        assert_eq!(SHOW_ALL.len(), 7);
        assert!(!SHOW_NOT_OK.contains(&StatusKind::Todo));
        assert!(SHOW_ERRORS.contains(&StatusKind::Todo));
        assert!(!SHOW_ERRORS.contains(&StatusKind::Ok));
    }
}
