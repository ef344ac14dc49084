//! Domain identifier types with validation
//!
//! Newtype wrappers keep job identifiers and pagination cursors from being
//! mixed up with plain strings and integers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Export job identifier
///
/// Always a freshly generated random UUID; the textual form is the hyphenated
/// lowercase representation and doubles as the result file stem.
///
/// # Examples
///
/// ```
/// use quarry::domain::ids::JobId;
/// use std::str::FromStr;
///
/// let id = JobId::from_str("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
/// assert_eq!(id.as_str(), "7d44b88c-4199-4bad-97dc-d78268e01398");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generates a new random job id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates a JobId from an existing UUID string
    ///
    /// # Returns
    ///
    /// Returns `Ok(JobId)` if the string is a valid UUID, `Err` otherwise
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let parsed = Uuid::parse_str(id.trim())
            .map_err(|e| format!("Invalid job id '{id}': {e}"))?;
        Ok(Self(parsed.to_string()))
    }

    /// Returns the job id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for JobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pagination cursor: the last record id already consumed
///
/// The next page always starts strictly after this id. A fresh cursor has
/// seen nothing yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(Option<i64>);

impl Cursor {
    /// Cursor positioned before the first record
    pub fn start() -> Self {
        Self(None)
    }

    /// Cursor positioned after `id`
    pub fn after(id: i64) -> Self {
        Self(Some(id))
    }

    /// Last id consumed, if any
    pub fn last_seen(&self) -> Option<i64> {
        self.0
    }

    /// Whether `id` lies strictly after this cursor
    pub fn admits(&self, id: i64) -> bool {
        self.0.map_or(true, |last| id > last)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "start"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_generate_is_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn test_job_id_rejects_garbage() {
        assert!(JobId::new("not-a-uuid").is_err());
        assert!(JobId::from_str("").is_err());
    }

    #[test]
    fn test_job_id_normalises_case() {
        let id = JobId::new("7D44B88C-4199-4BAD-97DC-D78268E01398").unwrap();
        assert_eq!(id.as_str(), "7d44b88c-4199-4bad-97dc-d78268e01398");
    }

    #[test]
    fn test_job_id_serializes_as_string() {
        let id = JobId::new("7d44b88c-4199-4bad-97dc-d78268e01398").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"7d44b88c-4199-4bad-97dc-d78268e01398\"");
    }

    #[test]
    fn test_cursor_admits_strictly_after() {
        let start = Cursor::start();
        assert!(start.admits(i64::MIN));
        assert_eq!(start.last_seen(), None);

        let cursor = Cursor::after(42);
        assert!(!cursor.admits(42));
        assert!(!cursor.admits(7));
        assert!(cursor.admits(43));
        assert_eq!(cursor.to_string(), "42");
    }
}
