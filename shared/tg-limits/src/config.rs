//! Versioned rate-limit configuration.
//!
//! The declarative document enumerates one quota per operation class. The
//! server loads it at startup and serves it back over HTTP so client-side
//! pre-checks consume the identical source; any divergence between the two is
//! a deployment bug, not a runtime condition.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::OperationClass;

/// Default document compiled into the binary. Deployments can override it
/// with a file, but the embedded copy keeps a bare process startable.
const BUILTIN_DOCUMENT: &str = include_str!("../rate-limits.json");

/// Errors raised while loading or validating the rate-limit document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An operation class has no entry in the document. Fatal at startup:
    /// silently defaulting a quota here would let a deploy weaken throttling
    /// without anyone noticing.
    #[error("no rate limit configured for operation class `{0}`")]
    MissingClass(&'static str),

    /// An entry carries an unusable value (zero requests or zero window).
    #[error("invalid rate limit for operation class `{class}`: {reason}")]
    InvalidLimit { class: String, reason: String },

    /// The document is not valid JSON for the expected schema.
    #[error("malformed rate limits document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document file could not be read.
    #[error("failed to read rate limits document at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One class's quota: at most `max_requests` in a fixed window of
/// `window_seconds`, counted from first use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLimit {
    pub max_requests: u32,
    pub window_seconds: u32,
    pub description: String,
}

/// The versioned declarative document.
///
/// Schema:
/// ```json
/// { "version": "1.0.0",
///   "rate_limits": { "read": { "max_requests": 100, "window_seconds": 60, "description": "..." } } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsDocument {
    pub version: String,
    pub rate_limits: BTreeMap<String, ClassLimit>,
}

impl LimitsDocument {
    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The document compiled into the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json(BUILTIN_DOCUMENT)
    }
}

/// A validated view of a [`LimitsDocument`]: every [`OperationClass`] is
/// guaranteed to have a usable entry.
#[derive(Debug, Clone)]
pub struct LimitsTable {
    document: LimitsDocument,
}

impl LimitsTable {
    /// Validate a document into a table.
    ///
    /// Fails when any operation class has no entry, or when an entry carries
    /// a zero `max_requests` or `window_seconds`.
    pub fn from_document(document: LimitsDocument) -> Result<Self, ConfigError> {
        for class in OperationClass::all() {
            let limit = document
                .rate_limits
                .get(class.as_str())
                .ok_or(ConfigError::MissingClass(class.as_str()))?;
            if limit.max_requests == 0 {
                return Err(ConfigError::InvalidLimit {
                    class: class.as_str().to_string(),
                    reason: "max_requests must be greater than zero".to_string(),
                });
            }
            if limit.window_seconds == 0 {
                return Err(ConfigError::InvalidLimit {
                    class: class.as_str().to_string(),
                    reason: "window_seconds must be greater than zero".to_string(),
                });
            }
        }
        Ok(Self { document })
    }

    /// Quota for one class. Infallible: validation already proved presence.
    pub fn class_config(&self, class: OperationClass) -> &ClassLimit {
        // Presence was checked in from_document; the unreachable arm guards
        // against the table and enum drifting apart.
        self.document
            .rate_limits
            .get(class.as_str())
            .unwrap_or_else(|| unreachable!("validated table missing class {class}"))
    }

    /// Document version string.
    pub fn version(&self) -> &str {
        &self.document.version
    }

    /// The underlying document, for serving to client mirrors.
    pub fn document(&self) -> &LimitsDocument {
        &self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_document_resolves() {
        let doc = LimitsDocument::builtin().expect("builtin document parses");
        let table = LimitsTable::from_document(doc).expect("builtin document validates");

        assert_eq!(table.version(), "1.0.0");
        let modification = table.class_config(OperationClass::Modification);
        assert_eq!(modification.max_requests, 30);
        assert_eq!(modification.window_seconds, 60);
        assert_eq!(table.class_config(OperationClass::Read).max_requests, 100);
        assert_eq!(
            table.class_config(OperationClass::Overview).max_requests,
            200
        );
    }

    #[test]
    fn test_missing_class_is_fatal() {
        let json = r#"{
            "version": "1.0.0",
            "rate_limits": {
                "read": { "max_requests": 10, "window_seconds": 60, "description": "reads" },
                "overview": { "max_requests": 20, "window_seconds": 60, "description": "overview" }
            }
        }"#;
        let doc = LimitsDocument::from_json(json).expect("document parses");
        let err = LimitsTable::from_document(doc).expect_err("modification entry is missing");
        assert!(matches!(err, ConfigError::MissingClass("modification")));
    }

    #[test]
    fn test_zero_limits_are_rejected() {
        let json = r#"{
            "version": "1.0.0",
            "rate_limits": {
                "read": { "max_requests": 0, "window_seconds": 60, "description": "reads" },
                "overview": { "max_requests": 20, "window_seconds": 60, "description": "overview" },
                "modification": { "max_requests": 30, "window_seconds": 60, "description": "writes" }
            }
        }"#;
        let doc = LimitsDocument::from_json(json).expect("document parses");
        let err = LimitsTable::from_document(doc).expect_err("zero max_requests rejected");
        assert!(matches!(err, ConfigError::InvalidLimit { .. }));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(
            LimitsDocument::from_json("{ not json"),
            Err(ConfigError::Malformed(_))
        ));
        // Valid JSON, wrong shape.
        assert!(matches!(
            LimitsDocument::from_json(r#"{"version": 3}"#),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_document_round_trips_for_client_mirrors() {
        let doc = LimitsDocument::builtin().expect("builtin document parses");
        let json = serde_json::to_string(&doc).expect("document serializes");
        let mirrored = LimitsDocument::from_json(&json).expect("mirror parses");

        assert_eq!(mirrored.version, doc.version);
        assert_eq!(mirrored.rate_limits, doc.rate_limits);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = LimitsDocument::from_path("/nonexistent/rate-limits.json")
            .expect_err("missing file fails");
        match err {
            ConfigError::Io { path, .. } => assert!(path.contains("nonexistent")),
            other => panic!("expected Io error, got {other}"),
        }
    }
}
