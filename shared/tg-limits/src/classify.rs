//! Endpoint classification.
//!
//! Maps `(path, method)` to an [`OperationClass`]. The mapping is a pure
//! lookup over static tables so a client-side mirror running the same tables
//! always agrees with the server.

use serde::{Deserialize, Serialize};

/// Throttling classes for API operations.
///
/// Each class is paired with its own quota in the rate-limit document.
/// Adding a class means adding a table entry and a document entry, not
/// touching call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationClass {
    /// Budget overview and summary reads (dashboard-style aggregates)
    Overview,
    /// Individual budget item reads
    Read,
    /// Budget creation, update, and deletion
    Modification,
}

impl OperationClass {
    /// Stable string identifier, used in store keys and in the rate-limit
    /// document. Explicit strings instead of discriminants so reordering the
    /// enum can never change a key.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Read => "read",
            Self::Modification => "modification",
        }
    }

    /// All classes. Configuration loading resolves every entry here and
    /// refuses to start when one is missing.
    pub const fn all() -> &'static [Self] {
        &[Self::Overview, Self::Read, Self::Modification]
    }
}

impl std::fmt::Display for OperationClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact `(path, method)` routes. Checked before any prefix rule.
const EXACT_ROUTES: &[(&str, &str, OperationClass)] = &[
    ("/api/budgets", "GET", OperationClass::Overview),
    ("/api/budgets/overview", "GET", OperationClass::Overview),
    ("/api/budgets/summary", "GET", OperationClass::Overview),
    ("/api/budgets", "POST", OperationClass::Modification),
];

/// Prefix routes for item endpoints. A prefix only matches when the
/// remaining path segment is non-empty, which keeps collection endpoints
/// (`/api/budgets`) distinct from item endpoints (`/api/budgets/{id}`).
const PREFIX_ROUTES: &[(&str, &str, OperationClass)] = &[
    ("/api/budgets/", "GET", OperationClass::Read),
    ("/api/budgets/", "PUT", OperationClass::Modification),
    ("/api/budgets/", "PATCH", OperationClass::Modification),
    ("/api/budgets/", "DELETE", OperationClass::Modification),
];

/// Classify a request into an [`OperationClass`].
///
/// Total over all inputs: unmatched paths fall back to [`OperationClass::Read`],
/// a conservative default rather than a configuration error. Exact matches
/// take priority over prefix matches; among prefix matches the longest
/// matching prefix wins.
pub fn classify(path: &str, method: &str) -> OperationClass {
    for (route, m, class) in EXACT_ROUTES {
        if *route == path && method.eq_ignore_ascii_case(m) {
            return *class;
        }
    }

    let mut best: Option<(&str, OperationClass)> = None;
    for (prefix, m, class) in PREFIX_ROUTES {
        if !method.eq_ignore_ascii_case(m) {
            continue;
        }
        // Non-empty remainder required: the bare collection path is not an
        // item endpoint.
        if path.len() > prefix.len() && path.starts_with(prefix) {
            match best {
                Some((current, _)) if current.len() >= prefix.len() => {}
                _ => best = Some((prefix, *class)),
            }
        }
    }

    best.map_or(OperationClass::Read, |(_, class)| class)
}
