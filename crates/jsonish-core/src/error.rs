//! Error types surfaced by the raw parser and the coercer.

use thiserror::Error;

/// Stable, machine-readable reason codes.
///
/// These correspond 1:1 with the `reason` field of [`ParseError`] and are
/// meant to be matched on by callers, so variant names are part of the
/// public contract once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Reason {
    NoMatchingUnionArm,
    MissingRequiredField,
    UnsupportedMapKey,
    CircularReference,
    AmbiguousBoolean,
    AmbiguousEnum,
    UnparseableNumber,
    RefinementFailed,
    UnterminatedString,
    DepthExceeded,
    TypeMismatch,
    NoCandidate,
    IncompleteValue,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::NoMatchingUnionArm => "NoMatchingUnionArm",
            Reason::MissingRequiredField => "MissingRequiredField",
            Reason::UnsupportedMapKey => "UnsupportedMapKey",
            Reason::CircularReference => "CircularReference",
            Reason::AmbiguousBoolean => "AmbiguousBoolean",
            Reason::AmbiguousEnum => "AmbiguousEnum",
            Reason::UnparseableNumber => "UnparseableNumber",
            Reason::RefinementFailed => "RefinementFailed",
            Reason::UnterminatedString => "UnterminatedString",
            Reason::DepthExceeded => "DepthExceeded",
            Reason::TypeMismatch => "TypeMismatch",
            Reason::NoCandidate => "NoCandidate",
            Reason::IncompleteValue => "IncompleteValue",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coercion/parse failure, carrying a breadcrumb into the failing field and
/// the child errors tried for union arms.
#[derive(Debug, Error, Clone)]
#[error("{reason} at {}", scope.join("."))]
pub struct ParseError {
    /// Breadcrumb into the failing field, root first.
    pub scope: Vec<String>,
    /// The failing rule, as a stable reason code.
    pub reason: Reason,
    /// Extra human-readable detail (not part of the stable contract).
    pub detail: String,
    /// Child errors for union arms that were tried and rejected.
    pub causes: Vec<ParseError>,
}

impl ParseError {
    pub fn new(reason: Reason, detail: impl Into<String>) -> Self {
        ParseError {
            scope: Vec::new(),
            reason,
            detail: detail.into(),
            causes: Vec::new(),
        }
    }

    pub fn with_scope(mut self, segment: impl Into<String>) -> Self {
        self.scope.insert(0, segment.into());
        self
    }

    pub fn with_causes(mut self, causes: Vec<ParseError>) -> Self {
        self.causes = causes;
        self
    }
}
