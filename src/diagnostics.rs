//! Diagnostic infrastructure.
//!
//! This module provides infrastructure for collecting and formatting
//! semantic-analysis errors and notes. It works with spans rather than raw
//! string positions; the driver owns the mapping back to line/column.
//!
//! # Components
//!
//! - `Diagnostic` - A single diagnostic message with location and severity
//! - `DiagnosticBag` - A collection of diagnostics for a check request
//! - `DiagnosticSeverity` - Error, Warning, Note, or Hint
//! - `codes` - Stable numeric codes for every diagnostic this crate emits
//!
//! The solver and rewriter never format user-facing strings beyond the
//! message template for a code; secondary candidates (e.g. the competing
//! overloads of an ambiguity) are attached as related notes.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable diagnostic codes.
///
/// Grouped by taxonomy: 1xxx archetype building, 2xxx constraint solving,
/// 3xxx coercion/rewriting. Codes are part of the tooling contract and are
/// never reused.
pub mod codes {
    /// A generic parameter was registered twice.
    pub const DUPLICATE_GENERIC_PARAMETER: u32 = 1001;
    /// Two incompatible superclass bounds on one equivalence class.
    pub const CONFLICTING_SUPERCLASS: u32 = 1002;
    /// A same-type requirement forms an inconsistent cycle.
    pub const INCONSISTENT_SAME_TYPE: u32 = 1003;
    /// A requirement names an unknown generic parameter.
    pub const UNKNOWN_GENERIC_PARAMETER: u32 = 1004;

    /// Two types could not be made equal or convertible.
    pub const TYPE_MISMATCH: u32 = 2001;
    /// A type does not conform to a required protocol.
    pub const PROTOCOL_CONFORMANCE: u32 = 2002;
    /// No member with the given name on the base type.
    pub const NO_SUCH_MEMBER: u32 = 2003;
    /// The callee cannot be applied to the given argument list.
    pub const CANNOT_CALL: u32 = 2004;
    /// Two or more solutions scored equally well.
    pub const AMBIGUOUS: u32 = 2005;
    /// The search budget was exhausted.
    pub const TOO_COMPLEX: u32 = 2006;
    /// A type variable could not be resolved from context.
    pub const UNRESOLVED_TYPE: u32 = 2007;
    /// A literal has no conversion to the contextual type.
    pub const LITERAL_NOT_EXPRESSIBLE: u32 = 2008;

    /// An optional value must be unwrapped before this conversion.
    pub const OPTIONAL_NOT_UNWRAPPED: u32 = 3001;
    /// Tuple arity or labels do not line up for this conversion.
    pub const TUPLE_SHAPE_MISMATCH: u32 = 3002;
}

// =============================================================================
// Diagnostic Severity
// =============================================================================

/// The severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// A hint (lowest severity)
    Hint = 4,
    /// A secondary note attached to a primary diagnostic
    Note = 3,
    /// A warning
    Warning = 2,
    /// An error (highest severity)
    Error = 1,
}

impl DiagnosticSeverity {
    /// Get the severity name for display.
    pub fn name(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Note => "note",
            DiagnosticSeverity::Hint => "hint",
        }
    }

    /// Check if this is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticSeverity::Error)
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for DiagnosticSeverity {
    fn default() -> Self {
        DiagnosticSeverity::Error
    }
}

// =============================================================================
// Related Information
// =============================================================================

/// Additional information related to a diagnostic.
///
/// Used for "see also" locations, such as the competing candidates of an
/// ambiguous overload set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticRelatedInfo {
    /// Location span
    pub span: Span,
    /// Message explaining the relationship
    pub message: String,
}

impl DiagnosticRelatedInfo {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        DiagnosticRelatedInfo {
            span,
            message: message.into(),
        }
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A diagnostic message with location, severity, and error code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The source span (byte offsets)
    pub span: Span,
    /// The diagnostic message
    pub message: String,
    /// The severity level
    pub severity: DiagnosticSeverity,
    /// The diagnostic code (see [`codes`])
    pub code: u32,
    /// Optional related information
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub related: Vec<DiagnosticRelatedInfo>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(
        span: Span,
        message: impl Into<String>,
        severity: DiagnosticSeverity,
        code: u32,
    ) -> Self {
        Diagnostic {
            span,
            message: message.into(),
            severity,
            code,
            related: Vec::new(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(span: Span, message: impl Into<String>, code: u32) -> Self {
        Self::new(span, message, DiagnosticSeverity::Error, code)
    }

    /// Create a warning diagnostic.
    pub fn warning(span: Span, message: impl Into<String>, code: u32) -> Self {
        Self::new(span, message, DiagnosticSeverity::Warning, code)
    }

    /// Add related information.
    pub fn with_related(mut self, info: DiagnosticRelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    /// Add multiple related information items.
    pub fn with_related_all(mut self, infos: Vec<DiagnosticRelatedInfo>) -> Self {
        self.related.extend(infos);
        self
    }

    /// Check if this is an error.
    pub fn is_error(&self) -> bool {
        self.severity.is_error()
    }

    /// Format the diagnostic in a simple format.
    ///
    /// Returns a string like: "error[AS2001]: cannot convert 'Int' to 'String'"
    pub fn format_simple(&self) -> String {
        format!("{}[AS{}]: {}", self.severity, self.code, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

// =============================================================================
// DiagnosticBag
// =============================================================================

/// A collection of diagnostics for a check request.
///
/// DiagnosticBag provides a convenient interface for collecting diagnostics
/// during archetype building and constraint solving. It tracks error counts
/// and provides filtering capabilities.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticBag {
    /// The collected diagnostics
    diagnostics: Vec<Diagnostic>,
    /// Error count
    error_count: usize,
    /// Warning count
    warning_count: usize,
}

impl DiagnosticBag {
    /// Create a new empty diagnostic bag.
    pub fn new() -> Self {
        DiagnosticBag::default()
    }

    /// Add a diagnostic to the bag.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            DiagnosticSeverity::Error => self.error_count += 1,
            DiagnosticSeverity::Warning => self.warning_count += 1,
            _ => {}
        }
        self.diagnostics.push(diagnostic);
    }

    /// Add an error with the default span handling.
    pub fn error(&mut self, span: Span, message: impl Into<String>, code: u32) {
        self.add(Diagnostic::error(span, message, code));
    }

    /// Add a warning.
    pub fn warning(&mut self, span: Span, message: impl Into<String>, code: u32) {
        self.add(Diagnostic::warning(span, message, code));
    }

    /// Iterate over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Number of diagnostics collected.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of errors collected.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of warnings collected.
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// True if at least one error was collected.
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Drain the diagnostics out of the bag.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diagnostics)
    }

    /// Serialize the collected diagnostics as a JSON array, the format
    /// tooling on the driver side consumes.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "[]".to_string())
    }
}

impl IntoIterator for DiagnosticBag {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}
