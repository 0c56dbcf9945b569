//! Crate-wide error type.
//!
//! Every failure that can escape compilation or evaluation is funneled through
//! [`PhylanxError`], which always carries the `codename(id, col): message` triple
//! described by the name scheme so that diagnostics stay uniform whether they
//! originate in the reader, the compiler, the slicing engine, or the executor.

use std::fmt;

use strum::Display;

use crate::reader::{CodeRange, ParseError};
use crate::resource::ResourceError;

/// Abstract classification of a failure, independent of where it was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    /// An expression did not structurally match any registered pattern.
    ParseMatch,
    /// An identifier was undefined, or a `define`/`lambda` had a malformed binding target.
    Binding,
    /// A primitive was invoked with the wrong number of operands.
    Arity,
    /// An operand had a type incompatible with the primitive (e.g. scalar assigned into a matrix).
    TypeMismatch,
    /// A slice index, step, or shape was out of the accepted domain.
    Domain,
    /// An error propagated up from evaluating a child primitive.
    Evaluation,
}

/// A single diagnosable failure, tagged with the source position that produced it.
///
/// The `codename` is the name of the compile unit (usually the script name); `id`/`col`
/// are the byte offset and column of the offending expression, mirroring [`CodeRange`].
#[derive(Debug, Clone)]
pub struct PhylanxError {
    pub kind: ErrorKind,
    pub codename: String,
    pub id: usize,
    pub col: usize,
    pub message: String,
}

impl PhylanxError {
    pub(crate) fn new(
        kind: ErrorKind,
        codename: impl Into<String>,
        position: CodeRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            codename: codename.into(),
            id: position.id,
            col: position.col,
            message: message.into(),
        }
    }

    pub(crate) fn parse_match(codename: impl Into<String>, position: CodeRange, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseMatch, codename, position, message)
    }

    pub(crate) fn binding(codename: impl Into<String>, position: CodeRange, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Binding, codename, position, message)
    }

    pub(crate) fn arity(codename: impl Into<String>, position: CodeRange, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, codename, position, message)
    }

    pub(crate) fn type_mismatch(codename: impl Into<String>, position: CodeRange, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, codename, position, message)
    }

    pub(crate) fn domain(codename: impl Into<String>, position: CodeRange, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Domain, codename, position, message)
    }

    /// Wraps an error that escaped from evaluating an operand, preserving its position
    /// but re-tagging it as having propagated through the wrapping primitive.
    #[must_use]
    pub fn propagate(self) -> Self {
        Self {
            kind: ErrorKind::Evaluation,
            ..self
        }
    }
}

impl fmt::Display for PhylanxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}): {}", self.codename, self.id, self.col, self.message)
    }
}

impl std::error::Error for PhylanxError {}

/// A reader failure surfaces as a [`ErrorKind::ParseMatch`] error with no compile-unit
/// codename yet assigned, since parsing happens before a [`crate::compiler::Compiler`]
/// exists to name one.
impl From<ParseError> for PhylanxError {
    fn from(err: ParseError) -> Self {
        Self::new(ErrorKind::ParseMatch, String::new(), err.position, err.message)
    }
}

/// A resource-ceiling failure surfaces as an [`ErrorKind::Evaluation`] error carrying no
/// source position, since it is raised by the tracker rather than by a specific primitive.
impl From<ResourceError> for PhylanxError {
    fn from(err: ResourceError) -> Self {
        Self::new(ErrorKind::Evaluation, String::new(), CodeRange::default(), err.to_string())
    }
}

pub type PhylanxResult<T> = Result<T, PhylanxError>;
