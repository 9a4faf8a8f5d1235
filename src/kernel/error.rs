//! Construction-time failures of kernel factories.

use std::fmt;

use crate::types::FieldType;

/// The part of a request an error is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    Opcode,
    Input(usize),
    Result(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Opcode => write!(f, "opcode"),
            Operand::Input(i) => write!(f, "in{}", i),
            Operand::Result(i) => write!(f, "result {}", i),
        }
    }
}

/// Error taxonomy the caller reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The request itself is inconsistent: a bug upstream.
    ContractViolation,
    /// A combination this family has not enabled.
    Unimplemented,
    /// The multi-pass planner returned something unusable.
    PlannerInconsistency,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum KernelError {
    #[error("{family}: opcode `{opcode}` is not accepted by this family")]
    UnsupportedOpcode { family: &'static str, opcode: String },

    #[error("{family}: expected {expected} input(s), got {actual}")]
    InputCount {
        family: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{family}: expected {expected} result type(s), got {actual}")]
    ResultCount {
        family: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{family}: result {index} type mismatch: expected {expected}, got {actual}")]
    ResultTypeMismatch {
        family: &'static str,
        index: usize,
        expected: FieldType,
        actual: FieldType,
    },

    #[error("{family}: {operand}: {message}")]
    Precondition {
        family: &'static str,
        operand: Operand,
        message: String,
    },

    #[error("{family}: {operand}: {what} is not implemented")]
    Unimplemented {
        family: &'static str,
        operand: Operand,
        what: String,
    },

    #[error("{family}: planner inconsistency: {message}")]
    PlannerInconsistency {
        family: &'static str,
        message: String,
    },
}

impl KernelError {
    pub(crate) fn precondition(
        family: &'static str,
        operand: Operand,
        message: impl Into<String>,
    ) -> Self {
        KernelError::Precondition {
            family,
            operand,
            message: message.into(),
        }
    }

    pub(crate) fn unimplemented(
        family: &'static str,
        operand: Operand,
        what: impl Into<String>,
    ) -> Self {
        KernelError::Unimplemented {
            family,
            operand,
            what: what.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            KernelError::UnsupportedOpcode { .. }
            | KernelError::InputCount { .. }
            | KernelError::ResultCount { .. }
            | KernelError::ResultTypeMismatch { .. }
            | KernelError::Precondition { .. } => ErrorClass::ContractViolation,
            KernelError::Unimplemented { .. } => ErrorClass::Unimplemented,
            KernelError::PlannerInconsistency { .. } => ErrorClass::PlannerInconsistency,
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            KernelError::UnsupportedOpcode { family, .. }
            | KernelError::InputCount { family, .. }
            | KernelError::ResultCount { family, .. }
            | KernelError::ResultTypeMismatch { family, .. }
            | KernelError::Precondition { family, .. }
            | KernelError::Unimplemented { family, .. }
            | KernelError::PlannerInconsistency { family, .. } => *family,
        }
    }

    /// The operand to point at when reporting.
    pub fn operand(&self) -> Option<Operand> {
        match self {
            KernelError::UnsupportedOpcode { .. } => Some(Operand::Opcode),
            KernelError::InputCount { .. } => None,
            KernelError::ResultCount { .. } => None,
            KernelError::ResultTypeMismatch { index, .. } => Some(Operand::Result(*index)),
            KernelError::Precondition { operand, .. }
            | KernelError::Unimplemented { operand, .. } => Some(*operand),
            KernelError::PlannerInconsistency { .. } => Some(Operand::Opcode),
        }
    }
}
