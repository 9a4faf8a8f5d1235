//! Kernel families: one code-generation strategy and factory contract
//! per group of related operations.
//!
//! Every family implements `KernelFamily` and is built through
//! `contract::build`; the multi-pass transform lives in `crate::fft`.

pub(crate) mod binary;
pub(crate) mod constant;
pub(crate) mod convolve;
pub(crate) mod nms;
pub(crate) mod reduce;
pub(crate) mod shift;
pub(crate) mod transpose;
pub(crate) mod unary;

use std::fmt;

use crate::addressing::AddressingMode;
use crate::border::BorderPolicy;
use crate::kernel::{KernelError, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::Opcode;
use crate::types::FieldType;

/// The kernel family a request is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    Unary,
    Binary,
    Constant,
    Shift,
    Convolve,
    NonMaximumSuppression,
    Transpose,
    Reduce,
    Fft,
}

impl Family {
    /// The family that implements `opcode`.
    pub fn for_opcode(opcode: &Opcode) -> Family {
        match opcode {
            Opcode::Unary { .. } => Family::Unary,
            Opcode::Binary { .. } => Family::Binary,
            Opcode::Constant { .. } => Family::Constant,
            Opcode::Shift { .. } => Family::Shift,
            Opcode::Convolve { .. } | Opcode::CrossCorrelate { .. } => Family::Convolve,
            Opcode::NonMaximumSuppression { .. } => Family::NonMaximumSuppression,
            Opcode::Transpose => Family::Transpose,
            Opcode::TensorReduce { .. } => Family::Reduce,
            Opcode::Fft { .. } => Family::Fft,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Family::Unary => unary::NAME,
            Family::Binary => binary::NAME,
            Family::Constant => constant::NAME,
            Family::Shift => shift::NAME,
            Family::Convolve => convolve::NAME,
            Family::NonMaximumSuppression => nms::NAME,
            Family::Transpose => transpose::NAME,
            Family::Reduce => reduce::NAME,
            Family::Fft => crate::fft::NAME,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ─── Shared Helpers ────────────────────────────────────────────────

/// Condition selecting threads that map onto a point of `field`.
/// A 0-D field without an element axis has no implicit coordinate to
/// test, so only the first launched thread passes.
pub(crate) fn in_bounds(field: &FieldType, mode: AddressingMode) -> String {
    let extents = field.shape.extents();
    let names: &[&str] = match extents.len() {
        0 => &[],
        1 => &["_column"],
        2 => &["_row", "_column"],
        _ => &["_layer", "_row", "_column"],
    };
    let mut terms: Vec<String> = names
        .iter()
        .zip(extents)
        .map(|(name, extent)| format!("{} < {}", name, extent))
        .collect();
    if mode.has_element_axis() && field.points() > 1 {
        terms.push(format!("_tensorElement < {}", field.points()));
    }
    if terms.is_empty() {
        terms.push("get_global_id(0) == 0".to_string());
    }
    terms.join(" && ")
}

/// Run `f` only for threads inside `field`.
pub(crate) fn guarded(
    b: &mut BodyBuilder,
    field: &FieldType,
    mode: AddressingMode,
    f: impl FnOnce(&mut BodyBuilder),
) {
    b.if_then(in_bounds(field, mode), f);
}

/// Reject border policies the shared prologue cannot generate.
pub(crate) fn check_border(family: &'static str, border: BorderPolicy) -> Result<(), KernelError> {
    if border.is_tileable() {
        Ok(())
    } else {
        Err(KernelError::unimplemented(
            family,
            Operand::Opcode,
            format!("{} border", border),
        ))
    }
}

/// Require real (float) elements on input `index`.
pub(crate) fn require_real(
    family: &'static str,
    index: usize,
    field: &FieldType,
) -> Result<(), KernelError> {
    if field.is_real() {
        Ok(())
    } else {
        Err(KernelError::unimplemented(
            family,
            Operand::Input(index),
            format!("{} elements", field.element),
        ))
    }
}

/// Require exactly `dims` spatial dimensions (any of `allowed`).
pub(crate) fn require_dims(
    family: &'static str,
    index: usize,
    field: &FieldType,
    allowed: &[usize],
) -> Result<(), KernelError> {
    if allowed.contains(&field.dimensions()) {
        Ok(())
    } else {
        let expected: Vec<String> = allowed.iter().map(|d| format!("{}-D", d)).collect();
        Err(KernelError::precondition(
            family,
            Operand::Input(index),
            format!(
                "expected a {} field, got {}-D",
                expected.join(" or "),
                field.dimensions()
            ),
        ))
    }
}

/// Complex product of two packed (re, im) vectors of `lanes` floats.
pub(crate) fn complex_mul(a: &str, b: &str, lanes: usize) -> String {
    let ty = crate::addressing::LaneType::new(lanes).name();
    let parts: Vec<String> = (0..lanes / 2)
        .flat_map(|p| {
            let (re, im) = (2 * p, 2 * p + 1);
            [
                format!(
                    "{a}.s{re} * {b}.s{re} - {a}.s{im} * {b}.s{im}",
                    a = a,
                    b = b,
                    re = re,
                    im = im
                ),
                format!(
                    "{a}.s{re} * {b}.s{im} + {a}.s{im} * {b}.s{re}",
                    a = a,
                    b = b,
                    re = re,
                    im = im
                ),
            ]
        })
        .collect();
    format!("({})({})", ty, parts.join(", "))
}

/// Complex quotient of two packed (re, im) vectors of `lanes` floats.
pub(crate) fn complex_div(a: &str, b: &str, lanes: usize) -> String {
    let ty = crate::addressing::LaneType::new(lanes).name();
    let parts: Vec<String> = (0..lanes / 2)
        .flat_map(|p| {
            let (re, im) = (2 * p, 2 * p + 1);
            let norm = format!(
                "({b}.s{re} * {b}.s{re} + {b}.s{im} * {b}.s{im})",
                b = b,
                re = re,
                im = im
            );
            [
                format!(
                    "({a}.s{re} * {b}.s{re} + {a}.s{im} * {b}.s{im}) / {n}",
                    a = a,
                    b = b,
                    re = re,
                    im = im,
                    n = norm
                ),
                format!(
                    "({a}.s{im} * {b}.s{re} - {a}.s{re} * {b}.s{im}) / {n}",
                    a = a,
                    b = b,
                    re = re,
                    im = im,
                    n = norm
                ),
            ]
        })
        .collect();
    format!("({})({})", ty, parts.join(", "))
}
