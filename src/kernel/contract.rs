//! The factory discipline every kernel family follows.
//!
//! 1. the opcode must be one the family accepts;
//! 2. the expected result types are recomputed from the inputs and
//!    must equal the caller's declared results;
//! 3. family-specific preconditions are checked;
//! 4. only then is the infallible private constructor called.

use tracing::debug;

use super::{Kernel, KernelError};
use crate::config::SynthConfig;
use crate::graph::FieldRef;
use crate::kir::lower::KernelLowering;
use crate::opcode::Opcode;
use crate::types::FieldType;

/// Collaborators shared by every constructor.
pub(crate) struct Context<'a> {
    pub(crate) config: &'a SynthConfig,
    pub(crate) lowering: &'a dyn KernelLowering,
}

pub(crate) trait KernelFamily {
    const NAME: &'static str;
    const INPUTS: usize;

    /// Opcode parameters the family works from.
    type Params;

    fn accept(opcode: &Opcode) -> Option<Self::Params>;

    fn expected_results(
        params: &Self::Params,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError>;

    fn preconditions(
        _params: &Self::Params,
        _inputs: &[&FieldType],
        _ctx: &Context<'_>,
    ) -> Result<(), KernelError> {
        Ok(())
    }

    /// Assemble the kernel. Never fails: everything it relies on was
    /// checked by the preceding steps.
    fn construct(
        params: Self::Params,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel;
}

pub(crate) fn check_input_count(
    family: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), KernelError> {
    if expected != actual {
        return Err(KernelError::InputCount {
            family,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_results(
    family: &'static str,
    expected: &[FieldType],
    actual: &[FieldType],
) -> Result<(), KernelError> {
    if expected.len() != actual.len() {
        return Err(KernelError::ResultCount {
            family,
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    for (index, (e, a)) in expected.iter().zip(actual).enumerate() {
        if e != a {
            return Err(KernelError::ResultTypeMismatch {
                family,
                index,
                expected: e.clone(),
                actual: a.clone(),
            });
        }
    }
    Ok(())
}

/// What `F` would produce for `inputs`, without building anything.
pub(crate) fn expected<F: KernelFamily>(
    opcode: &Opcode,
    inputs: &[&FieldType],
) -> Result<Vec<FieldType>, KernelError> {
    let params = F::accept(opcode).ok_or_else(|| KernelError::UnsupportedOpcode {
        family: F::NAME,
        opcode: opcode.to_string(),
    })?;
    check_input_count(F::NAME, F::INPUTS, inputs.len())?;
    F::expected_results(&params, inputs)
}

pub(crate) fn build<F: KernelFamily>(
    opcode: &Opcode,
    inputs: &[FieldRef],
    results: &[FieldType],
    ctx: &Context<'_>,
) -> Result<Kernel, KernelError> {
    let params = F::accept(opcode).ok_or_else(|| KernelError::UnsupportedOpcode {
        family: F::NAME,
        opcode: opcode.to_string(),
    })?;
    check_input_count(F::NAME, F::INPUTS, inputs.len())?;

    let types: Vec<&FieldType> = inputs.iter().map(|r| r.field_type()).collect();
    let expected = F::expected_results(&params, &types)?;
    check_results(F::NAME, &expected, results)?;

    F::preconditions(&params, &types, ctx)?;

    let kernel = F::construct(params, opcode, inputs, results, ctx);
    debug!(
        family = F::NAME,
        kernel = kernel.name(),
        mode = %kernel.addressing(),
        block = ?kernel.geometry().work_group.local,
        "kernel constructed"
    );
    Ok(kernel)
}
