//! Frequency-domain transforms compiled into multi-pass kernel chains.
//!
//! A transform follows the same factory discipline as the single-kernel
//! families, but its body comes from a planner: each pass is one
//! physical kernel whose geometry and butterfly text the planner
//! supplies. The planner is an explicit collaborator so callers and
//! tests can substitute their own.

mod cache;
mod chain;
mod planner;
#[cfg(test)]
mod tests;

pub use cache::PlanCache;
pub use planner::{
    split_radices, FftPass, FftPlan, FftPlanner, PlanError, PlanKey, RadixPlanner, MAX_PASSES,
};

use tracing::debug;

use crate::graph::FieldRef;
use crate::kernel::contract::{check_input_count, check_results, Context};
use crate::kernel::{KernelChain, KernelError, Operand};
use crate::kernels::require_dims;
use crate::opcode::{FftDirection, FftRank, Opcode};
use crate::types::FieldType;

pub(crate) const NAME: &str = "fft";

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FftParams {
    pub(crate) rank: FftRank,
    pub(crate) direction: FftDirection,
    pub(crate) scale: f32,
}

fn accept(opcode: &Opcode) -> Result<FftParams, KernelError> {
    match opcode {
        Opcode::Fft {
            rank,
            direction,
            scale,
        } => Ok(FftParams {
            rank: *rank,
            direction: *direction,
            scale: *scale,
        }),
        _ => Err(KernelError::UnsupportedOpcode {
            family: NAME,
            opcode: opcode.to_string(),
        }),
    }
}

/// Extents the transform runs along.
fn transform_lengths(rank: FftRank, input: &FieldType) -> Vec<usize> {
    let extents = input.shape.extents();
    match rank {
        FftRank::One => extents.last().copied().into_iter().collect(),
        FftRank::Two => extents.to_vec(),
    }
}

fn expected_for(params: &FftParams, input: &FieldType) -> Result<FieldType, KernelError> {
    match params.rank {
        FftRank::One => require_dims(NAME, 0, input, &[1, 2])?,
        FftRank::Two => require_dims(NAME, 0, input, &[2])?,
    }
    if input.tensor_order() > 1 {
        return Err(KernelError::unimplemented(
            NAME,
            Operand::Input(0),
            format!("transforms of {} fields", input.tensor),
        ));
    }
    for length in transform_lengths(params.rank, input) {
        if length < 2 || !length.is_power_of_two() {
            return Err(KernelError::unimplemented(
                NAME,
                Operand::Input(0),
                format!("transform length {} (powers of two only)", length),
            ));
        }
    }
    if params.direction.is_inverse() && !input.is_complex() {
        return Err(KernelError::precondition(
            NAME,
            Operand::Input(0),
            format!("inverse transform needs complex elements, got {}", input.element),
        ));
    }
    Ok(match params.direction {
        FftDirection::InverseReal => input.to_real(),
        FftDirection::Forward | FftDirection::Inverse => input.to_complex(),
    })
}

/// What a transform of `inputs` produces, without planning anything.
pub(crate) fn expected_results(
    opcode: &Opcode,
    inputs: &[&FieldType],
) -> Result<Vec<FieldType>, KernelError> {
    let params = accept(opcode)?;
    check_input_count(NAME, 1, inputs.len())?;
    Ok(vec![expected_for(&params, inputs[0])?])
}

/// Validate a transform request and compile it into its pass chain.
pub(crate) fn synthesize(
    opcode: &Opcode,
    inputs: &[FieldRef],
    results: &[FieldType],
    ctx: &Context<'_>,
    planner: &dyn FftPlanner,
) -> Result<KernelChain, KernelError> {
    let params = accept(opcode)?;
    check_input_count(NAME, 1, inputs.len())?;
    let input = &inputs[0];
    let expected = expected_for(&params, input.field_type())?;
    check_results(NAME, std::slice::from_ref(&expected), results)?;

    let chain = chain::build(&params, opcode, input, &expected, ctx, planner)?;
    debug!(
        family = NAME,
        passes = chain.len(),
        output = %expected,
        "transform chain constructed"
    );
    Ok(chain)
}
