//! Wiring planned passes into a chain of physical kernels.
//!
//! Every pass reads the previous pass's output (the first reads the
//! caller's input) and writes the complex form of the input; only the
//! final pass writes the caller's declared result type and applies the
//! scale factor.

use std::sync::Arc;

use super::planner::{FftPass, FftPlan, FftPlanner, PlanKey, MAX_PASSES};
use super::{FftParams, NAME};
use crate::addressing::AddressingMode;
use crate::graph::FieldRef;
use crate::kernel::contract::Context;
use crate::kernel::{Kernel, KernelChain, KernelError, KernelParts, Operand, PassInfo};
use crate::kir::{float_literal, BodyBuilder};
use crate::opcode::{FftDirection, FftRank, Opcode};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

/// The field axis a plan transforms along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    /// Along each row, indexed by column.
    Columns,
    /// Along each column, indexed by row.
    Rows,
}

/// One pass in chain order.
struct Step {
    axis: Axis,
    length: usize,
    lines: usize,
    pass: FftPass,
}

fn axes(rank: FftRank, field: &FieldType) -> Vec<(Axis, usize, usize)> {
    let extents = field.shape.extents();
    match (rank, extents) {
        (FftRank::Two, &[rows, columns]) => {
            vec![(Axis::Columns, columns, rows), (Axis::Rows, rows, columns)]
        }
        (_, &[rows, columns]) => vec![(Axis::Columns, columns, rows)],
        (_, extents) => vec![(Axis::Columns, extents.last().copied().unwrap_or(1), 1)],
    }
}

fn inconsistent(message: String) -> KernelError {
    KernelError::PlannerInconsistency {
        family: NAME,
        message,
    }
}

/// Reject plans this chain cannot wire.
fn check_plan(plan: &FftPlan, length: usize) -> Result<(), KernelError> {
    if plan.passes.is_empty() || plan.passes.len() > MAX_PASSES {
        return Err(inconsistent(format!(
            "{} passes for length {} (expected 1 to {})",
            plan.passes.len(),
            length,
            MAX_PASSES
        )));
    }
    let mut stride = 1;
    for pass in &plan.passes {
        if pass.stride != stride {
            return Err(inconsistent(format!(
                "pass stride {} where {} was expected",
                pass.stride, stride
            )));
        }
        if pass.dims.global.first().copied() != Some(length / pass.radix.max(1)) {
            return Err(inconsistent(format!(
                "radix-{} pass launches {:?} threads for length {}",
                pass.radix, pass.dims.global, length
            )));
        }
        stride *= pass.radix;
    }
    if stride != length {
        return Err(inconsistent(format!(
            "radices multiply to {}, not the length {}",
            stride, length
        )));
    }
    Ok(())
}

pub(crate) fn build(
    params: &FftParams,
    opcode: &Opcode,
    input: &FieldRef,
    result: &FieldType,
    ctx: &Context<'_>,
    planner: &dyn FftPlanner,
) -> Result<KernelChain, KernelError> {
    let field = input.field_type();
    let mut steps = Vec::new();
    for (axis, length, lines) in axes(params.rank, field) {
        let key = PlanKey {
            length,
            lines,
            planes: field.points(),
            max_threads: ctx.config.max_threads_per_block,
            inverse: params.direction.is_inverse(),
        };
        let plan: Arc<FftPlan> = planner
            .plan(&key)
            .map_err(|e| KernelError::unimplemented(NAME, Operand::Opcode, e.to_string()))?;
        check_plan(&plan, length)?;
        steps.extend(plan.passes.iter().cloned().map(|pass| Step {
            axis,
            length,
            lines,
            pass,
        }));
    }

    let wiring = Wiring {
        params,
        opcode,
        input,
        result,
        intermediate: field.to_complex(),
        steps: &steps,
        ctx,
    };
    let mut passes = Vec::with_capacity(steps.len());
    wiring.link(steps.len() - 1, &mut passes);
    Ok(KernelChain::new(passes))
}

struct Wiring<'a> {
    params: &'a FftParams,
    opcode: &'a Opcode,
    input: &'a FieldRef,
    result: &'a FieldType,
    intermediate: FieldType,
    steps: &'a [Step],
    ctx: &'a Context<'a>,
}

impl Wiring<'_> {
    /// Build pass `index` after everything it consumes.
    fn link(&self, index: usize, passes: &mut Vec<Kernel>) {
        let source = if index == 0 {
            self.input.clone()
        } else {
            self.link(index - 1, passes);
            FieldRef::pass_output(index - 1, 0, self.intermediate.clone())
        };
        passes.push(self.pass_kernel(index, source));
    }

    fn pass_kernel(&self, index: usize, source: FieldRef) -> Kernel {
        let step = &self.steps[index];
        let count = self.steps.len();
        let last = index + 1 == count;
        let output = if last {
            self.result.clone()
        } else {
            self.intermediate.clone()
        };
        let two_d = self.input.field_type().dimensions() == 2;
        let planes = self.input.field_type().points();

        let mut b = BodyBuilder::new();
        let radix = b.define("RADIX", step.pass.radix);
        b.define("STRIDE", step.pass.stride);
        let length = b.define("LENGTH", step.length);
        b.define("SIGN", if self.params.direction.is_inverse() { "1.0f" } else { "-1.0f" });
        let scale = (last && self.params.scale != 1.0)
            .then(|| b.define("SCALE", float_literal(self.params.scale)));

        let mut axis = 1;
        let mut launch_index = |used: bool| {
            if used {
                let expr = format!("get_global_id({})", axis);
                axis += 1;
                expr
            } else {
                "0".to_string()
            }
        };
        let line = launch_index(step.lines > 1);
        let plane = launch_index(planes > 1);
        b.constant("int", "j", "get_global_id(0)");
        b.constant("int", "line", line);
        b.constant("int", "plane", plane);
        b.private_array("float2", "v", radix.as_str());
        b.private_array("float2", "u", radix.as_str());

        let place = |b: &mut BodyBuilder, position: String| match step.axis {
            Axis::Columns => {
                b.assign("column", position);
                if two_d {
                    b.assign("row", "line");
                }
            }
            Axis::Rows => {
                b.assign("row", position);
                b.assign("column", "line");
            }
        };

        let real_input = index == 0 && source.field_type().is_real();
        b.for_loop("r", "0", radix.as_str(), "1", |b| {
            place(b, format!("j + r * ({} / {})", length, radix));
            let read = b.read_element_nonlocal(0, "plane");
            let value = if real_input {
                format!("(float2)({}, 0.0f)", read)
            } else {
                read
            };
            b.assign("v[r]", value);
        });
        b.raw(step.pass.source.clone());
        b.constant("int", "base", "(j / STRIDE) * STRIDE * RADIX + j % STRIDE");
        let real_output = last && self.params.direction == FftDirection::InverseReal;
        b.for_loop("m", "0", radix.as_str(), "1", |b| {
            place(b, "base + m * STRIDE".to_string());
            let value = if real_output { "u[m].x" } else { "u[m]" };
            let value = match &scale {
                Some(s) => format!("{} * {}", value, s),
                None => value.to_string(),
            };
            b.write_element_nonlocal(0, value, "plane");
        });

        Kernel::new(
            KernelParts {
                family: NAME,
                opcode: self.opcode.clone(),
                inputs: vec![source],
                outputs: vec![output],
                addressing: AddressingMode::BigTensor,
                body: b.finish(),
                work_group: WorkGroup::from_dimensions(&step.pass.dims),
                pass: Some(PassInfo { index, count }),
            },
            self.ctx,
        )
    }
}
