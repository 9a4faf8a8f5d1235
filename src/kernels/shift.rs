//! Translation by a constant offset: `out(p) = in(p - offset)`.
//!
//! Reads shifted coordinates directly through the scratch variables,
//! resolving out-of-range coordinates with the border policy. No
//! tiling: every thread reads exactly one input point.

use crate::addressing::{best_addressing_mode, AddressingMode};
use crate::border::{self, BorderPolicy};
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::Opcode;
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::{check_border, guarded, require_dims};

pub(crate) const NAME: &str = "shift";

pub(crate) struct ShiftKernel;

pub(crate) struct ShiftParams {
    offsets: Vec<i64>,
    border: BorderPolicy,
}

impl KernelFamily for ShiftKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = ShiftParams;

    fn accept(opcode: &Opcode) -> Option<ShiftParams> {
        match opcode {
            Opcode::Shift { offsets, border } => Some(ShiftParams {
                offsets: offsets.clone(),
                border: *border,
            }),
            _ => None,
        }
    }

    fn expected_results(
        _params: &ShiftParams,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        Ok(vec![inputs[0].clone()])
    }

    fn preconditions(
        params: &ShiftParams,
        inputs: &[&FieldType],
        _ctx: &Context<'_>,
    ) -> Result<(), KernelError> {
        let input = inputs[0];
        require_dims(NAME, 0, input, &[1, 2, 3])?;
        if params.offsets.len() != input.dimensions() {
            return Err(KernelError::precondition(
                NAME,
                Operand::Opcode,
                format!(
                    "{} offsets for a {}-D field",
                    params.offsets.len(),
                    input.dimensions()
                ),
            ));
        }
        check_border(NAME, params.border)
    }

    fn construct(
        params: ShiftParams,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let input = inputs[0].field_type();
        let output = &results[0];
        let mode = best_addressing_mode(&[input], &[output]);
        let ty = mode.value_type(input);

        let scratch: &[&str] = match input.dimensions() {
            1 => &["column"],
            2 => &["row", "column"],
            _ => &["layer", "row", "column"],
        };
        let coords: Vec<(&str, usize)> = scratch
            .iter()
            .copied()
            .zip(input.shape.extents().iter().copied())
            .collect();

        let mut b = BodyBuilder::new();
        guarded(&mut b, output, mode, |b| {
            for (var, offset) in scratch.iter().zip(&params.offsets) {
                b.assign(*var, format!("_{} - ({})", var, offset));
            }
            let read = match mode {
                AddressingMode::SmallTensor => b.read_nonlocal(0),
                _ => b.read_element_nonlocal(0, "_tensorElement"),
            };
            b.declare_uninit(&ty.name(), "v");
            b.extend(border::emit_bordered_read(
                params.border,
                &coords,
                "v",
                &read,
                &ty.zero(),
            ));
            match mode {
                AddressingMode::SmallTensor => b.write(0, "v"),
                _ => b.write_element(0, "v", "_tensorElement"),
            }
        });

        Kernel::new(
            KernelParts {
                family: NAME,
                opcode: opcode.clone(),
                inputs: inputs.to_vec(),
                outputs: results.to_vec(),
                addressing: mode,
                body: b.finish(),
                work_group: WorkGroup::for_field(output, mode, None, ctx.config),
                pass: None,
            },
            ctx,
        )
    }
}
