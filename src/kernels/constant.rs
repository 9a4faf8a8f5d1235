//! A field combined with a compile-time constant.

use crate::addressing::best_addressing_mode;
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::{float_literal, BodyBuilder};
use crate::opcode::{BinaryOp, Opcode};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::guarded;

pub(crate) const NAME: &str = "constant";

pub(crate) struct ConstantKernel;

impl KernelFamily for ConstantKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = (BinaryOp, f32);

    fn accept(opcode: &Opcode) -> Option<(BinaryOp, f32)> {
        match opcode {
            Opcode::Constant { function, value } => Some((*function, *value)),
            _ => None,
        }
    }

    fn expected_results(
        params: &(BinaryOp, f32),
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        let input = inputs[0];
        if input.is_complex() {
            if !input.is_scalar_field() {
                return Err(KernelError::unimplemented(
                    NAME,
                    Operand::Input(0),
                    format!("complex {} fields", input.tensor),
                ));
            }
            if !matches!(params.0, BinaryOp::Multiply | BinaryOp::Divide) {
                return Err(KernelError::unimplemented(
                    NAME,
                    Operand::Opcode,
                    format!("complex {} with a real constant", params.0.name()),
                ));
            }
        }
        Ok(vec![input.clone()])
    }

    fn construct(
        (function, value): (BinaryOp, f32),
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let input = inputs[0].field_type();
        let output = &results[0];
        let mode = best_addressing_mode(&[input], &[output]);
        let ty = mode.value_type(input);

        let mut b = BodyBuilder::new();
        let c = b.define("CONSTANT_VALUE", float_literal(value));
        guarded(&mut b, output, mode, |b| {
            let x = b.read(0);
            b.constant(&ty.name(), "x", x);
            let value = match function {
                BinaryOp::Add => format!("x + {}", c),
                BinaryOp::Subtract => format!("x - {}", c),
                BinaryOp::Multiply => format!("x * {}", c),
                BinaryOp::Divide => format!("x / {}", c),
                BinaryOp::Max => format!("fmax(x, {})", c),
                BinaryOp::Min => format!("fmin(x, {})", c),
                BinaryOp::Pow => format!("pow(x, {})", ty.splat(&c)),
            };
            b.write(0, value);
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
