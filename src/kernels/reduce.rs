//! Reduction of every tensor element at a point to one scalar.

use crate::addressing::{best_addressing_mode, AddressingMode};
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::{Opcode, ReduceOp};
use crate::types::{FieldType, TensorShape};
use crate::workgroup::WorkGroup;

use super::{guarded, require_real};

pub(crate) const NAME: &str = "tensor_reduce";

pub(crate) struct ReduceKernel;

fn combine(function: ReduceOp, acc: &str, x: &str) -> String {
    match function {
        ReduceOp::Sum => format!("{} + {}", acc, x),
        ReduceOp::Max => format!("fmax({}, {})", acc, x),
        ReduceOp::Min => format!("fmin({}, {})", acc, x),
    }
}

impl KernelFamily for ReduceKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = ReduceOp;

    fn accept(opcode: &Opcode) -> Option<ReduceOp> {
        match opcode {
            Opcode::TensorReduce { function } => Some(*function),
            _ => None,
        }
    }

    fn expected_results(
        _function: &ReduceOp,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        let input = inputs[0];
        if input.tensor_order() == 0 {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(0),
                format!("nothing to reduce in a {} field", input.tensor),
            ));
        }
        require_real(NAME, 0, input)?;
        Ok(vec![input.with_tensor(TensorShape::scalar())])
    }

    fn construct(
        function: ReduceOp,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let input = inputs[0].field_type();
        let output = &results[0];
        let mode = best_addressing_mode(&[input], &[output]);
        let points = input.points();

        let mut b = BodyBuilder::new();
        let elements = b.define("TENSOR_POINTS", points);
        // The output is scalar, so element-wise launches carry no
        // element axis and one thread still covers one point.
        guarded(&mut b, output, mode, |b| {
            let first = b.read_element(0, "0");
            b.declare("float", "acc", first);
            b.for_loop("e", "1", elements.as_str(), "1", |b| {
                let x = b.read_element(0, "e");
                b.assign("acc", combine(function, "acc", &x));
            });
            match mode {
                AddressingMode::SmallTensor => b.write(0, "acc"),
                _ => b.write_element(0, "acc", "0"),
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
