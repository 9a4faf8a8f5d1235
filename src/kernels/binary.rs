//! Pointwise two-operand functions, with scalar-tensor and 0-D
//! broadcasting.

use crate::addressing::{best_addressing_mode, AddressingMode, LaneType};
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::{BinaryOp, Opcode};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::{complex_div, complex_mul, guarded};

pub(crate) const NAME: &str = "binary";

pub(crate) struct BinaryKernel;

/// Result type of combining `a` and `b` pointwise, if they are
/// compatible.
pub(crate) fn broadcast(a: &FieldType, b: &FieldType) -> Option<FieldType> {
    if a == b {
        return Some(a.clone());
    }
    if a.element != b.element {
        return None;
    }
    // Scalar-per-point operand over a tensor field of the same shape.
    if a.shape == b.shape {
        return match (a.is_scalar_field(), b.is_scalar_field()) {
            (true, false) => Some(b.clone()),
            (false, true) => Some(a.clone()),
            _ => None,
        };
    }
    // A single 0-D value combined with every point of a field.
    let (point, field) = match (a.dimensions(), b.dimensions()) {
        (0, d) if d > 0 => (a, b),
        (d, 0) if d > 0 => (b, a),
        _ => return None,
    };
    if point.is_scalar_field() || point.tensor == field.tensor {
        Some(field.clone())
    } else {
        None
    }
}

impl KernelFamily for BinaryKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 2;
    type Params = BinaryOp;

    fn accept(opcode: &Opcode) -> Option<BinaryOp> {
        match opcode {
            Opcode::Binary { function } => Some(*function),
            _ => None,
        }
    }

    fn expected_results(
        function: &BinaryOp,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        let (a, b) = (inputs[0], inputs[1]);
        if a.element != b.element {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(1),
                format!("element types differ: {} vs {}", a.element, b.element),
            ));
        }
        let output = broadcast(a, b).ok_or_else(|| {
            KernelError::precondition(
                NAME,
                Operand::Input(1),
                format!("cannot combine {} with {}", a, b),
            )
        })?;
        if output.is_complex() {
            if !output.is_scalar_field() {
                return Err(KernelError::unimplemented(
                    NAME,
                    Operand::Input(0),
                    format!("complex {} fields", output.tensor),
                ));
            }
            if !matches!(
                function,
                BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide
            ) {
                return Err(KernelError::unimplemented(
                    NAME,
                    Operand::Opcode,
                    format!("complex {}", function.name()),
                ));
            }
        }
        Ok(vec![output])
    }

    fn construct(
        function: BinaryOp,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let (a, b) = (inputs[0].field_type(), inputs[1].field_type());
        let output = &results[0];
        let mode = best_addressing_mode(&[a, b], &[output]);
        let ty = mode.value_type(output);

        let mut body = BodyBuilder::new();
        guarded(&mut body, output, mode, |body| {
            let lhs = operand(body, 0, a, output, mode, ty);
            let rhs = operand(body, 1, b, output, mode, ty);
            body.constant(&ty.name(), "a", lhs);
            body.constant(&ty.name(), "b", rhs);
            body.write(0, expression(function, "a", "b", ty, output.is_complex()));
        });

        Kernel::new(
            KernelParts {
                family: NAME,
                opcode: opcode.clone(),
                inputs: inputs.to_vec(),
                outputs: results.to_vec(),
                addressing: mode,
                body: body.finish(),
                work_group: WorkGroup::for_field(output, mode, None, ctx.config),
                pass: None,
            },
            ctx,
        )
    }
}

/// Read input `index` as a value of the output's type.
fn operand(
    b: &mut BodyBuilder,
    index: usize,
    input: &FieldType,
    output: &FieldType,
    mode: AddressingMode,
    ty: LaneType,
) -> String {
    let small = mode == AddressingMode::SmallTensor;
    if input.dimensions() == 0 && output.dimensions() > 0 {
        if input.is_scalar_field() {
            let v = b.read_scalar(index);
            return if input.is_complex() { v } else { ty.splat(&v) };
        }
        return if small {
            b.read_point(index)
        } else {
            b.read_element(index, "_tensorElement")
        };
    }
    if input.is_scalar_field() && !output.is_scalar_field() {
        return if small {
            let v = b.read(index);
            ty.splat(&v)
        } else {
            b.read_element(index, "0")
        };
    }
    b.read(index)
}

pub(crate) fn expression(
    function: BinaryOp,
    a: &str,
    b: &str,
    ty: LaneType,
    complex: bool,
) -> String {
    match function {
        BinaryOp::Add => format!("{} + {}", a, b),
        BinaryOp::Subtract => format!("{} - {}", a, b),
        BinaryOp::Multiply if complex => complex_mul(a, b, ty.lanes()),
        BinaryOp::Multiply => format!("{} * {}", a, b),
        BinaryOp::Divide if complex => complex_div(a, b, ty.lanes()),
        BinaryOp::Divide => format!("{} / {}", a, b),
        BinaryOp::Max => format!("fmax({}, {})", a, b),
        BinaryOp::Min => format!("fmin({}, {})", a, b),
        BinaryOp::Pow => format!("pow({}, {})", a, b),
    }
}
