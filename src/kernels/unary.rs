//! Pointwise single-input functions.

use crate::addressing::{best_addressing_mode, LaneType};
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::{Opcode, UnaryOp};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::{complex_mul, guarded, require_real};

pub(crate) const NAME: &str = "unary";

pub(crate) struct UnaryKernel;

fn needs_complex(function: UnaryOp) -> bool {
    matches!(
        function,
        UnaryOp::RealPart | UnaryOp::ImaginaryPart | UnaryOp::Magnitude | UnaryOp::Phase
    )
}

impl KernelFamily for UnaryKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = UnaryOp;

    fn accept(opcode: &Opcode) -> Option<UnaryOp> {
        match opcode {
            Opcode::Unary { function } => Some(*function),
            _ => None,
        }
    }

    fn expected_results(
        function: &UnaryOp,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        let input = inputs[0];
        let output = if needs_complex(*function) {
            if !input.is_complex() {
                return Err(KernelError::precondition(
                    NAME,
                    Operand::Input(0),
                    format!("{} needs complex elements, got {}", function.name(), input.element),
                ));
            }
            input.to_real()
        } else if *function == UnaryOp::ToComplex {
            if input.is_complex() {
                return Err(KernelError::precondition(
                    NAME,
                    Operand::Input(0),
                    "to_complex needs real elements, got complex32",
                ));
            }
            input.to_complex()
        } else if matches!(function, UnaryOp::Negate | UnaryOp::Square) {
            input.clone()
        } else {
            require_real(NAME, 0, input)?;
            input.clone()
        };
        Ok(vec![output])
    }

    fn construct(
        function: UnaryOp,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let input = inputs[0].field_type();
        let output = &results[0];
        let mode = best_addressing_mode(&[input], &[output]);
        let in_ty = mode.value_type(input);

        let mut b = BodyBuilder::new();
        guarded(&mut b, output, mode, |b| {
            let x = b.read(0);
            b.constant(&in_ty.name(), "x", x);
            b.write(0, expression(function, "x", in_ty, input.is_complex()));
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

/// Kernel expression computing `function` of `x`, a value of type `ty`.
pub(crate) fn expression(function: UnaryOp, x: &str, ty: LaneType, complex: bool) -> String {
    match function {
        UnaryOp::Negate => format!("-{}", x),
        UnaryOp::Abs => format!("fabs({})", x),
        UnaryOp::Exp => format!("exp({})", x),
        UnaryOp::Log => format!("log({})", x),
        UnaryOp::Sqrt => format!("sqrt({})", x),
        UnaryOp::Square if complex => complex_mul(x, x, ty.lanes()),
        UnaryOp::Square => format!("{x} * {x}", x = x),
        UnaryOp::Reciprocal => format!("1.0f / {}", x),
        UnaryOp::Sin => format!("sin({})", x),
        UnaryOp::Cos => format!("cos({})", x),
        UnaryOp::Tanh => format!("tanh({})", x),
        UnaryOp::Floor => format!("floor({})", x),
        UnaryOp::Sanitize => format!(
            "select({x}, {zero}, isnan({x}) | isinf({x}))",
            x = x,
            zero = ty.zero()
        ),
        UnaryOp::RealPart => format!("{}.even", x),
        UnaryOp::ImaginaryPart => format!("{}.odd", x),
        UnaryOp::Magnitude => format!("sqrt({x}.even * {x}.even + {x}.odd * {x}.odd)", x = x),
        UnaryOp::Phase => format!("atan2({x}.odd, {x}.even)", x = x),
        UnaryOp::ToComplex => to_complex(x, ty.lanes()),
    }
}

/// Interleave zero imaginary parts into `lanes` real lanes.
fn to_complex(x: &str, lanes: usize) -> String {
    if lanes == 1 {
        return format!("(float2)({}, 0.0f)", x);
    }
    let parts: Vec<String> = (0..lanes)
        .map(|i| format!("{}.s{}, 0.0f", x, i))
        .collect();
    format!("({})({})", LaneType::new(2 * lanes).name(), parts.join(", "))
}
