//! Operation tags: the closed set of computations a kernel can perform.
//!
//! Each variant carries the immutable parameters of its operation.
//! Kernel families accept a fixed subset of tags; the factory rejects
//! the rest before any code is generated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::border::BorderPolicy;

/// Pointwise single-input functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Negate,
    Abs,
    Exp,
    Log,
    Sqrt,
    Square,
    Reciprocal,
    Sin,
    Cos,
    Tanh,
    Floor,
    /// Replace NaN and infinities by zero.
    Sanitize,
    RealPart,
    ImaginaryPart,
    Magnitude,
    Phase,
    ToComplex,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "negate",
            UnaryOp::Abs => "abs",
            UnaryOp::Exp => "exp",
            UnaryOp::Log => "log",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Square => "square",
            UnaryOp::Reciprocal => "reciprocal",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Floor => "floor",
            UnaryOp::Sanitize => "sanitize",
            UnaryOp::RealPart => "real_part",
            UnaryOp::ImaginaryPart => "imaginary_part",
            UnaryOp::Magnitude => "magnitude",
            UnaryOp::Phase => "phase",
            UnaryOp::ToComplex => "to_complex",
        }
    }
}

/// Pointwise two-operand functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Max,
    Min,
    Pow,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::Pow => "pow",
        }
    }
}

/// Reductions over the tensor elements of each point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    pub fn name(self) -> &'static str {
        match self {
            ReduceOp::Sum => "sum",
            ReduceOp::Max => "max",
            ReduceOp::Min => "min",
        }
    }
}

/// Which axes a filter spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAxis {
    /// 1D filter applied along each row (horizontal halo).
    Rows,
    /// 1D filter applied along each column (vertical halo).
    Columns,
    /// Square 2D filter.
    Both,
}

impl fmt::Display for FilterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterAxis::Rows => "rows",
            FilterAxis::Columns => "columns",
            FilterAxis::Both => "both",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftRank {
    One,
    Two,
}

impl FftRank {
    pub fn dimensions(self) -> usize {
        match self {
            FftRank::One => 1,
            FftRank::Two => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FftDirection {
    Forward,
    Inverse,
    /// Inverse transform keeping only the real part of the result.
    InverseReal,
}

impl FftDirection {
    pub fn is_inverse(self) -> bool {
        !matches!(self, FftDirection::Forward)
    }
}

impl fmt::Display for FftDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FftDirection::Forward => "forward",
            FftDirection::Inverse => "inverse",
            FftDirection::InverseReal => "inverse_real",
        };
        write!(f, "{}", name)
    }
}

fn default_scale() -> f32 {
    1.0
}

/// The requested computation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Opcode {
    Unary {
        function: UnaryOp,
    },
    Binary {
        function: BinaryOp,
    },
    /// `field <function> value`.
    Constant {
        function: BinaryOp,
        value: f32,
    },
    /// `out(p) = in(p - offsets)`, one offset per spatial dimension.
    Shift {
        offsets: Vec<i64>,
        #[serde(default)]
        border: BorderPolicy,
    },
    Convolve {
        axis: FilterAxis,
        #[serde(default)]
        border: BorderPolicy,
    },
    CrossCorrelate {
        axis: FilterAxis,
        #[serde(default)]
        border: BorderPolicy,
    },
    /// Keep a point only if it exceeds all 8 neighbors.
    NonMaximumSuppression {
        #[serde(default)]
        border: BorderPolicy,
    },
    Transpose,
    TensorReduce {
        function: ReduceOp,
    },
    Fft {
        rank: FftRank,
        direction: FftDirection,
        #[serde(default = "default_scale")]
        scale: f32,
    },
}

impl Opcode {
    pub fn unary(function: UnaryOp) -> Self {
        Opcode::Unary { function }
    }

    pub fn binary(function: BinaryOp) -> Self {
        Opcode::Binary { function }
    }

    pub fn constant(function: BinaryOp, value: f32) -> Self {
        Opcode::Constant { function, value }
    }

    /// Short tag name, as used in kernel names and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Opcode::Unary { .. } => "unary",
            Opcode::Binary { .. } => "binary",
            Opcode::Constant { .. } => "constant",
            Opcode::Shift { .. } => "shift",
            Opcode::Convolve { .. } => "convolve",
            Opcode::CrossCorrelate { .. } => "cross_correlate",
            Opcode::NonMaximumSuppression { .. } => "non_maximum_suppression",
            Opcode::Transpose => "transpose",
            Opcode::TensorReduce { .. } => "tensor_reduce",
            Opcode::Fft { .. } => "fft",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Unary { function } => write!(f, "{}", function.name()),
            Opcode::Binary { function } => write!(f, "{}", function.name()),
            Opcode::Constant { function, value } => {
                write!(f, "{}_constant({})", function.name(), value)
            }
            Opcode::Shift { offsets, border } => write!(f, "shift({:?}, {})", offsets, border),
            Opcode::Convolve { axis, border } => write!(f, "convolve({}, {})", axis, border),
            Opcode::CrossCorrelate { axis, border } => {
                write!(f, "cross_correlate({}, {})", axis, border)
            }
            Opcode::NonMaximumSuppression { border } => {
                write!(f, "non_maximum_suppression({})", border)
            }
            Opcode::Transpose => write!(f, "transpose"),
            Opcode::TensorReduce { function } => write!(f, "tensor_{}", function.name()),
            Opcode::Fft {
                rank,
                direction,
                scale,
            } => write!(
                f,
                "fft{}d({}, scale {})",
                rank.dimensions(),
                direction,
                scale
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Opcode::constant(BinaryOp::Add, 2.0).to_string(), "add_constant(2)");
        assert_eq!(
            Opcode::Shift {
                offsets: vec![1, -2],
                border: BorderPolicy::Cyclic
            }
            .to_string(),
            "shift([1, -2], cyclic)"
        );
        assert_eq!(
            Opcode::Fft {
                rank: FftRank::Two,
                direction: FftDirection::Inverse,
                scale: 0.5
            }
            .to_string(),
            "fft2d(inverse, scale 0.5)"
        );
    }

    #[test]
    fn test_deserialize_tagged() {
        let op: Opcode = toml::from_str("op = \"convolve\"\naxis = \"rows\"").unwrap();
        assert_eq!(
            op,
            Opcode::Convolve {
                axis: FilterAxis::Rows,
                border: BorderPolicy::Zero
            }
        );

        let op: Opcode = toml::from_str("op = \"transpose\"").unwrap();
        assert_eq!(op, Opcode::Transpose);

        let op: Opcode =
            toml::from_str("op = \"fft\"\nrank = \"one\"\ndirection = \"forward\"").unwrap();
        assert_eq!(
            op,
            Opcode::Fft {
                rank: FftRank::One,
                direction: FftDirection::Forward,
                scale: 1.0
            }
        );
    }

    #[test]
    fn test_tags_are_distinct() {
        let ops = [
            Opcode::unary(UnaryOp::Exp),
            Opcode::binary(BinaryOp::Add),
            Opcode::constant(BinaryOp::Add, 1.0),
            Opcode::Transpose,
            Opcode::TensorReduce {
                function: ReduceOp::Sum,
            },
        ];
        let mut tags: Vec<&str> = ops.iter().map(|o| o.tag()).collect();
        tags.dedup();
        assert_eq!(tags.len(), ops.len());
    }
}
