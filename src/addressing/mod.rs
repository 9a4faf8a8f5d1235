//! Addressing/threading model: how threads map onto field data.
//!
//! Three mutually exclusive modes, chosen once per kernel. The mode
//! fixes which read/write primitives a body may use and what value
//! type a single read yields.


use std::fmt;

use crate::kir::{ReadKind, WriteKind};
use crate::types::{FieldType, MAX_SMALL_TENSOR_LANES};

/// Thread-to-data mapping strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// One thread per (spatial point, tensor element).
    ElementWise,
    /// One thread per spatial point, whole tensor in one vector value.
    SmallTensor,
    /// One thread per spatial point producing several single-element
    /// writes inside an unrolled loop.
    BigTensor,
}

impl AddressingMode {
    pub fn allows_read(self, kind: ReadKind) -> bool {
        match self {
            AddressingMode::SmallTensor => true,
            AddressingMode::ElementWise => !matches!(kind, ReadKind::Point0D),
            AddressingMode::BigTensor => !matches!(
                kind,
                ReadKind::Local | ReadKind::Nonlocal | ReadKind::Point0D
            ),
        }
    }

    pub fn allows_write(self, kind: WriteKind) -> bool {
        match self {
            AddressingMode::SmallTensor => kind.is_whole(),
            AddressingMode::ElementWise => true,
            AddressingMode::BigTensor => !kind.is_whole(),
        }
    }

    /// Kernels in this mode may be fused with neighbouring kernels.
    pub fn is_fusable(self) -> bool {
        matches!(self, AddressingMode::SmallTensor)
    }

    /// Whether the launch carries an extra tensor-element axis.
    pub fn has_element_axis(self) -> bool {
        matches!(self, AddressingMode::ElementWise)
    }

    /// Implicit per-thread coordinates for a field of `dims` spatial
    /// dimensions, outermost first.
    pub fn implicit_coordinates(self, dims: usize) -> Vec<&'static str> {
        let mut coords: Vec<&'static str> = match dims {
            0 => Vec::new(),
            1 => vec!["_column"],
            2 => vec!["_row", "_column"],
            _ => vec!["_layer", "_row", "_column"],
        };
        if self.has_element_axis() {
            coords.push("_tensorElement");
        }
        coords
    }

    /// Type of one read of `field` in this mode.
    pub fn value_type(self, field: &FieldType) -> LaneType {
        match self {
            AddressingMode::SmallTensor => LaneType::new(field.lanes()),
            AddressingMode::ElementWise | AddressingMode::BigTensor => {
                LaneType::new(field.element.components())
            }
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressingMode::ElementWise => "element-wise",
            AddressingMode::SmallTensor => "small-tensor",
            AddressingMode::BigTensor => "big-tensor",
        };
        write!(f, "{}", name)
    }
}

/// The best legal mode for a kernel reading `inputs` and writing
/// `outputs`. Big-tensor addressing is never inferred.
pub fn best_addressing_mode(inputs: &[&FieldType], outputs: &[&FieldType]) -> AddressingMode {
    let all_small = inputs
        .iter()
        .chain(outputs.iter())
        .all(|ty| ty.is_small_tensor_field());
    if all_small {
        AddressingMode::SmallTensor
    } else {
        AddressingMode::ElementWise
    }
}

// ─── Lane Types ────────────────────────────────────────────────────

/// A float vector of 1 to 4 lanes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LaneType {
    lanes: usize,
}

impl LaneType {
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.clamp(1, MAX_SMALL_TENSOR_LANES),
        }
    }

    pub fn scalar() -> Self {
        Self::new(1)
    }

    pub fn lanes(self) -> usize {
        self.lanes
    }

    pub fn name(self) -> String {
        match self.lanes {
            1 => "float".to_string(),
            n => format!("float{}", n),
        }
    }

    /// Zero value of this type.
    pub fn zero(self) -> String {
        self.splat("0.0f")
    }

    /// Broadcast a scalar expression to every lane.
    pub fn splat(self, scalar: &str) -> String {
        match self.lanes {
            1 => scalar.to_string(),
            _ => format!("({})({})", self.name(), scalar),
        }
    }

    /// Bytes one value occupies in local memory. Three-lane vectors are
    /// padded to four.
    pub fn bytes(self) -> usize {
        let slots = if self.lanes == 3 { 4 } else { self.lanes };
        slots * std::mem::size_of::<f32>()
    }
}

impl fmt::Display for LaneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
