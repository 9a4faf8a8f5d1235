//! Field type model: the shape and element layout of a grid value.
//!
//! A field is a rectangular grid of 0–3 spatial dimensions whose every
//! point holds a tensor of the same shape (scalar, vector or matrix).
//! `FieldType` is an immutable value compared structurally; the
//! predicates at the bottom of this file are the only inputs the
//! addressing-mode policy looks at.


use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum number of spatial dimensions of a field.
pub const MAX_FIELD_DIMS: usize = 3;
/// Maximum tensor order of a field point.
pub const MAX_TENSOR_ORDER: usize = 2;
/// Widest vector a single small-tensor thread reads or writes.
pub const MAX_SMALL_TENSOR_LANES: usize = 4;

/// Rejected shape construction.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("{kind} shape has {got} dimensions, at most {max} allowed")]
    TooManyDimensions {
        kind: &'static str,
        got: usize,
        max: usize,
    },
    #[error("{kind} shape {extents:?} has a zero extent")]
    ZeroExtent {
        kind: &'static str,
        extents: Vec<usize>,
    },
}

fn check_extents(kind: &'static str, extents: &[usize], max: usize) -> Result<(), ShapeError> {
    if extents.len() > max {
        return Err(ShapeError::TooManyDimensions {
            kind,
            got: extents.len(),
            max,
        });
    }
    if extents.contains(&0) {
        return Err(ShapeError::ZeroExtent {
            kind,
            extents: extents.to_vec(),
        });
    }
    Ok(())
}

// ─── Field Shape ───────────────────────────────────────────────────

/// Spatial extents ordered (layers, rows, columns); 0 to 3 entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct FieldShape(Vec<usize>);

impl FieldShape {
    pub fn try_new(extents: &[usize]) -> Result<Self, ShapeError> {
        check_extents("field", extents, MAX_FIELD_DIMS)?;
        Ok(Self(extents.to_vec()))
    }

    /// # Panics
    /// If `extents` has more than three entries or a zero entry.
    pub fn new(extents: &[usize]) -> Self {
        match Self::try_new(extents) {
            Ok(shape) => shape,
            Err(e) => panic!("{}", e),
        }
    }

    /// The 0-dimensional shape (a single point).
    pub fn point() -> Self {
        Self(Vec::new())
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn extents(&self) -> &[usize] {
        &self.0
    }

    /// Number of spatial points (1 for a 0-D field).
    pub fn points(&self) -> usize {
        self.0.iter().product()
    }

    pub fn layers(&self) -> Option<usize> {
        (self.0.len() == 3).then(|| self.0[0])
    }

    pub fn rows(&self) -> Option<usize> {
        match self.0.len() {
            2 => Some(self.0[0]),
            3 => Some(self.0[1]),
            _ => None,
        }
    }

    pub fn columns(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Extents in launch order: columns first, then rows, then layers.
    pub fn launch_order(&self) -> Vec<usize> {
        self.0.iter().rev().copied().collect()
    }
}

impl TryFrom<Vec<usize>> for FieldShape {
    type Error = ShapeError;

    fn try_from(extents: Vec<usize>) -> Result<Self, Self::Error> {
        Self::try_new(&extents)
    }
}

impl From<FieldShape> for Vec<usize> {
    fn from(shape: FieldShape) -> Self {
        shape.0
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "0D");
        }
        let parts: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join("x"))
    }
}

// ─── Tensor Shape ──────────────────────────────────────────────────

/// Shape of the value stored at each field point; 0 to 2 entries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct TensorShape(Vec<usize>);

impl TensorShape {
    pub fn try_new(extents: &[usize]) -> Result<Self, ShapeError> {
        check_extents("tensor", extents, MAX_TENSOR_ORDER)?;
        Ok(Self(extents.to_vec()))
    }

    /// # Panics
    /// If `extents` has more than two entries or a zero entry.
    pub fn new(extents: &[usize]) -> Self {
        match Self::try_new(extents) {
            Ok(shape) => shape,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn vector(length: usize) -> Self {
        Self::new(&[length])
    }

    pub fn matrix(rows: usize, columns: usize) -> Self {
        Self::new(&[rows, columns])
    }

    /// Tensor order: 0 scalar, 1 vector, 2 matrix.
    pub fn order(&self) -> usize {
        self.0.len()
    }

    pub fn extents(&self) -> &[usize] {
        &self.0
    }

    /// Number of tensor elements per point.
    pub fn points(&self) -> usize {
        self.0.iter().product()
    }
}

impl TryFrom<Vec<usize>> for TensorShape {
    type Error = ShapeError;

    fn try_from(extents: Vec<usize>) -> Result<Self, Self::Error> {
        Self::try_new(&extents)
    }
}

impl From<TensorShape> for Vec<usize> {
    fn from(shape: TensorShape) -> Self {
        shape.0
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [] => write!(f, "scalar"),
            [n] => write!(f, "vector[{}]", n),
            [r, c] => write!(f, "matrix[{}x{}]", r, c),
            _ => write!(f, "tensor{:?}", self.0),
        }
    }
}

// ─── Element Type ──────────────────────────────────────────────────

/// Numeric kind of a tensor element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Float32,
    /// Two float lanes (real, imaginary).
    Complex32,
}

impl ElementType {
    /// Float lanes per element.
    pub fn components(self) -> usize {
        match self {
            ElementType::Float32 => 1,
            ElementType::Complex32 => 2,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, ElementType::Complex32)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Float32 => write!(f, "float32"),
            ElementType::Complex32 => write!(f, "complex32"),
        }
    }
}

// ─── Field Type ────────────────────────────────────────────────────

/// Immutable (shape, tensor shape, element type) triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub shape: FieldShape,
    #[serde(default)]
    pub tensor: TensorShape,
    #[serde(default)]
    pub element: ElementType,
}

impl FieldType {
    pub fn new(shape: FieldShape, tensor: TensorShape, element: ElementType) -> Self {
        Self {
            shape,
            tensor,
            element,
        }
    }

    /// Real scalar field over `extents`.
    pub fn scalar(extents: &[usize]) -> Self {
        Self::new(
            FieldShape::new(extents),
            TensorShape::scalar(),
            ElementType::Float32,
        )
    }

    /// Real vector field over `extents`.
    pub fn vector(extents: &[usize], length: usize) -> Self {
        Self::new(
            FieldShape::new(extents),
            TensorShape::vector(length),
            ElementType::Float32,
        )
    }

    /// Real matrix field over `extents`.
    pub fn matrix(extents: &[usize], rows: usize, columns: usize) -> Self {
        Self::new(
            FieldShape::new(extents),
            TensorShape::matrix(rows, columns),
            ElementType::Float32,
        )
    }

    /// Complex scalar field over `extents`.
    pub fn complex(extents: &[usize]) -> Self {
        Self::new(
            FieldShape::new(extents),
            TensorShape::scalar(),
            ElementType::Complex32,
        )
    }

    pub fn dimensions(&self) -> usize {
        self.shape.dimensions()
    }

    pub fn tensor_order(&self) -> usize {
        self.tensor.order()
    }

    /// Tensor elements per point.
    pub fn points(&self) -> usize {
        self.tensor.points()
    }

    /// Float lanes per point.
    pub fn lanes(&self) -> usize {
        self.tensor.points() * self.element.components()
    }

    /// Same shape, complex elements.
    pub fn to_complex(&self) -> Self {
        Self {
            element: ElementType::Complex32,
            ..self.clone()
        }
    }

    /// Same shape, real elements.
    pub fn to_real(&self) -> Self {
        Self {
            element: ElementType::Float32,
            ..self.clone()
        }
    }

    /// Same layout with a new spatial shape.
    pub fn with_shape(&self, shape: FieldShape) -> Self {
        Self {
            shape,
            ..self.clone()
        }
    }

    /// Same spatial shape with a new tensor shape.
    pub fn with_tensor(&self, tensor: TensorShape) -> Self {
        Self {
            tensor,
            ..self.clone()
        }
    }

    // ── Predicates ──

    pub fn is_scalar_field(&self) -> bool {
        self.tensor.order() == 0
    }

    pub fn is_real(&self) -> bool {
        self.element == ElementType::Float32
    }

    pub fn is_complex(&self) -> bool {
        self.element == ElementType::Complex32
    }

    /// Real vector field of 3 or 4 components.
    pub fn is_color_field(&self) -> bool {
        self.element == ElementType::Float32
            && self.tensor.order() == 1
            && matches!(self.tensor.points(), 3 | 4)
    }

    /// A whole point fits in one vector register.
    pub fn is_small_tensor_field(&self) -> bool {
        self.lanes() <= MAX_SMALL_TENSOR_LANES
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.shape, self.tensor, self.element)
    }
}
