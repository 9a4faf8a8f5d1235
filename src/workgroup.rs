//! Work-group sizing: thread-block and grid extents for a launch.
//!
//! Launch axes run columns, rows, layers. Element-wise launches add a
//! tensor-element axis; a 3-D element-wise field folds it into the
//! layer axis, since launches have at most three axes.

use std::fmt;

use tracing::warn;

use crate::addressing::AddressingMode;
use crate::config::SynthConfig;
use crate::types::FieldType;

/// Externally planned per-pass launch dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkDimensions {
    pub global: Vec<usize>,
    pub local: Vec<usize>,
    /// Independent transforms executed by one launch.
    pub batch: usize,
}

/// Block and grid extents of one kernel launch.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkGroup {
    /// Threads per block, per axis.
    pub local: Vec<usize>,
    /// Total threads per axis; a multiple of `local`.
    pub global: Vec<usize>,
    /// Logical extent each axis must cover; threads past it idle.
    pub extent: Vec<usize>,
}

impl WorkGroup {
    /// Size a launch covering `field` once per point (or per element
    /// in element-wise mode).
    pub fn for_field(
        field: &FieldType,
        mode: AddressingMode,
        requested: Option<&[usize]>,
        config: &SynthConfig,
    ) -> Self {
        let extent = launch_extent(field, mode);
        let spatial = field.dimensions().max(1);
        let mut local: Vec<usize> = match requested {
            Some(block) => block.to_vec(),
            None => config.default_block(spatial),
        };
        local.resize(extent.len(), 1);
        if field.dimensions() == 0 {
            // A single point: one thread per launched element.
            for (l, &e) in local.iter_mut().zip(&extent) {
                *l = (*l).min(e);
            }
        }
        let local = clamp_block(local, config);
        let global = extent
            .iter()
            .zip(&local)
            .map(|(&e, &l)| round_up(e, l))
            .collect();
        Self {
            local,
            global,
            extent,
        }
    }

    /// Take planner-supplied dimensions verbatim.
    pub fn from_dimensions(dims: &WorkDimensions) -> Self {
        Self {
            local: dims.local.clone(),
            global: dims.global.clone(),
            extent: dims.global.clone(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.local.len()
    }

    pub fn threads_per_block(&self) -> usize {
        self.local.iter().product()
    }

    /// Blocks per axis.
    pub fn groups(&self) -> Vec<usize> {
        self.global
            .iter()
            .zip(&self.local)
            .map(|(&g, &l)| g / l.max(1))
            .collect()
    }

    pub fn total_threads(&self) -> usize {
        self.global.iter().product()
    }
}

impl fmt::Display for WorkGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |v: &[usize]| {
            v.iter()
                .map(|x| x.to_string())
                .collect::<Vec<_>>()
                .join("x")
        };
        write!(
            f,
            "block {} grid {} (global {})",
            join(&self.local),
            join(&self.groups()),
            join(&self.global)
        )
    }
}

/// Thread extents per axis before padding.
pub fn launch_extent(field: &FieldType, mode: AddressingMode) -> Vec<usize> {
    let mut extent = field.shape.launch_order();
    if mode.has_element_axis() && field.points() > 1 {
        if extent.len() == 3 {
            extent[2] *= field.points();
        } else {
            extent.push(field.points());
        }
    }
    if extent.is_empty() {
        extent.push(1);
    }
    extent
}

/// Round `value` up to a multiple of `multiple`.
pub fn round_up(value: usize, multiple: usize) -> usize {
    if multiple == 0 {
        return value;
    }
    value.div_ceil(multiple) * multiple
}

fn clamp_block(mut local: Vec<usize>, config: &SynthConfig) -> Vec<usize> {
    let requested = local.clone();
    for (axis, extent) in local.iter_mut().enumerate() {
        let max = config.max_block.get(axis).copied().unwrap_or(1);
        *extent = (*extent).clamp(1, max);
    }
    while local.iter().product::<usize>() > config.max_threads_per_block {
        let (axis, _) = local
            .iter()
            .enumerate()
            .max_by_key(|&(_, e)| *e)
            .unwrap_or((0, &1));
        if local[axis] <= 1 {
            break;
        }
        local[axis] /= 2;
    }
    if local != requested {
        warn!(
            requested = ?requested,
            clamped = ?local,
            max_threads = config.max_threads_per_block,
            "block shape clamped"
        );
    }
    local
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_tensor_2d() {
        let cfg = SynthConfig::default();
        let field = FieldType::scalar(&[8, 20]);
        let wg = WorkGroup::for_field(&field, AddressingMode::SmallTensor, None, &cfg);
        assert_eq!(wg.local, vec![16, 16]);
        assert_eq!(wg.extent, vec![20, 8]);
        assert_eq!(wg.global, vec![32, 16]);
        assert_eq!(wg.groups(), vec![2, 1]);
    }

    #[test]
    fn test_element_wise_adds_tensor_axis() {
        let cfg = SynthConfig::default();
        let field = FieldType::matrix(&[16, 16], 3, 3);
        let wg = WorkGroup::for_field(&field, AddressingMode::ElementWise, None, &cfg);
        assert_eq!(wg.extent, vec![16, 16, 9]);
        assert_eq!(wg.local, vec![16, 16, 1]);
        assert_eq!(wg.global, vec![16, 16, 9]);

        let volume = FieldType::vector(&[2, 4, 4], 5);
        let wg = WorkGroup::for_field(&volume, AddressingMode::ElementWise, None, &cfg);
        assert_eq!(wg.extent, vec![4, 4, 10]);
    }

    #[test]
    fn test_zero_dimensional() {
        let cfg = SynthConfig::default();
        let point = FieldType::new(
            crate::types::FieldShape::point(),
            crate::types::TensorShape::vector(6),
            crate::types::ElementType::Float32,
        );
        let wg = WorkGroup::for_field(&point, AddressingMode::ElementWise, None, &cfg);
        assert_eq!(wg.extent, vec![6]);
        assert_eq!(wg.local, vec![6]);
        assert_eq!(wg.global, vec![6]);
        let wg = WorkGroup::for_field(&point, AddressingMode::SmallTensor, None, &cfg);
        assert_eq!(wg.extent, vec![1]);
        assert_eq!(wg.local, vec![1]);
        assert_eq!(wg.global, vec![1]);
        assert_eq!(wg.total_threads(), 1);
    }

    #[test]
    fn test_requested_block_is_clamped() {
        let cfg = SynthConfig::default();
        let field = FieldType::scalar(&[64, 64]);
        let wg = WorkGroup::for_field(&field, AddressingMode::SmallTensor, Some(&[64, 64]), &cfg);
        assert_eq!(wg.threads_per_block(), 256);
        assert!(wg.local.iter().all(|&l| l <= 256));
        assert_eq!(wg.global, vec![64, 64]);
    }

    #[test]
    fn test_from_dimensions_verbatim() {
        let dims = WorkDimensions {
            global: vec![8, 4],
            local: vec![8, 1],
            batch: 4,
        };
        let wg = WorkGroup::from_dimensions(&dims);
        assert_eq!(wg.global, vec![8, 4]);
        assert_eq!(wg.local, vec![8, 1]);
        assert_eq!(wg.groups(), vec![1, 4]);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(20, 16), 32);
        assert_eq!(round_up(32, 16), 32);
        assert_eq!(round_up(1, 256), 256);
    }
}
