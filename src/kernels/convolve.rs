//! Tiled convolution and cross-correlation with a filter field.
//!
//! Input 0 is the image, input 1 a real scalar filter field with odd
//! extents (1-D for row/column filters, square 2-D for `both`). The
//! image block plus a halo of half the filter size is cached in local
//! memory before the filter loop runs.

use crate::addressing::{best_addressing_mode, AddressingMode};
use crate::border::BorderPolicy;
use crate::config::SynthConfig;
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::{FilterAxis, Opcode};
use crate::tiling::{emit_tile_load, Halo, TileSource, TileSpec};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::{check_border, guarded, require_dims, require_real};

pub(crate) const NAME: &str = "convolve";

pub(crate) struct ConvolveKernel;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ConvolveParams {
    axis: FilterAxis,
    border: BorderPolicy,
    /// Convolution flips the filter; cross-correlation does not.
    flip: bool,
}

/// (rows, columns) of the filter footprint.
fn footprint(axis: FilterAxis, filter: &FieldType) -> (usize, usize) {
    let extents = filter.shape.extents();
    match axis {
        FilterAxis::Rows => (1, extents[0]),
        FilterAxis::Columns => (extents[0], 1),
        FilterAxis::Both => (extents[0], extents[1]),
    }
}

fn tile_spec(
    params: &ConvolveParams,
    image: &FieldType,
    filter: &FieldType,
    mode: AddressingMode,
    work_group: &WorkGroup,
) -> TileSpec {
    let (rows, columns) = footprint(params.axis, filter);
    let halo = Halo {
        top: rows / 2,
        bottom: rows / 2,
        left: columns / 2,
        right: columns / 2,
    };
    let source = match mode {
        AddressingMode::SmallTensor => TileSource::Whole,
        _ => TileSource::Element("_tensorElement".to_string()),
    };
    TileSpec {
        extents: image.shape.extents().to_vec(),
        block: work_group.local.iter().take(image.dimensions()).copied().collect(),
        halo,
        lane: mode.value_type(image),
        border: params.border,
        source,
    }
}

fn launch(image: &FieldType, config: &SynthConfig) -> (AddressingMode, WorkGroup) {
    let mode = best_addressing_mode(&[image], &[image]);
    (mode, WorkGroup::for_field(image, mode, None, config))
}

impl KernelFamily for ConvolveKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 2;
    type Params = ConvolveParams;

    fn accept(opcode: &Opcode) -> Option<ConvolveParams> {
        match opcode {
            Opcode::Convolve { axis, border } => Some(ConvolveParams {
                axis: *axis,
                border: *border,
                flip: true,
            }),
            Opcode::CrossCorrelate { axis, border } => Some(ConvolveParams {
                axis: *axis,
                border: *border,
                flip: false,
            }),
            _ => None,
        }
    }

    fn expected_results(
        _params: &ConvolveParams,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        Ok(vec![inputs[0].clone()])
    }

    fn preconditions(
        params: &ConvolveParams,
        inputs: &[&FieldType],
        ctx: &Context<'_>,
    ) -> Result<(), KernelError> {
        let (image, filter) = (inputs[0], inputs[1]);
        match params.axis {
            FilterAxis::Rows => require_dims(NAME, 0, image, &[1, 2])?,
            FilterAxis::Columns | FilterAxis::Both => require_dims(NAME, 0, image, &[2])?,
        }
        require_real(NAME, 0, image)?;

        if !filter.is_scalar_field() || !filter.is_real() {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(1),
                format!("filter must be a real scalar field, got {}", filter),
            ));
        }
        let filter_dims = if params.axis == FilterAxis::Both { 2 } else { 1 };
        require_dims(NAME, 1, filter, &[filter_dims])?;
        let extents = filter.shape.extents();
        if extents.iter().any(|e| e % 2 == 0) {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(1),
                format!("filter extents must be odd, got {}", filter.shape),
            ));
        }
        if params.axis == FilterAxis::Both && extents[0] != extents[1] {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(1),
                format!("2-D filter must be square, got {}", filter.shape),
            ));
        }
        check_border(NAME, params.border)?;

        let (mode, work_group) = launch(image, ctx.config);
        let spec = tile_spec(params, image, filter, mode, &work_group);
        if spec.bytes() > ctx.config.local_memory_bytes {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(0),
                format!(
                    "tile needs {} bytes of local memory, {} available",
                    spec.bytes(),
                    ctx.config.local_memory_bytes
                ),
            ));
        }
        Ok(())
    }

    fn construct(
        params: ConvolveParams,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let image = inputs[0].field_type();
        let filter = inputs[1].field_type();
        let output = &results[0];
        let (mode, work_group) = launch(image, ctx.config);
        let spec = tile_spec(&params, image, filter, mode, &work_group);
        let ty = spec.lane;
        let (rows, columns) = footprint(params.axis, filter);

        let mut b = BodyBuilder::new();
        let tile = emit_tile_load(&mut b, &spec, 0);
        let filter_rows = b.define("FILTER_ROWS", rows);
        let filter_columns = b.define("FILTER_COLUMNS", columns);
        let flip = b.flag("FLIP_FILTER", params.flip);
        let row_index = format!("({} ? {} - 1 - fr : fr)", flip, filter_rows);
        let column_index = format!("({} ? {} - 1 - fc : fc)", flip, filter_columns);

        guarded(&mut b, output, mode, |b| {
            b.declare(&ty.name(), "acc", ty.zero());
            let tap = |b: &mut BodyBuilder, row_offset: &str, column_offset: &str| {
                let w = match mode {
                    AddressingMode::SmallTensor => b.read_nonlocal(1),
                    _ => b.read_element_nonlocal(1, "0"),
                };
                b.assign(
                    "acc",
                    format!("acc + {} * {}", tile.at(row_offset, column_offset), w),
                );
            };
            match params.axis {
                FilterAxis::Both => {
                    b.for_loop("fr", "0", filter_rows.as_str(), "1", |b| {
                        b.for_loop("fc", "0", filter_columns.as_str(), "1", |b| {
                            b.assign("row", row_index.as_str());
                            b.assign("column", column_index.as_str());
                            tap(b, "fr", "fc");
                        });
                    });
                }
                FilterAxis::Rows => {
                    b.for_loop("fc", "0", filter_columns.as_str(), "1", |b| {
                        b.assign("column", column_index.as_str());
                        tap(b, "0", "fc");
                    });
                }
                FilterAxis::Columns => {
                    b.for_loop("fr", "0", filter_rows.as_str(), "1", |b| {
                        b.assign("column", row_index.as_str());
                        tap(b, "fr", "0");
                    });
                }
            }
            match mode {
                AddressingMode::SmallTensor => b.write(0, "acc"),
                _ => b.write_element(0, "acc", "_tensorElement"),
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
                work_group,
                pass: None,
            },
            ctx,
        )
    }
}
