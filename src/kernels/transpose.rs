//! Tiled 2-D transpose: `out(r, c) = in(c, r)`.
//!
//! Each block stages a square tile through local memory so both the
//! read and the write are row-contiguous. The tile carries one padding
//! column to keep the transposed access free of bank conflicts.

use crate::addressing::{best_addressing_mode, AddressingMode};
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::Opcode;
use crate::tiling::{LOCAL_COLUMN, LOCAL_ROW};
use crate::types::{FieldShape, FieldType};
use crate::workgroup::WorkGroup;

use super::require_dims;

pub(crate) const NAME: &str = "transpose";

pub(crate) struct TransposeKernel;

/// The transposed type of a 2-D field.
pub(crate) fn transposed(field: &FieldType) -> FieldType {
    let extents = field.shape.extents();
    field.with_shape(FieldShape::new(&[extents[1], extents[0]]))
}

fn tile_bytes(field: &FieldType, edge: usize) -> usize {
    let mode = best_addressing_mode(&[field], &[field]);
    edge * (edge + 1) * mode.value_type(field).bytes()
}

impl KernelFamily for TransposeKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = ();

    fn accept(opcode: &Opcode) -> Option<()> {
        match opcode {
            Opcode::Transpose => Some(()),
            _ => None,
        }
    }

    fn expected_results(
        _params: &(),
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        let input = inputs[0];
        require_dims(NAME, 0, input, &[2])?;
        Ok(vec![transposed(input)])
    }

    fn preconditions(
        _params: &(),
        inputs: &[&FieldType],
        ctx: &Context<'_>,
    ) -> Result<(), KernelError> {
        let bytes = tile_bytes(inputs[0], ctx.config.transpose_tile);
        if bytes > ctx.config.local_memory_bytes {
            return Err(KernelError::precondition(
                NAME,
                Operand::Input(0),
                format!(
                    "tile needs {} bytes of local memory, {} available",
                    bytes, ctx.config.local_memory_bytes
                ),
            ));
        }
        Ok(())
    }

    fn construct(
        _params: (),
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let input = inputs[0].field_type();
        let output = &results[0];
        let mode = best_addressing_mode(&[input], &[output]);
        let ty = mode.value_type(input);
        let edge = ctx.config.transpose_tile;
        let work_group = WorkGroup::for_field(input, mode, Some(&[edge, edge]), ctx.config);
        let (rows, columns) = (input.shape.extents()[0], input.shape.extents()[1]);
        let element_guard = if mode.has_element_axis() && input.points() > 1 {
            format!(" && _tensorElement < {}", input.points())
        } else {
            String::new()
        };

        let mut b = BodyBuilder::new();
        let tile_edge = b.define("TILE_EDGE", edge);
        b.constant("int", LOCAL_COLUMN, "get_local_id(0)");
        b.constant("int", LOCAL_ROW, "get_local_id(1)");
        b.local_array(
            &ty.name(),
            "tile",
            &[tile_edge.clone(), format!("{} + 1", tile_edge)],
        );

        b.comment("stage the input block");
        b.assign(
            "column",
            format!("get_group_id(0) * {} + {}", tile_edge, LOCAL_COLUMN),
        );
        b.assign(
            "row",
            format!("get_group_id(1) * {} + {}", tile_edge, LOCAL_ROW),
        );
        let read = match mode {
            AddressingMode::SmallTensor => b.read_nonlocal(0),
            _ => b.read_element_nonlocal(0, "_tensorElement"),
        };
        b.if_then(
            format!("row < {} && column < {}{}", rows, columns, element_guard),
            |b| b.assign(format!("tile[{}][{}]", LOCAL_ROW, LOCAL_COLUMN), read),
        );
        b.barrier();

        b.comment("write the block back transposed");
        b.assign(
            "row",
            format!("get_group_id(0) * {} + {}", tile_edge, LOCAL_ROW),
        );
        b.assign(
            "column",
            format!("get_group_id(1) * {} + {}", tile_edge, LOCAL_COLUMN),
        );
        let value = format!("tile[{}][{}]", LOCAL_COLUMN, LOCAL_ROW);
        b.if_then(
            format!("row < {} && column < {}{}", columns, rows, element_guard),
            |b| match mode {
                AddressingMode::SmallTensor => b.write_nonlocal(0, value),
                _ => b.write_element_nonlocal(0, value, "_tensorElement"),
            },
        );
        b.barrier();

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
