//! Non-maximum suppression over a 3x3 neighbourhood.
//!
//! A point survives only if it is strictly greater than all eight
//! neighbours (per component for vector fields); otherwise it is zero.

use crate::addressing::{best_addressing_mode, AddressingMode};
use crate::border::BorderPolicy;
use crate::graph::FieldRef;
use crate::kernel::contract::{Context, KernelFamily};
use crate::kernel::{Kernel, KernelError, KernelParts, Operand};
use crate::kir::BodyBuilder;
use crate::opcode::Opcode;
use crate::tiling::{emit_tile_load, Halo, TileSource, TileSpec};
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

use super::{check_border, guarded, require_dims, require_real};

pub(crate) const NAME: &str = "non_maximum_suppression";

pub(crate) struct NmsKernel;

fn layout(
    field: &FieldType,
    border: BorderPolicy,
    ctx: &Context<'_>,
) -> (AddressingMode, WorkGroup, TileSpec) {
    let mode = best_addressing_mode(&[field], &[field]);
    let work_group = WorkGroup::for_field(field, mode, None, ctx.config);
    let source = match mode {
        AddressingMode::SmallTensor => TileSource::Whole,
        _ => TileSource::Element("_tensorElement".to_string()),
    };
    let spec = TileSpec {
        extents: field.shape.extents().to_vec(),
        block: work_group.local.iter().take(2).copied().collect(),
        halo: Halo::uniform(1),
        lane: mode.value_type(field),
        border,
        source,
    };
    (mode, work_group, spec)
}

impl KernelFamily for NmsKernel {
    const NAME: &'static str = NAME;
    const INPUTS: usize = 1;
    type Params = BorderPolicy;

    fn accept(opcode: &Opcode) -> Option<BorderPolicy> {
        match opcode {
            Opcode::NonMaximumSuppression { border } => Some(*border),
            _ => None,
        }
    }

    fn expected_results(
        _border: &BorderPolicy,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        Ok(vec![inputs[0].clone()])
    }

    fn preconditions(
        border: &BorderPolicy,
        inputs: &[&FieldType],
        ctx: &Context<'_>,
    ) -> Result<(), KernelError> {
        let field = inputs[0];
        require_dims(NAME, 0, field, &[2])?;
        require_real(NAME, 0, field)?;
        check_border(NAME, *border)?;
        let (_, _, spec) = layout(field, *border, ctx);
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
        border: BorderPolicy,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
        ctx: &Context<'_>,
    ) -> Kernel {
        let field = inputs[0].field_type();
        let output = &results[0];
        let (mode, work_group, spec) = layout(field, border, ctx);
        let ty = spec.lane;

        let mut b = BodyBuilder::new();
        let tile = emit_tile_load(&mut b, &spec, 0);
        guarded(&mut b, output, mode, |b| {
            b.constant(&ty.name(), "center", tile.at("1", "1"));
            b.declare(&ty.name(), "neighbours", tile.at("0", "0"));
            b.for_loop("dr", "0", "3", "1", |b| {
                b.for_loop("dc", "0", "3", "1", |b| {
                    b.if_then("dr != 1 || dc != 1", |b| {
                        b.assign(
                            "neighbours",
                            format!("fmax(neighbours, {})", tile.at("dr", "dc")),
                        );
                    });
                });
            });
            let value = format!(
                "select({}, center, isgreater(center, neighbours))",
                ty.zero()
            );
            match mode {
                AddressingMode::SmallTensor => b.write(0, value),
                _ => b.write_element(0, value, "_tensorElement"),
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
