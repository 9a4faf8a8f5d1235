//! Local-memory tiling: the cooperative load prologue shared by every
//! stencil-style kernel.
//!
//! A work group caches its block of the input plus a halo on each
//! edge in a `__local` array. Each thread loads
//! `ceil(tile extent / block extent)` elements per axis, border
//! policy applies to every load, and a barrier closes the prologue.
//! The helper knows nothing about the arithmetic applied afterwards.

#[cfg(test)]
mod tests;

use crate::addressing::LaneType;
use crate::border::{self, BorderPolicy, Resolved};
use crate::kir::BodyBuilder;

/// Halo widths on the four edges of a 2-D tile (1-D tiles use only
/// `left` and `right`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Halo {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl Halo {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn uniform(width: usize) -> Self {
        Self {
            top: width,
            bottom: width,
            left: width,
            right: width,
        }
    }

    /// Halo along the column axis only.
    pub fn horizontal(width: usize) -> Self {
        Self {
            left: width,
            right: width,
            ..Self::default()
        }
    }

    /// Halo along the row axis only.
    pub fn vertical(width: usize) -> Self {
        Self {
            top: width,
            bottom: width,
            ..Self::default()
        }
    }
}

/// How one tile entry is read from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileSource {
    /// The whole small tensor.
    Whole,
    /// One tensor element, addressed by this expression.
    Element(String),
}

/// Geometry and policy of one tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileSpec {
    /// Field extents, rows then columns; one entry for a 1-D field.
    pub extents: Vec<usize>,
    /// Block extents in launch order (width, then height).
    pub block: Vec<usize>,
    pub halo: Halo,
    pub lane: LaneType,
    pub border: BorderPolicy,
    pub source: TileSource,
}

impl TileSpec {
    pub fn is_2d(&self) -> bool {
        self.extents.len() == 2
    }

    pub fn block_width(&self) -> usize {
        self.block.first().copied().unwrap_or(1)
    }

    pub fn block_height(&self) -> usize {
        if self.is_2d() {
            self.block.get(1).copied().unwrap_or(1)
        } else {
            1
        }
    }

    pub fn width(&self) -> usize {
        self.block_width() + self.halo.left + self.halo.right
    }

    pub fn height(&self) -> usize {
        if self.is_2d() {
            self.block_height() + self.halo.top + self.halo.bottom
        } else {
            1
        }
    }

    /// Local memory the tile occupies.
    pub fn bytes(&self) -> usize {
        self.width() * self.height() * self.lane.bytes()
    }
}

/// Handle onto an emitted tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub name: String,
    two_d: bool,
}

pub const LOCAL_ROW: &str = "localRow";
pub const LOCAL_COLUMN: &str = "localColumn";

impl Tile {
    /// Tile entry at the thread's own position plus an offset. With
    /// zero offsets this is the thread's point shifted by the halo.
    pub fn at(&self, row_offset: &str, column_offset: &str) -> String {
        if self.two_d {
            format!(
                "{}[{} + {}][{} + {}]",
                self.name, LOCAL_ROW, row_offset, LOCAL_COLUMN, column_offset
            )
        } else {
            format!("{}[{} + {}]", self.name, LOCAL_COLUMN, column_offset)
        }
    }
}

/// Emit the tile declaration, cooperative load and barrier. Called
/// unconditionally by every thread of the block.
pub fn emit_tile_load(b: &mut BodyBuilder, spec: &TileSpec, input: usize) -> Tile {
    let tile_w = b.define("TILE_WIDTH", spec.width());
    let block_w = b.define("BLOCK_WIDTH", spec.block_width());
    let halo_left = b.define("HALO_LEFT", spec.halo.left);
    b.constant("int", LOCAL_COLUMN, "get_local_id(0)");

    let read_expr = match &spec.source {
        TileSource::Whole => b.read_nonlocal(input),
        TileSource::Element(e) => b.read_element_nonlocal(input, e),
    };
    let zero = spec.lane.zero();
    let ty = spec.lane.name();

    if spec.is_2d() {
        let tile_h = b.define("TILE_HEIGHT", spec.height());
        let block_h = b.define("BLOCK_HEIGHT", spec.block_height());
        let halo_top = b.define("HALO_TOP", spec.halo.top);
        b.constant("int", LOCAL_ROW, "get_local_id(1)");
        b.local_array(&ty, "tile", &[tile_h.clone(), tile_w.clone()]);
        let coords = [("row", spec.extents[0]), ("column", spec.extents[1])];
        b.for_loop("tr", LOCAL_ROW, tile_h, block_h.clone(), |b| {
            b.for_loop("tc", LOCAL_COLUMN, tile_w, block_w.clone(), |b| {
                b.assign(
                    "row",
                    format!("get_group_id(1) * {} - {} + tr", block_h, halo_top),
                );
                b.assign(
                    "column",
                    format!("get_group_id(0) * {} - {} + tc", block_w, halo_left),
                );
                b.extend(border::emit_bordered_read(
                    spec.border,
                    &coords,
                    "tile[tr][tc]",
                    &read_expr,
                    &zero,
                ));
            });
        });
    } else {
        b.local_array(&ty, "tile", &[tile_w.clone()]);
        let coords = [("column", spec.extents[0])];
        b.for_loop("tc", LOCAL_COLUMN, tile_w, block_w.clone(), |b| {
            b.assign(
                "column",
                format!("get_group_id(0) * {} - {} + tc", block_w, halo_left),
            );
            b.extend(border::emit_bordered_read(
                spec.border,
                &coords,
                "tile[tc]",
                &read_expr,
                &zero,
            ));
        });
    }
    b.barrier();
    Tile {
        name: "tile".to_string(),
        two_d: spec.is_2d(),
    }
}

/// Host-side model of the tile a block at `group` (launch order)
/// loads from a row-major scalar field. Row-major tile result.
pub fn reference_load(values: &[f32], spec: &TileSpec, group: (usize, usize)) -> Vec<f32> {
    let (rows, columns) = if spec.is_2d() {
        (spec.extents[0], spec.extents[1])
    } else {
        (1, spec.extents[0])
    };
    let origin_row = (group.1 * spec.block_height()) as i64 - spec.halo.top as i64;
    let origin_col = (group.0 * spec.block_width()) as i64 - spec.halo.left as i64;
    let mut tile = Vec::with_capacity(spec.width() * spec.height());
    for tr in 0..spec.height() {
        for tc in 0..spec.width() {
            let row = if spec.is_2d() {
                border::resolve(spec.border, origin_row + tr as i64, rows)
            } else {
                Resolved::Index(0)
            };
            let column = border::resolve(spec.border, origin_col + tc as i64, columns);
            let value = match (row, column) {
                (Resolved::Index(r), Resolved::Index(c)) => values[r * columns + c],
                _ => 0.0,
            };
            tile.push(value);
        }
    }
    tile
}
