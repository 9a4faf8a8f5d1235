use super::*;
use proptest::prelude::*;

use crate::kir::lower::{KernelLowering, OpenClLowering};

fn spec_2d(
    rows: usize,
    columns: usize,
    block: [usize; 2],
    halo: Halo,
    border: BorderPolicy,
) -> TileSpec {
    TileSpec {
        extents: vec![rows, columns],
        block: block.to_vec(),
        halo,
        lane: LaneType::scalar(),
        border,
        source: TileSource::Whole,
    }
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32 + 1.0).collect()
}

#[test]
fn test_tile_geometry() {
    let spec = spec_2d(8, 8, [16, 16], Halo::uniform(1), BorderPolicy::Zero);
    assert_eq!(spec.width(), 18);
    assert_eq!(spec.height(), 18);
    assert_eq!(spec.bytes(), 18 * 18 * 4);

    let rows_only = spec_2d(8, 8, [16, 16], Halo::horizontal(2), BorderPolicy::Zero);
    assert_eq!(rows_only.width(), 20);
    assert_eq!(rows_only.height(), 16);
}

#[test]
fn test_zero_border_reads_above_first_row_as_zero() {
    // 8x8 field, 3-tap filter: halo 1. Row -1 must read zero.
    let values = ramp(64);
    let spec = spec_2d(8, 8, [4, 4], Halo::uniform(1), BorderPolicy::Zero);
    let tile = reference_load(&values, &spec, (0, 0));
    let width = spec.width();
    assert!(tile[..width].iter().all(|&v| v == 0.0), "row -1 must be zero");
    assert_eq!(tile[width], 0.0, "column -1 must be zero");
    assert_eq!(tile[width + 1], values[0]);
}

#[test]
fn test_clamp_and_cyclic_first_row() {
    let values = ramp(64);
    let clamp = spec_2d(8, 8, [4, 4], Halo::uniform(1), BorderPolicy::Clamp);
    let tile = reference_load(&values, &clamp, (0, 0));
    assert_eq!(tile[1], values[0], "row -1 clamps to row 0");
    assert_eq!(tile[0], values[0], "corner clamps to (0, 0)");

    let cyclic = spec_2d(8, 8, [4, 4], Halo::uniform(1), BorderPolicy::Cyclic);
    let tile = reference_load(&values, &cyclic, (0, 0));
    assert_eq!(tile[1], values[7 * 8], "row -1 wraps to row 7");
    assert_eq!(tile[0], values[7 * 8 + 7], "corner wraps to (7, 7)");
}

#[test]
fn test_emitted_2d_load() {
    let spec = spec_2d(8, 8, [16, 16], Halo::vertical(1), BorderPolicy::Zero);
    let mut b = BodyBuilder::new();
    let tile = emit_tile_load(&mut b, &spec, 0);
    assert_eq!(tile.at("1", "0"), "tile[localRow + 1][localColumn + 0]");
    let src = OpenClLowering::new().lower(&b.finish());
    let expected = "\
#define TILE_WIDTH 16
#define BLOCK_WIDTH 16
#define HALO_LEFT 0
#define TILE_HEIGHT 18
#define BLOCK_HEIGHT 16
#define HALO_TOP 1
const int localColumn = get_local_id(0);
const int localRow = get_local_id(1);
__local float tile[TILE_HEIGHT][TILE_WIDTH];
for (int tr = localRow; tr < TILE_HEIGHT; tr += BLOCK_HEIGHT) {
    for (int tc = localColumn; tc < TILE_WIDTH; tc += BLOCK_WIDTH) {
        row = get_group_id(1) * BLOCK_HEIGHT - HALO_TOP + tr;
        column = get_group_id(0) * BLOCK_WIDTH - HALO_LEFT + tc;
        if (row < 0 || row >= 8 || column < 0 || column >= 8) {
            tile[tr][tc] = 0.0f;
        } else {
            tile[tr][tc] = readNonlocal(in0);
        }
    }
}
barrier(CLK_LOCAL_MEM_FENCE);
#undef HALO_TOP
#undef BLOCK_HEIGHT
#undef TILE_HEIGHT
#undef HALO_LEFT
#undef BLOCK_WIDTH
#undef TILE_WIDTH
";
    assert_eq!(src, expected);
}

#[test]
fn test_emitted_1d_cyclic_element_load() {
    let spec = TileSpec {
        extents: vec![32],
        block: vec![64],
        halo: Halo::horizontal(2),
        lane: LaneType::scalar(),
        border: BorderPolicy::Cyclic,
        source: TileSource::Element("_tensorElement".into()),
    };
    let mut b = BodyBuilder::new();
    let tile = emit_tile_load(&mut b, &spec, 0);
    assert_eq!(tile.at("0", "2"), "tile[localColumn + 2]");
    let src = OpenClLowering::new().lower(&b.finish());
    assert!(src.contains("__local float tile[TILE_WIDTH];"));
    assert!(src.contains("column = ((column % 32) + 32) % 32;"));
    assert!(src.contains("tile[tc] = readElementNonlocal(in0, _tensorElement);"));
    assert!(src.contains("barrier(CLK_LOCAL_MEM_FENCE);"));
    assert!(!src.contains("localRow"));
}

fn arb_policy() -> impl Strategy<Value = BorderPolicy> {
    prop_oneof![
        Just(BorderPolicy::Zero),
        Just(BorderPolicy::Clamp),
        Just(BorderPolicy::Cyclic),
    ]
}

proptest! {
    #[test]
    fn prop_reference_load_follows_policy(
        rows in 1usize..12,
        columns in 1usize..12,
        bw in 1usize..6,
        bh in 1usize..6,
        halo in 0usize..3,
        gx in 0usize..3,
        gy in 0usize..3,
        policy in arb_policy(),
    ) {
        let values = ramp(rows * columns);
        let spec = spec_2d(rows, columns, [bw, bh], Halo::uniform(halo), policy);
        let tile = reference_load(&values, &spec, (gx, gy));
        prop_assert_eq!(tile.len(), spec.width() * spec.height());
        for tr in 0..spec.height() {
            for tc in 0..spec.width() {
                let r = (gy * bh + tr) as i64 - halo as i64;
                let c = (gx * bw + tc) as i64 - halo as i64;
                let in_range = (0..rows as i64).contains(&r) && (0..columns as i64).contains(&c);
                let expected = match policy {
                    BorderPolicy::Zero => {
                        if in_range { values[r as usize * columns + c as usize] } else { 0.0 }
                    }
                    BorderPolicy::Clamp => {
                        let rr = r.clamp(0, rows as i64 - 1) as usize;
                        let cc = c.clamp(0, columns as i64 - 1) as usize;
                        values[rr * columns + cc]
                    }
                    _ => {
                        let rr = r.rem_euclid(rows as i64) as usize;
                        let cc = c.rem_euclid(columns as i64) as usize;
                        values[rr * columns + cc]
                    }
                };
                prop_assert_eq!(tile[tr * spec.width() + tc], expected);
            }
        }
    }
}
