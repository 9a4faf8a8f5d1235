use super::*;
use proptest::prelude::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::addressing::AddressingMode;
use crate::config::SynthConfig;
use crate::graph::HandleAllocator;
use crate::kernel::ErrorClass;
use crate::kir::lower::OpenClLowering;
use crate::workgroup::WorkDimensions;

fn key(length: usize) -> PlanKey {
    PlanKey {
        length,
        lines: 1,
        planes: 1,
        max_threads: 256,
        inverse: false,
    }
}

fn fft(rank: FftRank, direction: FftDirection, scale: f32) -> Opcode {
    Opcode::Fft {
        rank,
        direction,
        scale,
    }
}

fn run(
    opcode: &Opcode,
    input: FieldType,
    planner: &dyn FftPlanner,
) -> Result<KernelChain, KernelError> {
    let config = SynthConfig::default();
    let lowering = OpenClLowering::new();
    let ctx = Context {
        config: &config,
        lowering: &lowering,
    };
    let results = expected_results(opcode, &[&input])?;
    let mut alloc = HandleAllocator::new();
    synthesize(opcode, &[alloc.input(input)], &results, &ctx, planner)
}

fn naive_dft(x: &[[f32; 2]], inverse: bool) -> Vec<[f32; 2]> {
    let n = x.len();
    let sign = if inverse { 1.0 } else { -1.0 };
    (0..n)
        .map(|k| {
            let mut acc = [0.0f64; 2];
            for (t, v) in x.iter().enumerate() {
                let angle = sign * 2.0 * std::f64::consts::PI * ((k * t) % n) as f64 / n as f64;
                let (c, s) = (angle.cos(), angle.sin());
                acc[0] += v[0] as f64 * c - v[1] as f64 * s;
                acc[1] += v[0] as f64 * s + v[1] as f64 * c;
            }
            [acc[0] as f32, acc[1] as f32]
        })
        .collect()
}

fn signal(n: usize) -> Vec<[f32; 2]> {
    (0..n)
        .map(|i| {
            let t = i as f32;
            [(0.3 * t).sin() + 0.25, (0.7 * t).cos() - 0.5 * (i % 3) as f32]
        })
        .collect()
}

fn assert_close(actual: &[[f32; 2]], expected: &[[f32; 2]], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a[0] - e[0]).abs() <= tolerance && (a[1] - e[1]).abs() <= tolerance,
            "bin {}: {:?} vs {:?}",
            i,
            a,
            e
        );
    }
}

// ─── Planning ──────────────────────────────────────────────────────

#[test]
fn test_split_radices() {
    assert_eq!(split_radices(2, 16), Ok(vec![2]));
    assert_eq!(split_radices(16, 16), Ok(vec![16]));
    assert_eq!(split_radices(32, 16), Ok(vec![8, 4]));
    assert_eq!(split_radices(1024, 16), Ok(vec![16, 8, 8]));
    assert_eq!(split_radices(12, 16), Err(PlanError::Length(12)));
    assert_eq!(split_radices(1, 16), Err(PlanError::Length(1)));
    assert_eq!(split_radices(16, 6), Err(PlanError::Radix(6)));
    assert!(matches!(
        split_radices(1 << 13, 16),
        Err(PlanError::TooManyPasses { passes: 4, .. })
    ));
}

#[test]
fn test_plan_geometry() {
    let plan = RadixPlanner::new(16).plan(&key(32)).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.passes[0].radix, 8);
    assert_eq!(plan.passes[0].stride, 1);
    assert_eq!(
        plan.passes[0].dims,
        WorkDimensions {
            global: vec![4],
            local: vec![4],
            batch: 1
        }
    );
    assert_eq!(plan.passes[1].stride, 8);
    assert_eq!(plan.passes[1].dims.global, vec![8]);
    assert!(!plan.passes[0].source.contains("twiddle"));
    assert!(plan.passes[1].source.contains("// twiddle, stride 8"));
    assert!(plan.passes[1].source.contains("// radix-4 DFT"));
}

#[test]
fn test_plan_batches_lines_and_planes() {
    let plan = RadixPlanner::new(16)
        .plan(&PlanKey {
            length: 64,
            lines: 8,
            planes: 2,
            max_threads: 2,
            inverse: true,
        })
        .unwrap();
    let dims = &plan.passes[0].dims;
    assert_eq!(dims.global, vec![8, 8, 2]);
    assert_eq!(dims.local, vec![2, 1, 1]);
    assert_eq!(dims.batch, 16);
}

#[test]
fn test_reference_matches_direct_dft() {
    for max_radix in [2, 4, 16] {
        for bits in 1..=10 {
            let n = 1 << bits;
            let plan = match RadixPlanner::new(max_radix).plan(&key(n)) {
                Ok(plan) => plan,
                Err(PlanError::TooManyPasses { .. }) => continue,
                Err(e) => panic!("{}", e),
            };
            let x = signal(n);
            let tolerance = 1e-3 * n as f32;
            assert_close(&plan.execute_reference(&x), &naive_dft(&x, false), tolerance);
        }
    }
}

#[test]
fn test_inverse_undoes_forward_up_to_length() {
    let n = 64;
    let forward = RadixPlanner::new(8).plan(&key(n)).unwrap();
    let inverse = RadixPlanner::new(8)
        .plan(&PlanKey {
            inverse: true,
            ..key(n)
        })
        .unwrap();
    let x = signal(n);
    let back = inverse.execute_reference(&forward.execute_reference(&x));
    let scaled: Vec<[f32; 2]> = x.iter().map(|c| [c[0] * n as f32, c[1] * n as f32]).collect();
    assert_close(&back, &scaled, 1e-2);
}

struct Counting {
    calls: Arc<AtomicUsize>,
}

impl FftPlanner for Counting {
    fn plan(&self, key: &PlanKey) -> Result<Arc<FftPlan>, PlanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RadixPlanner::new(16).plan(key)
    }
}

#[test]
fn test_cache_computes_once_per_key() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = PlanCache::new(Counting {
        calls: Arc::clone(&calls),
    });
    let a = cache.plan(&key(32)).unwrap();
    let b = cache.plan(&key(32)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    cache.plan(&key(64)).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_cache_does_not_store_failures() {
    let cache = PlanCache::new(RadixPlanner::new(16));
    assert!(cache.plan(&key(12)).is_err());
    assert!(cache.is_empty());
}

// ─── Chains ────────────────────────────────────────────────────────

#[test]
fn test_length_32_chain() {
    let planner = RadixPlanner::new(16);
    let input = FieldType::scalar(&[32]);
    let opcode = fft(FftRank::One, FftDirection::Forward, 1.0);
    let chain = run(&opcode, input.clone(), &planner).unwrap();
    assert!(!chain.is_empty());
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.outputs(), &[input.to_complex()]);
    for ty in chain.intermediate_types() {
        assert_eq!(ty, input.to_complex());
    }
    for (i, kernel) in chain.passes().iter().enumerate() {
        assert_eq!(kernel.addressing(), AddressingMode::BigTensor);
        assert!(!kernel.is_fusable());
        assert!(kernel.name().starts_with(&format!("fft_pass{}_", i)));
        assert_eq!(kernel.geometry().pass, Some(crate::kernel::PassInfo { index: i, count: 2 }));
        assert!(kernel.body().violations(kernel.addressing()).is_empty());
    }
    let first = chain.passes()[0].source();
    assert!(first.contains("v[r] = (float2)(readElementNonlocal(in0, plane), 0.0f);"));
    assert!(first.contains("#define SIGN -1.0f"));
    assert!(!first.contains("SCALE"));
    let second = chain.passes()[1].source();
    assert!(second.contains("v[r] = readElementNonlocal(in0, plane);"));
    assert!(second.contains("writeElementNonlocal(out0, u[m], plane);"));
}

#[test]
fn test_passes_are_wired_in_order() {
    let planner = RadixPlanner::new(4);
    let chain = run(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        FieldType::complex(&[64]),
        &planner,
    )
    .unwrap();
    assert_eq!(chain.len(), 3);
    assert_eq!(
        chain.passes()[0].inputs()[0].producer(),
        crate::graph::Producer::Node(crate::graph::NodeId(0))
    );
    assert_eq!(chain.passes()[1].inputs()[0].producer(), crate::graph::Producer::Pass(0));
    assert_eq!(chain.passes()[2].inputs()[0].producer(), crate::graph::Producer::Pass(1));
}

#[test]
fn test_scale_on_final_pass_only() {
    let planner = RadixPlanner::new(16);
    let chain = run(
        &fft(FftRank::One, FftDirection::Inverse, 0.5),
        FieldType::complex(&[8, 64]),
        &planner,
    )
    .unwrap();
    let (last, earlier) = chain.passes().split_last().unwrap();
    assert!(last.source().contains("#define SCALE 0.5f"));
    assert!(last.source().contains("writeElementNonlocal(out0, u[m] * SCALE, plane);"));
    assert!(last.source().contains("row = line;"));
    for kernel in earlier {
        assert!(!kernel.source().contains("SCALE"));
    }
    assert!(last.source().contains("#define SIGN 1.0f"));
}

#[test]
fn test_inverse_real_keeps_real_part() {
    let planner = RadixPlanner::new(16);
    let input = FieldType::complex(&[128]);
    let opcode = fft(FftRank::One, FftDirection::InverseReal, 1.0);
    let chain = run(&opcode, input.clone(), &planner).unwrap();
    assert_eq!(chain.outputs(), &[input.to_real()]);
    let last = chain.passes().last().unwrap();
    assert!(last.source().contains("writeElementNonlocal(out0, u[m].x, plane);"));
    assert_eq!(chain.intermediate_types(), vec![input.clone()]);
}

#[test]
fn test_two_dimensional_chain_runs_both_axes() {
    let planner = RadixPlanner::new(16);
    let input = FieldType::complex(&[16, 8]);
    let opcode = fft(FftRank::Two, FftDirection::Forward, 1.0);
    let chain = run(&opcode, input.clone(), &planner).unwrap();
    assert_eq!(chain.len(), 2);
    let columns = chain.passes()[0].source();
    assert!(columns.contains("#define LENGTH 8"));
    assert!(columns.contains("column = j + r * (LENGTH / RADIX);"));
    let rows = chain.passes()[1].source();
    assert!(rows.contains("#define LENGTH 16"));
    assert!(rows.contains("row = j + r * (LENGTH / RADIX);"));
    assert!(rows.contains("column = line;"));
    assert_eq!(chain.passes()[1].geometry().work_group.global, vec![1, 8]);
}

#[test]
fn test_vector_planes_get_launch_axis() {
    let planner = RadixPlanner::new(16);
    let chain = run(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        FieldType::vector(&[16], 3),
        &planner,
    )
    .unwrap();
    let kernel = &chain.passes()[0];
    assert!(kernel.source().contains("const int plane = get_global_id(1);"));
    assert_eq!(kernel.geometry().work_group.global, vec![1, 3]);
}

#[test]
fn test_transform_preconditions() {
    let planner = RadixPlanner::new(16);
    let err = run(
        &fft(FftRank::One, FftDirection::Inverse, 1.0),
        FieldType::scalar(&[32]),
        &planner,
    )
    .unwrap_err();
    assert!(matches!(err, KernelError::Precondition { .. }));

    let err = run(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        FieldType::scalar(&[12]),
        &planner,
    )
    .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unimplemented);

    let err = run(
        &fft(FftRank::Two, FftDirection::Forward, 1.0),
        FieldType::scalar(&[32]),
        &planner,
    )
    .unwrap_err();
    assert_eq!(err.operand(), Some(Operand::Input(0)));

    let err = run(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        FieldType::matrix(&[32], 2, 2),
        &planner,
    )
    .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unimplemented);
}

#[test]
fn test_too_many_passes_is_unimplemented() {
    let err = run(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        FieldType::scalar(&[16]),
        &RadixPlanner::new(2),
    )
    .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Unimplemented);
}

#[test]
fn test_declared_result_checked() {
    let config = SynthConfig::default();
    let lowering = OpenClLowering::new();
    let ctx = Context {
        config: &config,
        lowering: &lowering,
    };
    let mut alloc = HandleAllocator::new();
    let input = alloc.input(FieldType::scalar(&[32]));
    let err = synthesize(
        &fft(FftRank::One, FftDirection::Forward, 1.0),
        &[input],
        &[FieldType::scalar(&[32])],
        &ctx,
        &RadixPlanner::new(16),
    )
    .unwrap_err();
    assert!(matches!(err, KernelError::ResultTypeMismatch { .. }));
}

/// Returns a fixed, possibly bogus, pass list.
struct Stub {
    radices: Vec<usize>,
}

impl FftPlanner for Stub {
    fn plan(&self, key: &PlanKey) -> Result<Arc<FftPlan>, PlanError> {
        let mut stride = 1;
        let passes = self
            .radices
            .iter()
            .map(|&radix| {
                let pass = FftPass {
                    radix,
                    stride,
                    dims: WorkDimensions {
                        global: vec![key.length / radix],
                        local: vec![1],
                        batch: 1,
                    },
                    source: String::new(),
                };
                stride *= radix;
                pass
            })
            .collect();
        Ok(Arc::new(FftPlan {
            key: key.clone(),
            passes,
        }))
    }
}

#[test]
fn test_planner_inconsistency_stops_chain() {
    let opcode = fft(FftRank::One, FftDirection::Forward, 1.0);
    for radices in [vec![2, 2, 2, 2], vec![], vec![4, 2]] {
        let err = run(&opcode, FieldType::scalar(&[16]), &Stub { radices }).unwrap_err();
        assert_eq!(err.class(), ErrorClass::PlannerInconsistency);
    }
    assert!(run(&opcode, FieldType::scalar(&[16]), &Stub { radices: vec![4, 4] }).is_ok());
}

proptest! {
    #[test]
    fn prop_radices_cover_length(bits in 1u32..=18, radix_bits in 1u32..=6) {
        let (length, max_radix) = (1usize << bits, 1usize << radix_bits);
        match split_radices(length, max_radix) {
            Ok(radices) => {
                prop_assert!(!radices.is_empty() && radices.len() <= MAX_PASSES);
                prop_assert_eq!(radices.iter().product::<usize>(), length);
                prop_assert!(radices.iter().all(|&r| r <= max_radix && r >= 2));
                prop_assert!(radices.windows(2).all(|w| w[0] >= w[1]));
            }
            Err(PlanError::TooManyPasses { passes, .. }) => prop_assert!(passes > MAX_PASSES),
            Err(e) => prop_assert!(false, "unexpected {}", e),
        }
    }

    #[test]
    fn prop_chain_output_is_requested_type(
        bits in 1u32..=12,
        rows in 1usize..4,
        complex in any::<bool>(),
    ) {
        let extents = [rows, 1usize << bits];
        let input = if complex {
            FieldType::complex(&extents)
        } else {
            FieldType::scalar(&extents)
        };
        let opcode = fft(FftRank::One, FftDirection::Forward, 1.0);
        let chain = run(&opcode, input.clone(), &RadixPlanner::new(16)).unwrap();
        prop_assert!((1..=MAX_PASSES).contains(&chain.len()));
        prop_assert_eq!(chain.outputs(), &[input.to_complex()][..]);
        prop_assert!(chain.intermediate_types().iter().all(|t| *t == input.to_complex()));
    }
}
