//! Radix planning for power-of-two transforms.
//!
//! A length-N transform is split into passes of radix R, each a
//! Stockham autosort step: thread `j` of a pass loads
//! `x[j + r * N/R]` for every `r`, applies the twiddles for its stride,
//! runs a radix-R DFT and stores `u[m]` at
//! `(j / stride) * stride * R + j % stride + m * stride`. The stride
//! starts at 1 and grows by R each pass, so no bit reversal is needed.

use std::f64::consts::PI;
use std::sync::Arc;

use crate::workgroup::WorkDimensions;

/// Passes a single axis may take.
pub const MAX_PASSES: usize = 3;

/// What a plan is computed for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanKey {
    /// Points along the transformed axis.
    pub length: usize,
    /// Independent lines of that length (rows of a 2-D field).
    pub lines: usize,
    /// Tensor planes transformed side by side.
    pub planes: usize,
    /// Thread-per-block ceiling of the device.
    pub max_threads: usize,
    pub inverse: bool,
}

/// One physical pass of a plan.
#[derive(Clone, Debug, PartialEq)]
pub struct FftPass {
    pub radix: usize,
    /// Product of every earlier pass's radix.
    pub stride: usize,
    pub dims: WorkDimensions,
    /// Butterfly core: consumes `v[RADIX]` and fills `u[RADIX]`.
    pub source: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FftPlan {
    pub key: PlanKey,
    pub passes: Vec<FftPass>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("transform length {0} is not a power of two >= 2")]
    Length(usize),

    #[error("radix limit {0} is not a power of two >= 2")]
    Radix(usize),

    #[error("length {length} needs {passes} passes at radix <= {max_radix}, at most 3 allowed")]
    TooManyPasses {
        length: usize,
        max_radix: usize,
        passes: usize,
    },
}

/// Source of per-pass geometry and butterfly text.
pub trait FftPlanner: Send + Sync {
    fn plan(&self, key: &PlanKey) -> Result<Arc<FftPlan>, PlanError>;
}

/// Split `length` into at most `MAX_PASSES` power-of-two radices no
/// larger than `max_radix`, as evenly as possible with the larger
/// radices first.
pub fn split_radices(length: usize, max_radix: usize) -> Result<Vec<usize>, PlanError> {
    if length < 2 || !length.is_power_of_two() {
        return Err(PlanError::Length(length));
    }
    if max_radix < 2 || !max_radix.is_power_of_two() {
        return Err(PlanError::Radix(max_radix));
    }
    let bits = length.trailing_zeros() as usize;
    let max_bits = max_radix.trailing_zeros() as usize;
    let passes = bits.div_ceil(max_bits);
    if passes > MAX_PASSES {
        return Err(PlanError::TooManyPasses {
            length,
            max_radix,
            passes,
        });
    }
    let (base, extra) = (bits / passes, bits % passes);
    Ok((0..passes)
        .map(|p| 1usize << (base + usize::from(p < extra)))
        .collect())
}

/// Largest power of two not above `n` (at least 1).
fn floor_power_of_two(n: usize) -> usize {
    if n == 0 {
        1
    } else {
        1 << (usize::BITS - 1 - n.leading_zeros())
    }
}

/// The default planner: mixed-radix Stockham passes.
#[derive(Clone, Debug)]
pub struct RadixPlanner {
    max_radix: usize,
}

impl RadixPlanner {
    pub fn new(max_radix: usize) -> Self {
        Self { max_radix }
    }

    fn dimensions(key: &PlanKey, radix: usize) -> WorkDimensions {
        let threads = key.length / radix;
        let mut global = vec![threads];
        let mut local = vec![threads.min(floor_power_of_two(key.max_threads))];
        for extra in [key.lines, key.planes] {
            if extra > 1 {
                global.push(extra);
                local.push(1);
            }
        }
        WorkDimensions {
            global,
            local,
            batch: key.lines * key.planes,
        }
    }
}

impl FftPlanner for RadixPlanner {
    fn plan(&self, key: &PlanKey) -> Result<Arc<FftPlan>, PlanError> {
        let radices = split_radices(key.length, self.max_radix)?;
        let mut stride = 1;
        let passes = radices
            .into_iter()
            .map(|radix| {
                let pass = FftPass {
                    radix,
                    stride,
                    dims: Self::dimensions(key, radix),
                    source: butterfly_source(radix, stride),
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

// ─── Butterfly Text ────────────────────────────────────────────────

const COMPLEX_MUL: &str = "(float2)(v[r].x * w.x - v[r].y * w.y, v[r].x * w.y + v[r].y * w.x)";

/// Twiddle plus radix DFT over `v`, written to `u`. Refers to the
/// `RADIX`, `STRIDE` and `SIGN` bindings and the thread index `j`.
fn butterfly_source(radix: usize, stride: usize) -> String {
    let mut src = String::new();
    if stride > 1 {
        src.push_str(&format!(
            "\
// twiddle, stride {stride}
for (int r = 1; r < RADIX; r++) {{
    const float angle = SIGN * 2.0f * M_PI_F * (float)(r * (j % STRIDE)) / (float)(STRIDE * RADIX);
    const float2 w = (float2)(cos(angle), sin(angle));
    v[r] = {mul};
}}
",
            stride = stride,
            mul = COMPLEX_MUL
        ));
    }
    if radix == 2 {
        src.push_str(
            "\
// radix-2 butterfly
u[0] = v[0] + v[1];
u[1] = v[0] - v[1];
",
        );
    } else {
        src.push_str(&format!(
            "\
// radix-{radix} DFT
for (int m = 0; m < RADIX; m++) {{
    u[m] = (float2)(0.0f, 0.0f);
    for (int r = 0; r < RADIX; r++) {{
        const float angle = SIGN * 2.0f * M_PI_F * (float)((m * r) % RADIX) / (float)RADIX;
        const float2 w = (float2)(cos(angle), sin(angle));
        u[m] += {mul};
    }}
}}
",
            radix = radix,
            mul = COMPLEX_MUL
        ));
    }
    src
}

// ─── Reference Execution ───────────────────────────────────────────

fn mul(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] * b[0] - a[1] * b[1], a[0] * b[1] + a[1] * b[0]]
}

fn unit(angle: f64) -> [f64; 2] {
    [angle.cos(), angle.sin()]
}

impl FftPlan {
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run the passes over one line on the host, mirroring the
    /// generated kernels. Unnormalised in both directions.
    pub fn execute_reference(&self, input: &[[f32; 2]]) -> Vec<[f32; 2]> {
        let n = input.len();
        let sign = if self.key.inverse { 1.0 } else { -1.0 };
        let mut x: Vec<[f64; 2]> = input.iter().map(|c| [c[0] as f64, c[1] as f64]).collect();
        for pass in &self.passes {
            let (radix, stride) = (pass.radix, pass.stride);
            let mut y = vec![[0.0; 2]; n];
            for j in 0..n / radix {
                let k = j % stride;
                let v: Vec<[f64; 2]> = (0..radix)
                    .map(|r| {
                        let angle = sign * 2.0 * PI * (r * k) as f64 / (stride * radix) as f64;
                        mul(x[j + r * n / radix], unit(angle))
                    })
                    .collect();
                let base = (j / stride) * stride * radix + k;
                for m in 0..radix {
                    let mut acc = [0.0; 2];
                    for (r, value) in v.iter().enumerate() {
                        let angle = sign * 2.0 * PI * ((m * r) % radix) as f64 / radix as f64;
                        let t = mul(*value, unit(angle));
                        acc[0] += t[0];
                        acc[1] += t[1];
                    }
                    y[base + m * stride] = acc;
                }
            }
            x = y;
        }
        x.into_iter().map(|c| [c[0] as f32, c[1] as f32]).collect()
    }
}
