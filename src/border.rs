//! Border policies: what a stencil reads outside the field.
//!
//! `resolve` is the host-side definition of each policy. The `emit_*`
//! helpers generate the same mapping as kernel text, shared by the
//! tiling prologue and by kernels that read shifted coordinates
//! directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kir::Fragment;

/// Out-of-bounds handling strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderPolicy {
    /// Reads outside the field yield zero.
    #[default]
    Zero,
    /// Reads outside the field yield the nearest edge value.
    Clamp,
    /// Coordinates wrap around modulo the extent.
    Cyclic,
    /// Output shrinks to the region computable without padding.
    Valid,
    /// Output grows to every position touched by the stencil.
    Full,
}

impl BorderPolicy {
    /// Policies the shared tiling prologue knows how to generate.
    pub fn is_tileable(self) -> bool {
        matches!(
            self,
            BorderPolicy::Zero | BorderPolicy::Clamp | BorderPolicy::Cyclic
        )
    }
}

impl fmt::Display for BorderPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BorderPolicy::Zero => "zero",
            BorderPolicy::Clamp => "clamp",
            BorderPolicy::Cyclic => "cyclic",
            BorderPolicy::Valid => "valid",
            BorderPolicy::Full => "full",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of resolving one coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Read this in-range coordinate.
    Index(usize),
    /// Use the zero value instead of reading.
    Zero,
}

/// Map `coord` onto `[0, extent)` under `policy`.
///
/// Valid and full borders never read padding values they did not
/// produce, so out-of-range coordinates resolve to zero for both.
pub fn resolve(policy: BorderPolicy, coord: i64, extent: usize) -> Resolved {
    let extent = extent as i64;
    if extent == 0 {
        return Resolved::Zero;
    }
    match policy {
        BorderPolicy::Clamp => Resolved::Index(coord.clamp(0, extent - 1) as usize),
        BorderPolicy::Cyclic => Resolved::Index(coord.rem_euclid(extent) as usize),
        BorderPolicy::Zero | BorderPolicy::Valid | BorderPolicy::Full => {
            if (0..extent).contains(&coord) {
                Resolved::Index(coord as usize)
            } else {
                Resolved::Zero
            }
        }
    }
}

// ─── Kernel Text ───────────────────────────────────────────────────

/// Rewrite `var` in place so it lies inside `[0, extent)`.
///
/// Zero-like policies leave the coordinate untouched; pair them with
/// `out_of_range` to select the zero value.
pub fn emit_resolve(policy: BorderPolicy, var: &str, extent: usize) -> Vec<Fragment> {
    match policy {
        BorderPolicy::Clamp => vec![Fragment::assign(
            var,
            format!("clamp({}, 0, {})", var, extent - 1),
        )],
        BorderPolicy::Cyclic => vec![Fragment::assign(
            var,
            format!("(({v} % {e}) + {e}) % {e}", v = var, e = extent),
        )],
        BorderPolicy::Zero | BorderPolicy::Valid | BorderPolicy::Full => Vec::new(),
    }
}

/// Condition that is true when any coordinate falls outside its extent.
pub fn out_of_range(coords: &[(&str, usize)]) -> String {
    coords
        .iter()
        .map(|(var, extent)| format!("{v} < 0 || {v} >= {e}", v = var, e = extent))
        .collect::<Vec<_>>()
        .join(" || ")
}

/// Whether `policy` needs the zero-substitution branch.
pub fn substitutes_zero(policy: BorderPolicy) -> bool {
    matches!(
        policy,
        BorderPolicy::Zero | BorderPolicy::Valid | BorderPolicy::Full
    )
}

/// Guarded read of a shifted coordinate set: resolve every coordinate,
/// then either assign `read_expr` to `dest` or, for zero borders,
/// assign `zero` when the coordinate was out of range.
pub fn emit_bordered_read(
    policy: BorderPolicy,
    coords: &[(&str, usize)],
    dest: &str,
    read_expr: &str,
    zero: &str,
) -> Vec<Fragment> {
    if substitutes_zero(policy) {
        return vec![Fragment::If {
            cond: out_of_range(coords),
            then: vec![Fragment::assign(dest, zero)],
            otherwise: vec![Fragment::assign(dest, read_expr)],
        }];
    }
    let mut out = Vec::new();
    for (var, extent) in coords {
        out.extend(emit_resolve(policy, var, *extent));
    }
    out.push(Fragment::assign(dest, read_expr));
    out
}
