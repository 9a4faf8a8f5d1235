//! KIR: the kernel intermediate representation.
//!
//! A kernel body is an ordered list of typed fragments (declarations,
//! loops, barriers, reads and writes) plus a set of template bindings.
//! Families assemble bodies with `BodyBuilder`; a `KernelLowering`
//! backend renders them to source text last. Assembly never fails:
//! every value that reaches a fragment has already been validated by
//! the kernel factory.
//!
//! Pipeline position:
//!
//! ```text
//! factory ─validate─→ BodyBuilder ─→ KernelBody ─KernelLowering─→ source
//! ```

mod builder;
pub mod lower;
#[cfg(test)]
mod tests;

use std::fmt;

use crate::addressing::AddressingMode;

pub use builder::BodyBuilder;

// ─── Access Primitives ─────────────────────────────────────────────

/// Read primitives of the generated-body vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadKind {
    /// Whole value at the thread's implicit coordinate.
    Local,
    /// Whole value at the scratch coordinate.
    Nonlocal,
    /// One tensor element at the implicit coordinate.
    Element,
    /// One tensor element at the scratch coordinate.
    ElementNonlocal,
    /// The single scalar of a 0-D field.
    Scalar0D,
    /// The whole tensor of a 0-D field.
    Point0D,
}

impl ReadKind {
    pub fn primitive(self) -> &'static str {
        match self {
            ReadKind::Local => "read",
            ReadKind::Nonlocal => "readNonlocal",
            ReadKind::Element => "readElement",
            ReadKind::ElementNonlocal => "readElementNonlocal",
            ReadKind::Scalar0D => "readScalar",
            ReadKind::Point0D => "readPoint",
        }
    }
}

/// Write primitives of the generated-body vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteKind {
    Local,
    Nonlocal,
    Element,
    ElementNonlocal,
}

impl WriteKind {
    pub fn primitive(self) -> &'static str {
        match self {
            WriteKind::Local => "write",
            WriteKind::Nonlocal => "writeNonlocal",
            WriteKind::Element => "writeElement",
            WriteKind::ElementNonlocal => "writeElementNonlocal",
        }
    }

    /// Whole-tensor writes: at most once per output, never in a loop.
    pub fn is_whole(self) -> bool {
        matches!(self, WriteKind::Local | WriteKind::Nonlocal)
    }
}

/// Ordinal input token (`in0`, `in1`, ...).
pub fn input_token(index: usize) -> String {
    format!("in{}", index)
}

/// Ordinal output token (`out0`, `out1`, ...).
pub fn output_token(index: usize) -> String {
    format!("out{}", index)
}

// ─── Fragments ─────────────────────────────────────────────────────

/// One structured piece of a kernel body.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    Comment(String),
    /// `ty name [= value];`, optionally `const`.
    Declare {
        ty: String,
        name: String,
        value: Option<String>,
        constant: bool,
    },
    /// Work-group shared array with one extent per dimension.
    LocalArray {
        ty: String,
        name: String,
        dims: Vec<String>,
    },
    /// Thread-private array.
    PrivateArray {
        ty: String,
        name: String,
        len: String,
    },
    Assign {
        target: String,
        value: String,
    },
    /// An expression evaluated for its effect.
    Statement(String),
    Write {
        kind: WriteKind,
        output: usize,
        value: String,
        element: Option<String>,
    },
    /// `for (int var = start; var < end; var += step)`.
    Loop {
        var: String,
        start: String,
        end: String,
        step: String,
        body: Vec<Fragment>,
    },
    If {
        cond: String,
        then: Vec<Fragment>,
        otherwise: Vec<Fragment>,
    },
    /// Work-group barrier over local memory.
    Barrier,
    /// Opaque multi-line text supplied by a collaborator.
    Raw(String),
    /// Nested scope.
    Block(Vec<Fragment>),
}

impl Fragment {
    pub fn assign(target: impl Into<String>, value: impl Into<String>) -> Self {
        Fragment::Assign {
            target: target.into(),
            value: value.into(),
        }
    }
}

// ─── Template ──────────────────────────────────────────────────────

/// A named placeholder and its substituted value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Per-instance parameters of a kernel skeleton. Rendered as
/// preprocessor definitions around the body so neighbouring kernels
/// can be concatenated without name clashes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Template {
    bindings: Vec<Binding>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`; rebinding replaces the previous value.
    pub fn bind(&mut self, name: &str, value: impl fmt::Display) {
        let value = value.to_string();
        match self.bindings.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.value = value,
            None => self.bindings.push(Binding {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Boolean flags render as `0` / `1`.
    pub fn flag(&mut self, name: &str, on: bool) {
        self.bind(name, if on { 1 } else { 0 });
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.value.as_str())
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ─── Kernel Body ───────────────────────────────────────────────────

/// Finished body: template, fragments, and the reads it performs.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelBody {
    pub(crate) template: Template,
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) reads: Vec<ReadKind>,
}

impl KernelBody {
    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn reads(&self) -> &[ReadKind] {
        &self.reads
    }

    /// Every write fragment with the loop depth it sits at.
    pub fn writes(&self) -> Vec<(WriteKind, usize, usize)> {
        let mut out = Vec::new();
        collect_writes(&self.fragments, 0, &mut out);
        out
    }

    /// Primitives this body uses that `mode` does not allow. Empty for
    /// every body a factory produced.
    pub fn violations(&self, mode: AddressingMode) -> Vec<String> {
        let mut problems = Vec::new();
        for read in &self.reads {
            if !mode.allows_read(*read) {
                problems.push(format!("{} is not legal in {} mode", read.primitive(), mode));
            }
        }
        let writes = self.writes();
        for (kind, output, depth) in &writes {
            if !mode.allows_write(*kind) {
                problems.push(format!("{} is not legal in {} mode", kind.primitive(), mode));
            }
            if kind.is_whole() && *depth > 0 {
                problems.push(format!(
                    "{} to {} inside a loop",
                    kind.primitive(),
                    output_token(*output)
                ));
            }
        }
        let mut whole: Vec<usize> = writes
            .iter()
            .filter(|(kind, _, _)| kind.is_whole())
            .map(|(_, output, _)| *output)
            .collect();
        whole.sort_unstable();
        for pair in whole.windows(2) {
            if pair[0] == pair[1] {
                problems.push(format!(
                    "{} written more than once",
                    output_token(pair[0])
                ));
            }
        }
        problems.dedup();
        problems
    }
}

fn collect_writes(fragments: &[Fragment], depth: usize, out: &mut Vec<(WriteKind, usize, usize)>) {
    for fragment in fragments {
        match fragment {
            Fragment::Write { kind, output, .. } => out.push((*kind, *output, depth)),
            Fragment::Loop { body, .. } => collect_writes(body, depth + 1, out),
            Fragment::If {
                then, otherwise, ..
            } => {
                collect_writes(then, depth, out);
                collect_writes(otherwise, depth, out);
            }
            Fragment::Block(body) => collect_writes(body, depth, out),
            _ => {}
        }
    }
}

// ─── Literals ──────────────────────────────────────────────────────

/// Kernel-language literal for a float value.
pub fn float_literal(value: f32) -> String {
    if value.is_nan() {
        "NAN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "INFINITY".to_string()
        } else {
            "(-INFINITY)".to_string()
        }
    } else {
        format!("{:?}f", value)
    }
}
