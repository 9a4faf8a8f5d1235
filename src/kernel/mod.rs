//! The synthesized kernel value and its construction discipline.
//!
//! A `Kernel` is built once by a family factory and never changes
//! afterwards. Its constructor is crate-private: the only way to obtain
//! one is through `contract::build` (or the multi-pass chain builder),
//! which validates the request first.

pub(crate) mod contract;
mod error;

use crate::addressing::AddressingMode;
use crate::graph::FieldRef;
use crate::kir::KernelBody;
use crate::opcode::Opcode;
use crate::types::FieldType;
use crate::workgroup::WorkGroup;

pub use error::{ErrorClass, KernelError, Operand};

/// Position of a kernel inside a multi-pass chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassInfo {
    pub index: usize,
    pub count: usize,
}

/// Everything the runtime needs to dispatch a kernel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchGeometry {
    pub work_group: WorkGroup,
    pub pass: Option<PassInfo>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    name: String,
    family: &'static str,
    opcode: Opcode,
    inputs: Vec<FieldRef>,
    outputs: Vec<FieldType>,
    addressing: AddressingMode,
    body: KernelBody,
    source: String,
    geometry: LaunchGeometry,
}

/// Parts of a kernel assembled by a family's private constructor.
pub(crate) struct KernelParts {
    pub(crate) family: &'static str,
    pub(crate) opcode: Opcode,
    pub(crate) inputs: Vec<FieldRef>,
    pub(crate) outputs: Vec<FieldType>,
    pub(crate) addressing: AddressingMode,
    pub(crate) body: KernelBody,
    pub(crate) work_group: WorkGroup,
    pub(crate) pass: Option<PassInfo>,
}

impl Kernel {
    pub(crate) fn new(parts: KernelParts, ctx: &contract::Context<'_>) -> Self {
        debug_assert!(
            parts.body.violations(parts.addressing).is_empty(),
            "{} body breaks {} addressing: {:?}",
            parts.family,
            parts.addressing,
            parts.body.violations(parts.addressing)
        );
        let source = ctx.lowering.lower(&parts.body);
        let digest = blake3::hash(source.as_bytes()).to_hex().to_string();
        let name = match parts.pass {
            Some(pass) => format!("{}_pass{}_{}", parts.family, pass.index, &digest[..8]),
            None => format!("{}_{}", parts.family, &digest[..8]),
        };
        Self {
            name,
            family: parts.family,
            opcode: parts.opcode,
            inputs: parts.inputs,
            outputs: parts.outputs,
            addressing: parts.addressing,
            body: parts.body,
            source,
            geometry: LaunchGeometry {
                work_group: parts.work_group,
                pass: parts.pass,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn opcode(&self) -> &Opcode {
        &self.opcode
    }

    pub fn inputs(&self) -> &[FieldRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FieldType] {
        &self.outputs
    }

    pub fn addressing(&self) -> AddressingMode {
        self.addressing
    }

    pub fn body(&self) -> &KernelBody {
        &self.body
    }

    /// Rendered body fragment.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn geometry(&self) -> &LaunchGeometry {
        &self.geometry
    }

    /// Only small-tensor kernels are candidates for merging.
    pub fn is_fusable(&self) -> bool {
        self.addressing.is_fusable()
    }

    /// Hex blake3 digest of the rendered source.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.source.as_bytes()).to_hex().to_string()
    }
}

/// A logical transform compiled into consecutive physical kernels.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelChain {
    passes: Vec<Kernel>,
}

impl KernelChain {
    pub(crate) fn new(passes: Vec<Kernel>) -> Self {
        Self { passes }
    }

    pub fn passes(&self) -> &[Kernel] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Output types of every pass but the last, in order.
    pub fn intermediate_types(&self) -> Vec<FieldType> {
        let upto = self.passes.len().saturating_sub(1);
        self.passes[..upto]
            .iter()
            .flat_map(|k| k.outputs().iter().cloned())
            .collect()
    }

    /// Output types of the final pass.
    pub fn outputs(&self) -> &[FieldType] {
        self.passes.last().map(|k| k.outputs()).unwrap_or(&[])
    }
}

/// Result of synthesizing one dataflow node.
#[derive(Clone, Debug, PartialEq)]
pub enum Synthesis {
    Kernel(Kernel),
    Chain(KernelChain),
}

impl Synthesis {
    /// Every physical kernel, in launch order.
    pub fn kernels(&self) -> &[Kernel] {
        match self {
            Synthesis::Kernel(k) => std::slice::from_ref(k),
            Synthesis::Chain(c) => c.passes(),
        }
    }

    pub fn outputs(&self) -> &[FieldType] {
        match self {
            Synthesis::Kernel(k) => k.outputs(),
            Synthesis::Chain(c) => c.outputs(),
        }
    }

    pub fn into_kernel(self) -> Option<Kernel> {
        match self {
            Synthesis::Kernel(k) => Some(k),
            Synthesis::Chain(_) => None,
        }
    }

    pub fn into_chain(self) -> Option<KernelChain> {
        match self {
            Synthesis::Kernel(_) => None,
            Synthesis::Chain(c) => Some(c),
        }
    }
}
