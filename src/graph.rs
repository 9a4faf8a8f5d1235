//! Handles onto upstream computations ("virtual field registers").
//!
//! The dataflow graph owns its nodes; kernels only hold `FieldRef`s,
//! which name a producer plus the type of the value it yields. Passes
//! inside a multi-pass chain are producers too, addressed by index.

use std::fmt;

use crate::types::FieldType;

/// Identifier of a node in the caller's dataflow graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Who computes the value a `FieldRef` points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Producer {
    /// A node of the dataflow graph.
    Node(NodeId),
    /// An earlier pass of the same kernel chain.
    Pass(usize),
}

/// Read-only reference to one output of a producer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    producer: Producer,
    output: usize,
    field_type: FieldType,
}

impl FieldRef {
    pub fn new(node: NodeId, output: usize, field_type: FieldType) -> Self {
        Self {
            producer: Producer::Node(node),
            output,
            field_type,
        }
    }

    pub(crate) fn pass_output(pass: usize, output: usize, field_type: FieldType) -> Self {
        Self {
            producer: Producer::Pass(pass),
            output,
            field_type,
        }
    }

    pub fn producer(&self) -> Producer {
        self.producer
    }

    pub fn output(&self) -> usize {
        self.output
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.producer {
            Producer::Node(id) => write!(f, "{}.{}: {}", id, self.output, self.field_type),
            Producer::Pass(p) => write!(f, "pass{}.{}: {}", p, self.output, self.field_type),
        }
    }
}

/// Mint sequential graph handles. Handy for tests and the CLI, where
/// there is no real graph behind the inputs.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&mut self, field_type: FieldType) -> FieldRef {
        let id = NodeId(self.next);
        self.next += 1;
        FieldRef::new(id, 0, field_type)
    }
}
