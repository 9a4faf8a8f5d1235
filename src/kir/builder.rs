//! BodyBuilder: assembles a `KernelBody` fragment by fragment.
//!
//! Reads return the expression text to splice into later fragments and
//! are recorded so the finished body can be checked against its
//! addressing mode. Loops and conditionals take closures; the builder
//! collects whatever the closure emits into the nested fragment list.

use std::fmt;

use super::{input_token, Fragment, KernelBody, ReadKind, Template, WriteKind};

pub struct BodyBuilder {
    template: Template,
    fragments: Vec<Fragment>,
    reads: Vec<ReadKind>,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self {
            template: Template::new(),
            fragments: Vec::new(),
            reads: Vec::new(),
        }
    }

    // ── Template ──

    /// Bind a placeholder and return its name for use in expressions.
    pub fn define(&mut self, name: &str, value: impl fmt::Display) -> String {
        self.template.bind(name, value);
        name.to_string()
    }

    pub fn flag(&mut self, name: &str, on: bool) -> String {
        self.template.flag(name, on);
        name.to_string()
    }

    // ── Declarations and statements ──

    pub fn comment(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment::Comment(text.into()));
    }

    /// Declare a mutable variable with an initial value; returns its name.
    pub fn declare(&mut self, ty: &str, name: &str, value: impl Into<String>) -> String {
        self.fragments.push(Fragment::Declare {
            ty: ty.to_string(),
            name: name.to_string(),
            value: Some(value.into()),
            constant: false,
        });
        name.to_string()
    }

    pub fn declare_uninit(&mut self, ty: &str, name: &str) -> String {
        self.fragments.push(Fragment::Declare {
            ty: ty.to_string(),
            name: name.to_string(),
            value: None,
            constant: false,
        });
        name.to_string()
    }

    pub fn constant(&mut self, ty: &str, name: &str, value: impl Into<String>) -> String {
        self.fragments.push(Fragment::Declare {
            ty: ty.to_string(),
            name: name.to_string(),
            value: Some(value.into()),
            constant: true,
        });
        name.to_string()
    }

    pub fn local_array(&mut self, ty: &str, name: &str, dims: &[String]) -> String {
        self.fragments.push(Fragment::LocalArray {
            ty: ty.to_string(),
            name: name.to_string(),
            dims: dims.to_vec(),
        });
        name.to_string()
    }

    pub fn private_array(&mut self, ty: &str, name: &str, len: impl Into<String>) -> String {
        self.fragments.push(Fragment::PrivateArray {
            ty: ty.to_string(),
            name: name.to_string(),
            len: len.into(),
        });
        name.to_string()
    }

    pub fn assign(&mut self, target: impl Into<String>, value: impl Into<String>) {
        self.fragments.push(Fragment::assign(target, value));
    }

    pub fn statement(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment::Statement(text.into()));
    }

    pub fn raw(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment::Raw(text.into()));
    }

    pub fn barrier(&mut self) {
        self.fragments.push(Fragment::Barrier);
    }

    pub fn extend(&mut self, fragments: impl IntoIterator<Item = Fragment>) {
        self.fragments.extend(fragments);
    }

    // ── Control flow ──

    /// `for (int var = start; var < end; var += step) { f }`.
    pub fn for_loop(
        &mut self,
        var: &str,
        start: impl Into<String>,
        end: impl Into<String>,
        step: impl Into<String>,
        f: impl FnOnce(&mut Self),
    ) {
        let body = self.nested(f);
        self.fragments.push(Fragment::Loop {
            var: var.to_string(),
            start: start.into(),
            end: end.into(),
            step: step.into(),
            body,
        });
    }

    pub fn if_then(&mut self, cond: impl Into<String>, f: impl FnOnce(&mut Self)) {
        let then = self.nested(f);
        self.fragments.push(Fragment::If {
            cond: cond.into(),
            then,
            otherwise: Vec::new(),
        });
    }

    pub fn if_else(
        &mut self,
        cond: impl Into<String>,
        then: impl FnOnce(&mut Self),
        otherwise: impl FnOnce(&mut Self),
    ) {
        let then = self.nested(then);
        let otherwise = self.nested(otherwise);
        self.fragments.push(Fragment::If {
            cond: cond.into(),
            then,
            otherwise,
        });
    }

    pub fn block(&mut self, f: impl FnOnce(&mut Self)) {
        let body = self.nested(f);
        self.fragments.push(Fragment::Block(body));
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) -> Vec<Fragment> {
        let outer = std::mem::take(&mut self.fragments);
        f(self);
        std::mem::replace(&mut self.fragments, outer)
    }

    // ── Reads ──

    fn record(&mut self, kind: ReadKind) {
        if !self.reads.contains(&kind) {
            self.reads.push(kind);
        }
    }

    pub fn read(&mut self, input: usize) -> String {
        self.record(ReadKind::Local);
        format!("read({})", input_token(input))
    }

    pub fn read_nonlocal(&mut self, input: usize) -> String {
        self.record(ReadKind::Nonlocal);
        format!("readNonlocal({})", input_token(input))
    }

    pub fn read_element(&mut self, input: usize, element: &str) -> String {
        self.record(ReadKind::Element);
        format!("readElement({}, {})", input_token(input), element)
    }

    pub fn read_element_nonlocal(&mut self, input: usize, element: &str) -> String {
        self.record(ReadKind::ElementNonlocal);
        format!("readElementNonlocal({}, {})", input_token(input), element)
    }

    pub fn read_scalar(&mut self, input: usize) -> String {
        self.record(ReadKind::Scalar0D);
        format!("readScalar({})", input_token(input))
    }

    pub fn read_point(&mut self, input: usize) -> String {
        self.record(ReadKind::Point0D);
        format!("readPoint({})", input_token(input))
    }

    // ── Writes ──

    fn push_write(&mut self, kind: WriteKind, output: usize, value: String, element: Option<&str>) {
        self.fragments.push(Fragment::Write {
            kind,
            output,
            value,
            element: element.map(str::to_string),
        });
    }

    pub fn write(&mut self, output: usize, value: impl Into<String>) {
        self.push_write(WriteKind::Local, output, value.into(), None);
    }

    pub fn write_nonlocal(&mut self, output: usize, value: impl Into<String>) {
        self.push_write(WriteKind::Nonlocal, output, value.into(), None);
    }

    pub fn write_element(&mut self, output: usize, value: impl Into<String>, element: &str) {
        self.push_write(WriteKind::Element, output, value.into(), Some(element));
    }

    pub fn write_element_nonlocal(
        &mut self,
        output: usize,
        value: impl Into<String>,
        element: &str,
    ) {
        self.push_write(WriteKind::ElementNonlocal, output, value.into(), Some(element));
    }

    pub fn finish(self) -> KernelBody {
        KernelBody {
            template: self.template,
            fragments: self.fragments,
            reads: self.reads,
        }
    }
}
