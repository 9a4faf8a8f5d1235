//! Human-readable reports of rejected synthesis requests.
//!
//! A request has no source file, so the report is drawn against its
//! one-line signature, e.g.
//! `shift(in0: 8x8 scalar float32) -> 8x8 scalar float32`, with the
//! offending operand underlined.

use std::ops::Range;

use crate::kernel::{ErrorClass, KernelError, Operand};
use crate::opcode::Opcode;
use crate::types::FieldType;

/// A synthesis diagnostic (error or warning).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Byte range into the rendered source.
    pub span: Range<usize>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A request rendered as one line, with the byte range of each part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub text: String,
    pub opcode: Range<usize>,
    pub inputs: Vec<Range<usize>>,
    pub results: Vec<Range<usize>>,
}

impl Signature {
    pub fn new(opcode: &Opcode, inputs: &[FieldType], results: &[FieldType]) -> Self {
        let mut text = String::new();
        let push = |text: &mut String, part: &str| {
            let start = text.len();
            text.push_str(part);
            start..text.len()
        };

        let op = push(&mut text, &opcode.to_string());
        text.push('(');
        let mut input_spans = Vec::with_capacity(inputs.len());
        for (i, ty) in inputs.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            input_spans.push(push(&mut text, &format!("in{}: {}", i, ty)));
        }
        text.push_str(") -> ");
        let mut result_spans = Vec::with_capacity(results.len());
        if results.is_empty() {
            text.push_str("()");
        }
        for (i, ty) in results.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            result_spans.push(push(&mut text, &ty.to_string()));
        }
        Self {
            text,
            opcode: op,
            inputs: input_spans,
            results: result_spans,
        }
    }

    /// Span to underline for `operand`; the whole line when absent.
    pub fn span_of(&self, operand: Option<Operand>) -> Range<usize> {
        let whole = 0..self.text.len();
        match operand {
            Some(Operand::Opcode) => self.opcode.clone(),
            Some(Operand::Input(i)) => self.inputs.get(i).cloned().unwrap_or(whole),
            Some(Operand::Result(i)) => self.results.get(i).cloned().unwrap_or(whole),
            None => whole,
        }
    }
}

impl Diagnostic {
    pub fn error(message: String, span: Range<usize>) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Range<usize>) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Describe `err` against the signature of the failed request.
    pub fn from_kernel_error(err: &KernelError, signature: &Signature) -> Self {
        let diag = Self::error(err.to_string(), signature.span_of(err.operand()))
            .with_note(format!("kernel family: {}", err.family()));
        match err.class() {
            ErrorClass::ContractViolation => diag.with_help(
                "the request is inconsistent; fix the graph node that built it".into(),
            ),
            ErrorClass::Unimplemented => diag.with_help(
                "this combination has no kernel yet; lower it differently upstream".into(),
            ),
            ErrorClass::PlannerInconsistency => {
                diag.with_note("the transform planner returned an unusable plan".into())
            }
        }
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) -> std::io::Result<()> {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, self.span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish().eprint((filename, Source::from(source)))
    }
}
