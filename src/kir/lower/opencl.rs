//! OpenCL C lowering.

use super::KernelLowering;
use crate::kir::{output_token, Fragment, KernelBody};

const INDENT: &str = "    ";

pub struct OpenClLowering;

impl Default for OpenClLowering {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenClLowering {
    pub fn new() -> Self {
        Self
    }

    fn emit_all(&self, fragments: &[Fragment], depth: usize, out: &mut Vec<String>) {
        for fragment in fragments {
            self.emit(fragment, depth, out);
        }
    }

    fn emit(&self, fragment: &Fragment, depth: usize, out: &mut Vec<String>) {
        let pad = INDENT.repeat(depth);
        match fragment {
            Fragment::Comment(text) => out.push(format!("{}// {}", pad, text)),
            Fragment::Declare {
                ty,
                name,
                value,
                constant,
            } => {
                let qualifier = if *constant { "const " } else { "" };
                match value {
                    Some(v) => out.push(format!("{}{}{} {} = {};", pad, qualifier, ty, name, v)),
                    None => out.push(format!("{}{}{} {};", pad, qualifier, ty, name)),
                }
            }
            Fragment::LocalArray { ty, name, dims } => {
                let extents: String = dims.iter().map(|d| format!("[{}]", d)).collect();
                out.push(format!("{}__local {} {}{};", pad, ty, name, extents));
            }
            Fragment::PrivateArray { ty, name, len } => {
                out.push(format!("{}{} {}[{}];", pad, ty, name, len));
            }
            Fragment::Assign { target, value } => {
                out.push(format!("{}{} = {};", pad, target, value));
            }
            Fragment::Statement(text) => out.push(format!("{}{};", pad, text)),
            Fragment::Write {
                kind,
                output,
                value,
                element,
            } => {
                let token = output_token(*output);
                match element {
                    Some(e) => out.push(format!(
                        "{}{}({}, {}, {});",
                        pad,
                        kind.primitive(),
                        token,
                        value,
                        e
                    )),
                    None => out.push(format!("{}{}({}, {});", pad, kind.primitive(), token, value)),
                }
            }
            Fragment::Loop {
                var,
                start,
                end,
                step,
                body,
            } => {
                let increment = if step == "1" {
                    format!("{}++", var)
                } else {
                    format!("{} += {}", var, step)
                };
                out.push(format!(
                    "{}for (int {v} = {}; {v} < {}; {}) {{",
                    pad,
                    start,
                    end,
                    increment,
                    v = var
                ));
                self.emit_all(body, depth + 1, out);
                out.push(format!("{}}}", pad));
            }
            Fragment::If {
                cond,
                then,
                otherwise,
            } => {
                out.push(format!("{}if ({}) {{", pad, cond));
                self.emit_all(then, depth + 1, out);
                if !otherwise.is_empty() {
                    out.push(format!("{}}} else {{", pad));
                    self.emit_all(otherwise, depth + 1, out);
                }
                out.push(format!("{}}}", pad));
            }
            Fragment::Barrier => out.push(format!("{}barrier(CLK_LOCAL_MEM_FENCE);", pad)),
            Fragment::Raw(text) => {
                for line in text.lines() {
                    if line.trim().is_empty() {
                        out.push(String::new());
                    } else {
                        out.push(format!("{}{}", pad, line));
                    }
                }
            }
            Fragment::Block(body) => {
                out.push(format!("{}{{", pad));
                self.emit_all(body, depth + 1, out);
                out.push(format!("{}}}", pad));
            }
        }
    }
}

impl KernelLowering for OpenClLowering {
    fn target_name(&self) -> &str {
        "opencl"
    }

    fn lower(&self, body: &KernelBody) -> String {
        let mut lines = Vec::new();
        for binding in body.template().bindings() {
            lines.push(format!("#define {} {}", binding.name, binding.value));
        }
        self.emit_all(body.fragments(), 0, &mut lines);
        for binding in body.template().bindings().iter().rev() {
            lines.push(format!("#undef {}", binding.name));
        }
        let mut source = lines.join("\n");
        source.push('\n');
        source
    }
}
