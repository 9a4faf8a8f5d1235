//! KernelLowering: renders a `KernelBody` into kernel-language source.
//!
//! Each target implements `KernelLowering` to control how fragments
//! print. The output is a body fragment in the fixed merger
//! vocabulary, not a complete kernel: the downstream merger wraps it
//! with argument lists and the implicit coordinate prologue.

mod opencl;
#[cfg(test)]
mod tests;

use super::KernelBody;

pub use opencl::OpenClLowering;

/// Lowers kernel bodies into source text.
pub trait KernelLowering: Send + Sync {
    /// The target name (e.g. "opencl").
    fn target_name(&self) -> &str;

    /// Render the template bindings and fragments of `body`.
    fn lower(&self, body: &KernelBody) -> String;
}

/// Create a kernel-lowering backend for the given target name.
pub fn create_kernel_lowering(target: &str) -> Option<Box<dyn KernelLowering>> {
    match target {
        "opencl" | "cl" => Some(Box::new(OpenClLowering::new())),
        _ => None,
    }
}

/// Target names `create_kernel_lowering` accepts.
pub const KNOWN_TARGETS: &[&str] = &["opencl", "cl"];
