//! Kernel synthesis for a GPU dataflow compiler.
//!
//! Given an operation tag and the types of its input fields, a kernel
//! family validates the request and produces an immutable `Kernel`: a
//! body fragment in the merger's fixed vocabulary, its addressing mode
//! and launch geometry. Transforms too large for one dispatch become a
//! `KernelChain` of planned passes.

pub mod addressing;
pub mod border;
pub mod config;
pub mod diagnostic;
pub mod fft;
pub mod graph;
pub mod kernel;
pub mod kernels;
pub mod kir;
pub mod opcode;
pub mod tiling;
pub mod types;
pub mod workgroup;

use std::sync::Arc;

use tracing::debug;

pub use addressing::{best_addressing_mode, AddressingMode};
pub use border::BorderPolicy;
pub use config::{ConfigError, SynthConfig};
pub use fft::{FftPlanner, PlanCache, RadixPlanner};
pub use graph::{FieldRef, HandleAllocator, NodeId};
pub use kernel::{ErrorClass, Kernel, KernelChain, KernelError, Operand, Synthesis};
pub use kernels::Family;
pub use opcode::Opcode;
pub use types::{ElementType, FieldShape, FieldType, TensorShape};

use kernel::contract::{self, Context};
use kir::lower::{create_kernel_lowering, KernelLowering};

/// Entry point: validates requests and builds kernels for one target.
pub struct Synthesizer {
    config: SynthConfig,
    lowering: Box<dyn KernelLowering>,
    planner: Arc<dyn FftPlanner>,
}

impl Synthesizer {
    /// A synthesizer for `config`, with a cached radix planner.
    pub fn new(config: SynthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let lowering = create_kernel_lowering(&config.target).ok_or_else(|| {
            ConfigError::Validation(format!("no lowering for target '{}'", config.target))
        })?;
        let planner = Arc::new(PlanCache::new(RadixPlanner::new(config.fft_max_radix)));
        debug!(
            target = lowering.target_name(),
            max_threads = config.max_threads_per_block,
            "synthesizer ready"
        );
        Ok(Self {
            config,
            lowering,
            planner,
        })
    }

    /// Replace the transform planner.
    pub fn with_planner(mut self, planner: Arc<dyn FftPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Build the kernel (or chain) computing `opcode` over `inputs`.
    /// `results` are the types the caller expects; any mismatch with
    /// what the family derives is an error.
    pub fn synthesize(
        &self,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
    ) -> Result<Synthesis, KernelError> {
        self.synthesize_with(Family::for_opcode(opcode), opcode, inputs, results)
    }

    /// Like `synthesize`, but through an explicitly chosen family.
    pub fn synthesize_with(
        &self,
        family: Family,
        opcode: &Opcode,
        inputs: &[FieldRef],
        results: &[FieldType],
    ) -> Result<Synthesis, KernelError> {
        use kernels::{binary, constant, convolve, nms, reduce, shift, transpose, unary};

        let ctx = self.context();
        let kernel = match family {
            Family::Unary => contract::build::<unary::UnaryKernel>(opcode, inputs, results, &ctx)?,
            Family::Binary => {
                contract::build::<binary::BinaryKernel>(opcode, inputs, results, &ctx)?
            }
            Family::Constant => {
                contract::build::<constant::ConstantKernel>(opcode, inputs, results, &ctx)?
            }
            Family::Shift => contract::build::<shift::ShiftKernel>(opcode, inputs, results, &ctx)?,
            Family::Convolve => {
                contract::build::<convolve::ConvolveKernel>(opcode, inputs, results, &ctx)?
            }
            Family::NonMaximumSuppression => {
                contract::build::<nms::NmsKernel>(opcode, inputs, results, &ctx)?
            }
            Family::Transpose => {
                contract::build::<transpose::TransposeKernel>(opcode, inputs, results, &ctx)?
            }
            Family::Reduce => {
                contract::build::<reduce::ReduceKernel>(opcode, inputs, results, &ctx)?
            }
            Family::Fft => {
                let chain =
                    fft::synthesize(opcode, inputs, results, &ctx, self.planner.as_ref())?;
                return Ok(Synthesis::Chain(chain));
            }
        };
        Ok(Synthesis::Kernel(kernel))
    }

    /// The result types `opcode` would produce for `inputs`.
    pub fn expected_results(
        &self,
        opcode: &Opcode,
        inputs: &[&FieldType],
    ) -> Result<Vec<FieldType>, KernelError> {
        use kernels::{binary, constant, convolve, nms, reduce, shift, transpose, unary};

        match Family::for_opcode(opcode) {
            Family::Unary => contract::expected::<unary::UnaryKernel>(opcode, inputs),
            Family::Binary => contract::expected::<binary::BinaryKernel>(opcode, inputs),
            Family::Constant => contract::expected::<constant::ConstantKernel>(opcode, inputs),
            Family::Shift => contract::expected::<shift::ShiftKernel>(opcode, inputs),
            Family::Convolve => contract::expected::<convolve::ConvolveKernel>(opcode, inputs),
            Family::NonMaximumSuppression => contract::expected::<nms::NmsKernel>(opcode, inputs),
            Family::Transpose => {
                contract::expected::<transpose::TransposeKernel>(opcode, inputs)
            }
            Family::Reduce => contract::expected::<reduce::ReduceKernel>(opcode, inputs),
            Family::Fft => fft::expected_results(opcode, inputs),
        }
    }

    fn context(&self) -> Context<'_> {
        Context {
            config: &self.config,
            lowering: self.lowering.as_ref(),
        }
    }
}
