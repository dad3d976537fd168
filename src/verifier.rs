//! Per-operator verification lifecycle.
//!
//! The surrounding test harness drives every operator under test through the
//! same four capabilities: validate the case parameters, run the sequential
//! CPU reference, run the device kernel, and report the theoretical workload
//! used to normalize performance numbers. [`KernelVerifier`] is that
//! capability set; [`RoiawarePool3dBackwardVerifier`] is the concrete
//! implementation for the RoI-aware 3D pooling backward operator. The
//! harness diffs the two output buffers with its own tolerance logic.

use thiserror::Error;

use crate::device::{DeviceArgs, DeviceError, DeviceInvocation, NullDevice};
use crate::kernel_types::{
    KernelFloat, RoiawarePool3dBackwardConfig, RoiawarePool3dBackwardParams, TensorDesc,
};
use crate::ops::roiaware_pool3d::{roiaware_pool3d_backward_cpu, theory_ops};
use crate::validation::validate_backward_params;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// A shape/scalar contract violation; recoverable by skipping the case.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Lifecycle misuse: a compute capability was invoked before a
    /// successful `validate`.
    #[error("operation requires successful validate(): {0}")]
    NotValidated(&'static str),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub type VerifyResult<T> = Result<T, VerifyError>;

/// The capability set every operator verifier exposes to the harness.
pub trait KernelVerifier {
    /// Check the case's shape/scalar contract. Idempotent; must succeed
    /// before either compute capability runs.
    fn validate(&mut self) -> VerifyResult<()>;
    /// Populate the reference output with the sequential CPU computation.
    fn run_reference(&mut self) -> VerifyResult<()>;
    /// Populate the device output via the bound [`DeviceInvocation`].
    fn run_device(&mut self) -> VerifyResult<()>;
    /// Theoretical op count for the validated shapes; 0 before validation.
    fn estimate_work(&self) -> i64;
}

/// Inputs for one backward test case, as handed over by the harness.
///
/// `argmax_desc`/`argmax` may be absent/empty for average pooling;
/// `pts_idx_of_voxels` is carried but unused for max pooling.
#[derive(Debug, Clone)]
pub struct RoiawarePool3dBackwardCase<T: KernelFloat> {
    pub params: RoiawarePool3dBackwardParams,
    pub pts_idx_desc: TensorDesc,
    pub argmax_desc: Option<TensorDesc>,
    pub grad_out_desc: TensorDesc,
    pub grad_in_desc: TensorDesc,
    pub pts_idx_of_voxels: Vec<i32>,
    pub argmax: Vec<i32>,
    pub grad_out: Vec<T>,
}

/// Verifier for the RoI-aware 3D pooling backward operator.
///
/// Owns the host buffers of one test case plus the two outputs being
/// compared. No state survives across cases; the harness builds a fresh
/// verifier per case.
pub struct RoiawarePool3dBackwardVerifier<T: KernelFloat> {
    case: RoiawarePool3dBackwardCase<T>,
    device: Box<dyn DeviceInvocation<T>>,
    config: Option<RoiawarePool3dBackwardConfig>,
    reference_grad_in: Vec<T>,
    device_grad_in: Vec<T>,
}

impl<T: KernelFloat> RoiawarePool3dBackwardVerifier<T> {
    /// Verifier without a device backend; `run_device` reports
    /// [`DeviceError::Unimplemented`].
    pub fn new(case: RoiawarePool3dBackwardCase<T>) -> Self {
        Self::with_device(case, Box::new(NullDevice))
    }

    pub fn with_device(
        case: RoiawarePool3dBackwardCase<T>,
        device: Box<dyn DeviceInvocation<T>>,
    ) -> Self {
        Self {
            case,
            device,
            config: None,
            reference_grad_in: Vec::new(),
            device_grad_in: Vec::new(),
        }
    }

    /// Typed configuration; `None` until `validate` succeeds.
    pub fn config(&self) -> Option<&RoiawarePool3dBackwardConfig> {
        self.config.as_ref()
    }

    /// Reference grad_in, `[pts_num, channels]`; empty until
    /// `run_reference` has run.
    pub fn reference_grad_in(&self) -> &[T] {
        &self.reference_grad_in
    }

    /// Device grad_in, `[pts_num, channels]`; empty until `run_device`
    /// has run.
    pub fn device_grad_in(&self) -> &[T] {
        &self.device_grad_in
    }

    fn validated(&self, op: &'static str) -> VerifyResult<RoiawarePool3dBackwardConfig> {
        self.config.ok_or(VerifyError::NotValidated(op))
    }
}

impl<T: KernelFloat> KernelVerifier for RoiawarePool3dBackwardVerifier<T> {
    fn validate(&mut self) -> VerifyResult<()> {
        let case = &self.case;
        log::debug!(
            "roiaware_pool3d_backward case: pool_method={} boxes_num={} out=[{},{},{}] \
             channels={} max_pts_each_voxel={} pts_num={}",
            case.params.pool_method,
            case.params.boxes_num,
            case.params.out_x,
            case.params.out_y,
            case.params.out_z,
            case.params.channels,
            case.params.max_pts_each_voxel,
            case.params.pts_num,
        );
        log::debug!(
            "tensor dims: pts_idx_of_voxels={:?} argmax={:?} grad_out={:?} grad_in={:?}",
            case.pts_idx_desc.dims,
            case.argmax_desc.as_ref().map(|d| &d.dims),
            case.grad_out_desc.dims,
            case.grad_in_desc.dims,
        );
        let config = validate_backward_params(
            &case.params,
            &case.pts_idx_desc,
            case.argmax_desc.as_ref(),
            &case.grad_out_desc,
            &case.grad_in_desc,
        )
        .map_err(VerifyError::InvalidParameter)?;
        self.config = Some(config);
        Ok(())
    }

    fn run_reference(&mut self) -> VerifyResult<()> {
        let config = self.validated("run_reference")?;
        self.reference_grad_in = vec![T::zero(); config.grad_in_len()];
        roiaware_pool3d_backward_cpu(
            &self.case.pts_idx_of_voxels,
            &self.case.argmax,
            &self.case.grad_out,
            &mut self.reference_grad_in,
            &config,
        );
        Ok(())
    }

    fn run_device(&mut self) -> VerifyResult<()> {
        let config = self.validated("run_device")?;
        let out = self.device.roiaware_pool3d_backward(DeviceArgs {
            pts_idx_of_voxels: &self.case.pts_idx_of_voxels,
            argmax: &self.case.argmax,
            grad_out: &self.case.grad_out,
            config: &config,
        })?;
        if out.len() != config.grad_in_len() {
            return Err(VerifyError::Device(DeviceError::Device(format!(
                "device grad_in len {} != expected {}",
                out.len(),
                config.grad_in_len()
            ))));
        }
        self.device_grad_in = out;
        Ok(())
    }

    fn estimate_work(&self) -> i64 {
        self.config.as_ref().map_or(0, theory_ops)
    }
}
