//! roipool-kernels: verification core for RoI-aware 3D pooling backward.
//!
//! Given the bookkeeping a forward RoI-aware pooling pass produced (per-voxel
//! point lists and, for max pooling, per-voxel/channel argmax), this crate
//! provides what a kernel test harness needs to check a hardware
//! implementation of the backward pass:
//!
//! - **Parameter validation**: the five-tensor shape/scalar contract,
//!   checked in a fixed order before any computation
//! - **CPU reference**: a deterministic, single-threaded gradient
//!   scatter-add the device output is diffed against
//! - **Workload estimate**: a theoretical op count used to normalize
//!   measured throughput
//! - **Device seam**: a trait behind which the harness plugs the vendor
//!   kernel; buffer lifetime stays inside the implementation
//!
//! # Quick Start
//!
//! ```ignore
//! use roipool_kernels::{KernelVerifier, RoiawarePool3dBackwardVerifier};
//!
//! let mut verifier = RoiawarePool3dBackwardVerifier::new(case);
//! verifier.validate()?;
//! verifier.run_reference()?;
//! verifier.run_device()?;
//! harness.diff(verifier.reference_grad_in(), verifier.device_grad_in());
//! ```

pub mod device;
pub mod kernel_types;
pub mod ops;
pub mod validation;
pub mod verifier;

pub use device::{DeviceArgs, DeviceError, DeviceInvocation, NullDevice};
pub use kernel_types::{
    DType, FloatType, IDX_SENTINEL, KernelFloat, PoolMethod, RoiawarePool3dBackwardConfig,
    RoiawarePool3dBackwardParams, TensorDesc, POOL_METHOD_AVG, POOL_METHOD_MAX,
};
pub use ops::roiaware_pool3d::{roiaware_pool3d_backward_cpu, theory_ops};
pub use verifier::{
    KernelVerifier, RoiawarePool3dBackwardCase, RoiawarePool3dBackwardVerifier, VerifyError,
    VerifyResult,
};
