//! Device-invocation seam for the vendor `roiaware_pool3d_backward` kernel.
//!
//! Device memory allocation, upload, kernel launch, download, and release all
//! live behind [`DeviceInvocation`]. Implementations own their buffers for
//! the duration of one call and release them on every path (RAII), so the
//! verification core never holds a raw device pointer. The crate ships only
//! [`NullDevice`]; real backends are supplied by the surrounding harness.

use thiserror::Error;

use crate::kernel_types::{KernelFloat, RoiawarePool3dBackwardConfig};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("unimplemented device kernel: {0}")]
    Unimplemented(&'static str),
    #[error("device error: {0}")]
    Device(String),
}

/// Borrowed inputs for one device invocation of the backward kernel.
///
/// All slices are host memory; the implementation stages them on the device
/// itself. `argmax` is empty for average pooling, `pts_idx_of_voxels` is
/// unused for max pooling, mirroring the CPU reference.
pub struct DeviceArgs<'a, T: KernelFloat> {
    pub pts_idx_of_voxels: &'a [i32],
    pub argmax: &'a [i32],
    pub grad_out: &'a [T],
    pub config: &'a RoiawarePool3dBackwardConfig,
}

/// One call into the vendor kernel: returns the device-computed grad_in as a
/// host `[pts_num, channels]` buffer.
pub trait DeviceInvocation<T: KernelFloat>: Send + Sync {
    fn roiaware_pool3d_backward(&self, args: DeviceArgs<'_, T>) -> Result<Vec<T>, DeviceError>;
}

/// Placeholder backend for harnesses that only run the CPU reference.
#[derive(Debug, Default)]
pub struct NullDevice;

impl<T: KernelFloat> DeviceInvocation<T> for NullDevice {
    fn roiaware_pool3d_backward(&self, _args: DeviceArgs<'_, T>) -> Result<Vec<T>, DeviceError> {
        Err(DeviceError::Unimplemented("roiaware_pool3d_backward"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_types::PoolMethod;

    #[test]
    fn test_null_device_is_unimplemented() {
        let config = RoiawarePool3dBackwardConfig {
            pool_method: PoolMethod::Max,
            boxes_num: 1,
            out_x: 1,
            out_y: 1,
            out_z: 1,
            channels: 1,
            max_pts_each_voxel: 1,
            pts_num: 1,
        };
        let args = DeviceArgs::<f32> {
            pts_idx_of_voxels: &[],
            argmax: &[0],
            grad_out: &[1.0],
            config: &config,
        };
        let err = NullDevice.roiaware_pool3d_backward(args).unwrap_err();
        assert!(matches!(err, DeviceError::Unimplemented(_)));
    }
}
