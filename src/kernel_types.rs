//! Shared types for the RoI-aware pooling verification core.
//!
//! One test case is described by seven scalars, a pooling method, and four
//! dense row-major tensors. The scalars arrive raw (`i64` / `i32`) exactly as
//! the harness read them from the case description and are only trusted after
//! [`crate::validation::validate_backward_params`] has produced a
//! [`RoiawarePool3dBackwardConfig`].

/// Sentinel marking an unused slot in a voxel's point list, or an empty
/// voxel's argmax.
pub const IDX_SENTINEL: i32 = -1;

/// Compile-time float type identifier for kernel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatType {
    F32,
    F16,
}

/// Element type carried by a tensor descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    F16,
    I32,
}

/// Float element trait for the reference kernels.
///
/// Arithmetic goes through f32 per step while storage stays at the element
/// type, so an f16 tensor accumulates at f16 storage precision.
pub trait KernelFloat: Copy + Default + PartialEq + Send + Sync + 'static {
    const TYPE_ID: FloatType;

    fn to_f32(self) -> f32;
    fn from_f32(v: f32) -> Self;
    fn zero() -> Self;
}

impl KernelFloat for f32 {
    const TYPE_ID: FloatType = FloatType::F32;

    #[inline(always)]
    fn to_f32(self) -> f32 { self }
    #[inline(always)]
    fn from_f32(v: f32) -> Self { v }
    #[inline(always)]
    fn zero() -> Self { 0.0 }
}

impl KernelFloat for half::f16 {
    const TYPE_ID: FloatType = FloatType::F16;

    #[inline(always)]
    fn to_f32(self) -> f32 { half::f16::to_f32(self) }
    #[inline(always)]
    fn from_f32(v: f32) -> Self { half::f16::from_f32(v) }
    #[inline(always)]
    fn zero() -> Self { half::f16::ZERO }
}

/// Pooling method of the forward pass whose gradient is being scattered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMethod {
    /// Gradient routes to the argmax point of each voxel/channel.
    Max,
    /// Gradient splits evenly across the voxel's listed points.
    Avg,
}

/// Vendor wire encoding: 0 = max pooling.
pub const POOL_METHOD_MAX: i32 = 0;
/// Vendor wire encoding: 1 = average pooling.
pub const POOL_METHOD_AVG: i32 = 1;

impl PoolMethod {
    /// Parse the vendor int encoding; `None` for unrecognized values.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            POOL_METHOD_MAX => Some(PoolMethod::Max),
            POOL_METHOD_AVG => Some(PoolMethod::Avg),
            _ => None,
        }
    }
}

/// Raw per-case parameters as read from the case description.
///
/// Scalars are kept signed so that non-positive values can be rejected by
/// validation instead of being unrepresentable.
#[derive(Debug, Clone)]
pub struct RoiawarePool3dBackwardParams {
    /// Vendor encoding of the pooling method (0 = max, 1 = avg).
    pub pool_method: i32,
    /// Number of regions of interest.
    pub boxes_num: i64,
    /// Voxel-grid resolution per box, x axis.
    pub out_x: i64,
    /// Voxel-grid resolution per box, y axis.
    pub out_y: i64,
    /// Voxel-grid resolution per box, z axis.
    pub out_z: i64,
    /// Feature channels per point.
    pub channels: i64,
    /// Capacity of the per-voxel point list.
    pub max_pts_each_voxel: i64,
    /// Total number of points in the input cloud.
    pub pts_num: i64,
}

/// Validated, typed configuration produced by parameter checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiawarePool3dBackwardConfig {
    pub pool_method: PoolMethod,
    pub boxes_num: usize,
    pub out_x: usize,
    pub out_y: usize,
    pub out_z: usize,
    pub channels: usize,
    pub max_pts_each_voxel: usize,
    pub pts_num: usize,
}

impl RoiawarePool3dBackwardConfig {
    /// Number of voxels across all boxes.
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.boxes_num * self.out_x * self.out_y * self.out_z
    }

    /// Expected element count of the pts_idx_of_voxels tensor.
    #[inline]
    pub fn pts_idx_len(&self) -> usize {
        self.num_voxels() * self.max_pts_each_voxel
    }

    /// Expected element count of the argmax and grad_out tensors.
    #[inline]
    pub fn grad_out_len(&self) -> usize {
        self.num_voxels() * self.channels
    }

    /// Expected element count of the grad_in tensor.
    #[inline]
    pub fn grad_in_len(&self) -> usize {
        self.pts_num * self.channels
    }
}

/// Shape and element-type metadata for one harness-owned tensor.
///
/// The harness constructs and owns descriptors; this core only reads the
/// dims/dtype metadata from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    pub dims: Vec<usize>,
    pub dtype: DType,
}

impl TensorDesc {
    pub fn new(dims: Vec<usize>, dtype: DType) -> Self {
        Self { dims, dtype }
    }

    /// Total element count implied by the dims.
    pub fn element_count(&self) -> usize {
        self.dims.iter().product()
    }
}
