//! Parameter validation for the RoI-aware pooling backward verification core.
//!
//! This module implements the shape/scalar contract that must hold before any
//! computation is attempted. All validation functions return
//! `Result<(), String>` so the verifier can map failures into its own error
//! enum while the checks stay reusable and side-effect free.
//!
//! # Design
//!
//! - Checks run in a fixed order; the first violation is reported
//! - Helpers are pure and idempotent: re-running on unchanged inputs yields
//!   the same verdict
//! - Element-count products use `checked_mul` so absurd dims fail cleanly
//!   instead of overflowing

use crate::kernel_types::{
    PoolMethod, RoiawarePool3dBackwardConfig, RoiawarePool3dBackwardParams, TensorDesc,
};

/// Validate the vendor pool-method encoding.
#[inline]
pub fn validate_pool_method(raw: i32) -> Result<PoolMethod, String> {
    PoolMethod::from_raw(raw)
        .ok_or_else(|| format!("unrecognized pool_method {} (expected 0=max or 1=avg)", raw))
}

/// Validate that every scalar of the case is strictly positive.
#[inline]
pub fn validate_backward_scalars(params: &RoiawarePool3dBackwardParams) -> Result<(), String> {
    let scalars = [
        ("boxes_num", params.boxes_num),
        ("out_x", params.out_x),
        ("out_y", params.out_y),
        ("out_z", params.out_z),
        ("channels", params.channels),
        ("max_pts_each_voxel", params.max_pts_each_voxel),
        ("pts_num", params.pts_num),
    ];
    for (name, value) in scalars {
        if value <= 0 {
            return Err(format!("{} must be > 0, got {}", name, value));
        }
    }
    Ok(())
}

/// Validate that a descriptor's dims equal the expected shape.
#[inline]
pub fn validate_tensor_dims(
    desc: &TensorDesc,
    expected: &[usize],
    name: &str,
) -> Result<(), String> {
    if desc.dims != expected {
        return Err(format!(
            "{} shape {:?} != expected {:?}",
            name, desc.dims, expected
        ));
    }
    Ok(())
}

/// Compute a tensor element count with overflow check.
#[inline]
pub fn checked_element_count(dims: &[usize], name: &str) -> Result<usize, String> {
    dims.iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| format!("{} element count overflows usize for dims {:?}", name, dims))
}

/// Full parameter check for one backward test case.
///
/// Runs the six contract checks in order and, on success, returns the typed
/// configuration the kernels and the workload estimate operate on:
///
/// 1. `pool_method` is a recognized enumerant
/// 2. all seven scalars are strictly positive
/// 3. pts_idx_of_voxels is `[boxes_num, out_x, out_y, out_z, max_pts_each_voxel]`
/// 4. argmax is `[boxes_num, out_x, out_y, out_z, channels]` (max pooling
///    only; the descriptor may be absent for average pooling)
/// 5. grad_out is `[boxes_num, out_x, out_y, out_z, channels]`
/// 6. grad_in is `[pts_num, channels]`
pub fn validate_backward_params(
    params: &RoiawarePool3dBackwardParams,
    pts_idx_desc: &TensorDesc,
    argmax_desc: Option<&TensorDesc>,
    grad_out_desc: &TensorDesc,
    grad_in_desc: &TensorDesc,
) -> Result<RoiawarePool3dBackwardConfig, String> {
    let pool_method = validate_pool_method(params.pool_method)?;
    validate_backward_scalars(params)?;

    let config = RoiawarePool3dBackwardConfig {
        pool_method,
        boxes_num: params.boxes_num as usize,
        out_x: params.out_x as usize,
        out_y: params.out_y as usize,
        out_z: params.out_z as usize,
        channels: params.channels as usize,
        max_pts_each_voxel: params.max_pts_each_voxel as usize,
        pts_num: params.pts_num as usize,
    };

    let voxel_dims = [config.boxes_num, config.out_x, config.out_y, config.out_z];

    let mut pts_idx_dims = voxel_dims.to_vec();
    pts_idx_dims.push(config.max_pts_each_voxel);
    checked_element_count(&pts_idx_dims, "pts_idx_of_voxels")?;
    validate_tensor_dims(pts_idx_desc, &pts_idx_dims, "pts_idx_of_voxels")?;

    let mut pooled_dims = voxel_dims.to_vec();
    pooled_dims.push(config.channels);
    checked_element_count(&pooled_dims, "grad_out")?;

    if pool_method == PoolMethod::Max {
        let argmax = argmax_desc
            .ok_or_else(|| "argmax descriptor is required for max pooling".to_string())?;
        validate_tensor_dims(argmax, &pooled_dims, "argmax")?;
    }

    validate_tensor_dims(grad_out_desc, &pooled_dims, "grad_out")?;

    let grad_in_dims = [config.pts_num, config.channels];
    checked_element_count(&grad_in_dims, "grad_in")?;
    validate_tensor_dims(grad_in_desc, &grad_in_dims, "grad_in")?;

    Ok(config)
}
