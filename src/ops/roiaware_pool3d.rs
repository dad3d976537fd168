//! CPU reference implementation of the RoI-aware 3D pooling backward pass.
//!
//! The forward pass pools each voxel of each RoI down to one value per
//! channel and records bookkeeping: which points landed in which voxel
//! (`pts_idx_of_voxels`) and, for max pooling, which point won each
//! voxel/channel (`argmax`). The backward pass scatters the upstream voxel
//! gradient back onto the point cloud:
//!
//! - **Max**: `grad_in[argmax[v, c], c] += grad_out[v, c]` unless the argmax
//!   is the empty-voxel sentinel.
//! - **Avg**: every listed point of the voxel receives
//!   `grad_out[v, c] / count` for every channel, where `count` is the number
//!   of non-sentinel entries in the voxel's point list; empty voxels
//!   contribute nothing.
//!
//! The scatter is strictly sequential over a single fixed iteration order, so
//! two runs on the same inputs are bit-identical. That is the point: it is
//! the order-independent oracle a parallel device kernel is diffed against,
//! with a numeric tolerance absorbing the device's non-associative
//! float accumulation.
//!
//! Shape validation is not done here; callers go through
//! [`crate::validation::validate_backward_params`] first. Buffer lengths are
//! asserted against the config as a caller contract.

use crate::kernel_types::{IDX_SENTINEL, KernelFloat, PoolMethod, RoiawarePool3dBackwardConfig};

/// Scatter the voxel gradient back onto the point cloud.
///
/// # Arguments
/// * `pts_idx_of_voxels` - `[boxes_num, out_x, out_y, out_z, max_pts_each_voxel]`,
///   sentinel-padded point lists (avg pooling; ignored for max)
/// * `argmax` - `[boxes_num, out_x, out_y, out_z, channels]` winning point per
///   voxel/channel (max pooling; may be empty for avg)
/// * `grad_out` - `[boxes_num, out_x, out_y, out_z, channels]` upstream gradient
/// * `grad_in` - `[pts_num, channels]` output; zero-filled here before
///   accumulation, never read before the zero-fill
///
/// Contributions to the same point from different voxels/boxes are summed,
/// never overwritten.
pub fn roiaware_pool3d_backward_cpu<T: KernelFloat>(
    pts_idx_of_voxels: &[i32],
    argmax: &[i32],
    grad_out: &[T],
    grad_in: &mut [T],
    config: &RoiawarePool3dBackwardConfig,
) {
    assert_eq!(
        grad_out.len(),
        config.grad_out_len(),
        "grad_out size mismatch: expected {}, got {}",
        config.grad_out_len(),
        grad_out.len()
    );
    assert_eq!(
        grad_in.len(),
        config.grad_in_len(),
        "grad_in size mismatch: expected {}, got {}",
        config.grad_in_len(),
        grad_in.len()
    );
    match config.pool_method {
        PoolMethod::Max => {
            assert_eq!(
                argmax.len(),
                config.grad_out_len(),
                "argmax size mismatch: expected {}, got {}",
                config.grad_out_len(),
                argmax.len()
            );
        }
        PoolMethod::Avg => {
            assert_eq!(
                pts_idx_of_voxels.len(),
                config.pts_idx_len(),
                "pts_idx_of_voxels size mismatch: expected {}, got {}",
                config.pts_idx_len(),
                pts_idx_of_voxels.len()
            );
        }
    }

    grad_in.fill(T::zero());

    match config.pool_method {
        PoolMethod::Max => scatter_max(argmax, grad_out, grad_in, config),
        PoolMethod::Avg => scatter_avg(pts_idx_of_voxels, grad_out, grad_in, config),
    }
}

/// Max pooling: route each voxel/channel gradient to its argmax point.
fn scatter_max<T: KernelFloat>(
    argmax: &[i32],
    grad_out: &[T],
    grad_in: &mut [T],
    config: &RoiawarePool3dBackwardConfig,
) {
    let channels = config.channels;
    // Row-major over [boxes, x, y, z]; the last dim of argmax/grad_out is
    // channels, so voxel v starts at v * channels in both.
    for voxel in 0..config.num_voxels() {
        let base = voxel * channels;
        for c in 0..channels {
            let idx = argmax[base + c];
            if idx == IDX_SENTINEL {
                continue;
            }
            let point = idx as usize;
            accumulate(grad_in, point * channels + c, grad_out[base + c].to_f32());
        }
    }
}

/// Avg pooling: fan each voxel/channel gradient out over the voxel's listed
/// points, divided by the number of valid entries.
fn scatter_avg<T: KernelFloat>(
    pts_idx_of_voxels: &[i32],
    grad_out: &[T],
    grad_in: &mut [T],
    config: &RoiawarePool3dBackwardConfig,
) {
    let channels = config.channels;
    let capacity = config.max_pts_each_voxel;
    for voxel in 0..config.num_voxels() {
        let list = &pts_idx_of_voxels[voxel * capacity..(voxel + 1) * capacity];
        let count = list.iter().filter(|&&idx| idx != IDX_SENTINEL).count();
        if count == 0 {
            // Empty voxel: no contribution, and no division by zero.
            continue;
        }
        let grad_base = voxel * channels;
        for c in 0..channels {
            let share = grad_out[grad_base + c].to_f32() / count as f32;
            for &idx in list {
                if idx == IDX_SENTINEL {
                    continue;
                }
                accumulate(grad_in, idx as usize * channels + c, share);
            }
        }
    }
}

/// Scatter-add one contribution at the element type's storage precision.
#[inline(always)]
fn accumulate<T: KernelFloat>(grad_in: &mut [T], offset: usize, contribution: f32) {
    grad_in[offset] = T::from_f32(grad_in[offset].to_f32() + contribution);
}

/// Theoretical floating-point operation count for the configured shapes.
///
/// `boxes_num * out_x * out_y * out_z * channels * k`, with `k = 1` for max
/// pooling (one add per voxel/channel) and `k = 2` for avg pooling (one add
/// plus one amortized divide per contributing point). Used by the
/// performance reporter to normalize measured time; not a correctness input.
pub fn theory_ops(config: &RoiawarePool3dBackwardConfig) -> i64 {
    let k: i64 = match config.pool_method {
        PoolMethod::Max => 1,
        PoolMethod::Avg => 2,
    };
    config.num_voxels() as i64 * config.channels as i64 * k
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(pool_method: PoolMethod) -> RoiawarePool3dBackwardConfig {
        RoiawarePool3dBackwardConfig {
            pool_method,
            boxes_num: 1,
            out_x: 1,
            out_y: 1,
            out_z: 1,
            channels: 1,
            max_pts_each_voxel: 2,
            pts_num: 3,
        }
    }

    #[test]
    fn test_avg_splits_gradient_over_listed_points() {
        let cfg = config(PoolMethod::Avg);
        let pts_idx = vec![0, 1];
        let grad_out = vec![10.0f32];
        let mut grad_in = vec![0.0f32; 3];
        roiaware_pool3d_backward_cpu(&pts_idx, &[], &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in, vec![5.0, 5.0, 0.0]);
    }

    #[test]
    fn test_max_routes_gradient_to_argmax() {
        let cfg = config(PoolMethod::Max);
        let argmax = vec![1];
        let grad_out = vec![7.0f32];
        let mut grad_in = vec![0.0f32; 3];
        roiaware_pool3d_backward_cpu(&[], &argmax, &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in, vec![0.0, 7.0, 0.0]);
    }

    #[test]
    fn test_two_boxes_accumulate_into_same_point() {
        let cfg = RoiawarePool3dBackwardConfig {
            boxes_num: 2,
            ..config(PoolMethod::Max)
        };
        // Both boxes' single voxel selects point 0.
        let argmax = vec![0, 0];
        let grad_out = vec![3.0f32, 4.0];
        let mut grad_in = vec![0.0f32; 3];
        roiaware_pool3d_backward_cpu(&[], &argmax, &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in, vec![7.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sentinel_argmax_skipped() {
        let cfg = config(PoolMethod::Max);
        let argmax = vec![IDX_SENTINEL];
        let grad_out = vec![9.0f32];
        let mut grad_in = vec![1.0f32; 3];
        roiaware_pool3d_backward_cpu(&[], &argmax, &grad_out, &mut grad_in, &cfg);
        // Output is still zero-filled even though nothing is routed.
        assert_eq!(grad_in, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_empty_voxel_avg_no_division_by_zero() {
        let cfg = config(PoolMethod::Avg);
        let pts_idx = vec![IDX_SENTINEL, IDX_SENTINEL];
        let grad_out = vec![10.0f32];
        let mut grad_in = vec![0.0f32; 3];
        roiaware_pool3d_backward_cpu(&pts_idx, &[], &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_avg_partial_voxel_uses_exact_count() {
        let cfg = RoiawarePool3dBackwardConfig {
            max_pts_each_voxel: 4,
            ..config(PoolMethod::Avg)
        };
        // Only three of four slots used; each listed point gets 12 / 3.
        let pts_idx = vec![0, 2, 1, IDX_SENTINEL];
        let grad_out = vec![12.0f32];
        let mut grad_in = vec![0.0f32; 3];
        roiaware_pool3d_backward_cpu(&pts_idx, &[], &grad_out, &mut grad_in, &cfg);
        for &g in &grad_in {
            assert_relative_eq!(g, 4.0, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_grad_in_prior_contents_overwritten() {
        let cfg = config(PoolMethod::Avg);
        let pts_idx = vec![0, IDX_SENTINEL];
        let grad_out = vec![2.0f32];
        let mut grad_in = vec![100.0f32; 3];
        roiaware_pool3d_backward_cpu(&pts_idx, &[], &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in, vec![2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_f16_scatter() {
        let cfg = config(PoolMethod::Max);
        let argmax = vec![2];
        let grad_out = vec![half::f16::from_f32(1.5)];
        let mut grad_in = vec![half::f16::ZERO; 3];
        roiaware_pool3d_backward_cpu(&[], &argmax, &grad_out, &mut grad_in, &cfg);
        assert_eq!(grad_in[2].to_f32(), 1.5);
        assert_eq!(grad_in[0].to_f32(), 0.0);
    }

    #[test]
    fn test_theory_ops_closed_form() {
        let cfg = RoiawarePool3dBackwardConfig {
            pool_method: PoolMethod::Max,
            boxes_num: 2,
            out_x: 3,
            out_y: 4,
            out_z: 5,
            channels: 6,
            max_pts_each_voxel: 8,
            pts_num: 128,
        };
        assert_eq!(theory_ops(&cfg), 2 * 3 * 4 * 5 * 6);
        let avg = RoiawarePool3dBackwardConfig {
            pool_method: PoolMethod::Avg,
            ..cfg
        };
        assert_eq!(theory_ops(&avg), 2 * 3 * 4 * 5 * 6 * 2);
    }
}
