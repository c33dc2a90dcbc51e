//! 点云变换函数
//!
//! 变换作用于单个样本 `(points, labels)`：
//! - `points`: [num_points, feature_dim]，前三个通道为 xyz
//! - `labels`: [num_points]
//!
//! 变换在每次 `get` 时惰性执行，不会改变数据集本身持有的数组。

use std::sync::Arc;

use ndarray::{Array1, Array2, Axis, s};
use rand::SeedableRng;
use rand::seq::index::sample;

/// 样本级变换：`(points, labels) -> (points, labels)`
pub type PointTransform =
    Arc<dyn Fn(Array2<f32>, Array1<i64>) -> (Array2<f32>, Array1<i64>) + Send + Sync>;

/// 参与几何变换的坐标通道数
const XYZ: usize = 3;

/// 将闭包包装为 [`PointTransform`]
pub fn transform<F>(f: F) -> PointTransform
where
    F: Fn(Array2<f32>, Array1<i64>) -> (Array2<f32>, Array1<i64>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 依次执行多个变换
///
/// # 示例
/// ```ignore
/// let t = compose(vec![center_xyz(), scale_to_unit_sphere()]);
/// let dataset = dataset.with_transforms(t);
/// ```
pub fn compose(transforms: Vec<PointTransform>) -> PointTransform {
    transform(move |mut points, mut labels| {
        for t in &transforms {
            (points, labels) = t(points, labels);
        }
        (points, labels)
    })
}

/// 将 xyz 平移到质心为原点，其余通道不变
pub fn center_xyz() -> PointTransform {
    transform(|mut points, labels| {
        let dims = points.ncols().min(XYZ);
        if points.nrows() == 0 || dims == 0 {
            return (points, labels);
        }
        let mut xyz = points.slice_mut(s![.., ..dims]);
        if let Some(centroid) = xyz.mean_axis(Axis(0)) {
            xyz -= &centroid;
        }
        (points, labels)
    })
}

/// 将 xyz 缩放到单位球内（最大模长为 1）
///
/// 所有点都在原点时保持不变。
pub fn scale_to_unit_sphere() -> PointTransform {
    transform(|mut points, labels| {
        let dims = points.ncols().min(XYZ);
        let max_norm = points
            .slice(s![.., ..dims])
            .rows()
            .into_iter()
            .map(|row| row.dot(&row).sqrt())
            .fold(0.0_f32, f32::max);
        if max_norm > 0.0 {
            points.slice_mut(s![.., ..dims]).mapv_inplace(|v| v / max_norm);
        }
        (points, labels)
    })
}

/// 无放回随机抽取 `n` 个点（保持原有先后顺序）
///
/// 点数不足 `n` 时原样返回。给定 `seed` 时每次调用结果相同。
pub fn random_sample(n: usize, seed: Option<u64>) -> PointTransform {
    transform(move |points, labels| {
        let total = points.nrows();
        if total <= n {
            return (points, labels);
        }
        let mut picked = match seed {
            Some(seed) => sample(&mut rand::rngs::StdRng::seed_from_u64(seed), total, n),
            None => sample(&mut rand::thread_rng(), total, n),
        }
        .into_vec();
        picked.sort_unstable();
        (
            points.select(Axis(0), &picked),
            labels.select(Axis(0), &picked),
        )
    })
}
