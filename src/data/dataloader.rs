/*
 * @Description  : DataLoader - PyTorch 风格的数据批量加载器
 *
 * 对任意实现了 Dataset 的数据集提供统一的批量迭代 API，支持：
 * - 自动分批 (batch_size)
 * - 随机打乱 (shuffle)
 * - 丢弃不完整批次 (drop_last)
 */

use ndarray::{Array1, Array2, Array3, Axis, stack};
use rand::SeedableRng;
use rand::seq::SliceRandom;

use super::dataset::Dataset;
use super::error::DataError;

/// 将若干样本合并为一个批次
pub trait Collate: Sized {
    /// 批次类型
    type Batch;

    /// 合并样本；样本间形状不一致时返回 [`DataError::ShapeMismatch`]
    fn collate(samples: Vec<Self>) -> Result<Self::Batch, DataError>;
}

/// 点云样本：[N, C] 点 + [N] 标签 → [B, N, C] 点 + [B, N] 标签
impl Collate for (Array2<f32>, Array1<i64>) {
    type Batch = (Array3<f32>, Array2<i64>);

    fn collate(samples: Vec<Self>) -> Result<Self::Batch, DataError> {
        let first_points = samples.first().map(|(p, _)| p.shape().to_vec());
        let first_labels = samples.first().map(|(_, l)| l.shape().to_vec());

        for (points, labels) in &samples {
            if Some(points.shape().to_vec()) != first_points {
                return Err(DataError::ShapeMismatch {
                    expected: first_points.unwrap_or_default(),
                    got: points.shape().to_vec(),
                });
            }
            if Some(labels.shape().to_vec()) != first_labels {
                return Err(DataError::ShapeMismatch {
                    expected: first_labels.unwrap_or_default(),
                    got: labels.shape().to_vec(),
                });
            }
        }

        let point_views: Vec<_> = samples.iter().map(|(p, _)| p.view()).collect();
        let label_views: Vec<_> = samples.iter().map(|(_, l)| l.view()).collect();
        let points = stack(Axis(0), &point_views).map_err(|e| {
            DataError::FormatError(format!("合并点云批次失败: {e}"))
        })?;
        let labels = stack(Axis(0), &label_views).map_err(|e| {
            DataError::FormatError(format!("合并标签批次失败: {e}"))
        })?;
        Ok((points, labels))
    }
}

/// DataLoader - PyTorch 风格的数据批量加载器
///
/// # 示例
/// ```ignore
/// let dataset = S3disDataset::load(Some("data/s3dis"), true, 5, false)?;
/// let loader = DataLoader::new(dataset, 16)
///     .shuffle(true)
///     .drop_last(true);
///
/// for batch in loader.iter() {
///     let (points, labels) = batch?; // [16, 4096, 9], [16, 4096]
/// }
/// ```
pub struct DataLoader<D: Dataset> {
    dataset: D,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
}

impl<D> DataLoader<D>
where
    D: Dataset,
    D::Item: Collate,
{
    /// 创建新的 DataLoader
    ///
    /// # 参数
    /// - `dataset`: 数据集
    /// - `batch_size`: 批大小
    ///
    /// # Panics
    /// `batch_size` 为 0 时
    pub fn new(dataset: D, batch_size: usize) -> Self {
        assert!(batch_size > 0, "DataLoader: batch_size 必须大于 0");
        Self {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            seed: None,
        }
    }

    /// 设置是否打乱数据
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// 设置是否丢弃最后一个不完整的批次
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// 设置随机种子（用于 shuffle）
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 获取批次数量
    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// 获取数据集大小
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// 检查是否为空
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// 获取底层数据集引用
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// 创建迭代器
    pub fn iter(&self) -> DataLoaderIterator<'_, D> {
        let n = self.dataset.len();
        let mut indices: Vec<usize> = (0..n).collect();

        if self.shuffle {
            if let Some(seed) = self.seed {
                let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
            } else {
                let mut rng = rand::thread_rng();
                indices.shuffle(&mut rng);
            }
        }

        DataLoaderIterator {
            loader: self,
            indices,
            current_batch: 0,
        }
    }
}

/// DataLoader 迭代器
pub struct DataLoaderIterator<'a, D: Dataset> {
    loader: &'a DataLoader<D>,
    indices: Vec<usize>,
    current_batch: usize,
}

impl<D> Iterator for DataLoaderIterator<'_, D>
where
    D: Dataset,
    D::Item: Collate,
{
    type Item = Result<<D::Item as Collate>::Batch, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.indices.len();
        let batch_size = self.loader.batch_size;
        let start = self.current_batch * batch_size;

        // 检查是否还有数据
        if start >= n {
            return None;
        }

        let end = (start + batch_size).min(n);

        // 如果 drop_last 且批次不完整，则跳过
        if self.loader.drop_last && end - start < batch_size {
            return None;
        }

        self.current_batch += 1;

        let batch = self.indices[start..end]
            .iter()
            .map(|&idx| self.loader.dataset.get(idx))
            .collect::<Result<Vec<_>, _>>()
            .and_then(<D::Item as Collate>::collate);
        Some(batch)
    }
}
