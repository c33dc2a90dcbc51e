//! S3DIS 室内点云语义分割数据集
//!
//! 来源：Stanford Large-Scale 3D Indoor Spaces（PointNet 预处理版本）
//! - 24 个容器文件 `ply_data_all_{0..23}.h5`，字段 `data` / `label`
//! - 每个样本为固定点数的点云块，逐点标注 13 个类别之一
//! - `room_filelist.txt` 按样本顺序逐行给出所属房间（如 `Area_1_office_1`）
//!
//! 训练/测试集按区域划分：房间名包含 `Area_<test_area>` 的样本为测试集，其余为训练集。

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array1, Array2, Array3, ArrayD, ArrayViewD, Axis, Ix2, Ix3, concatenate};
use serde::{Deserialize, Serialize};

use crate::data::container::{SampleBlock, read_container};
use crate::data::dataset::Dataset;
use crate::data::download::{check_integrity, download_and_extract_archive};
use crate::data::error::DataError;
use crate::data::transforms::PointTransform;

use super::default_data_dir;

/// 解压后数据所在的子目录
pub const S3DIS_BASEDIR: &str = "indoor3d_sem_seg_hdf5_data";

/// 压缩包下载地址
pub const S3DIS_URL: &str = "https://shapenet.cs.stanford.edu/media/indoor3d_sem_seg_hdf5_data.zip";

/// 压缩包 MD5
pub const S3DIS_ARCHIVE_MD5: &str = "f07d79acdea1f497b3fb3d32f34f1428";

/// 房间清单文件名（位于 `S3DIS_BASEDIR` 下）
pub const S3DIS_ROOM_FILELIST: &str = "room_filelist.txt";

/// 默认留作测试集的区域
pub const DEFAULT_TEST_AREA: u32 = 5;

/// 容器文件清单：(文件名, MD5)，顺序即样本拼接顺序
pub const S3DIS_FILES: [(&str, &str); 24] = [
    ("ply_data_all_0.h5", "ec71baeb8b8cf19f75e626225974ae1d"),
    ("ply_data_all_1.h5", "4d61066842bbbc383e0a9a8e34414630"),
    ("ply_data_all_2.h5", "f64d91e4b7084b6b9b9e6cb9511ac767"),
    ("ply_data_all_3.h5", "205bef85da42f335edab1026f1b6d13c"),
    ("ply_data_all_4.h5", "ee7f32ecd3ea433a3dc4be1a42a417d2"),
    ("ply_data_all_5.h5", "4427e15c3817d83b47846f481ead2d31"),
    ("ply_data_all_6.h5", "56454ba836a77934ca22726666b1f8b4"),
    ("ply_data_all_7.h5", "795c57b238a1addcf63357826985ffbe"),
    ("ply_data_all_8.h5", "57795c1f4206acd14b629909971cb5b6"),
    ("ply_data_all_9.h5", "bd5be19c7719bad69788cf3349f46b6e"),
    ("ply_data_all_10.h5", "24d9c96585a8763f416283f7b1032330"),
    ("ply_data_all_11.h5", "5aba80c6d26f4553a3ba44a5b29d8391"),
    ("ply_data_all_12.h5", "1298f9487271a303cd8728e0eb6db431"),
    ("ply_data_all_13.h5", "9787f12ea1844b584d75d704f1bf15ec"),
    ("ply_data_all_14.h5", "e683dbefbaa6d89291f05e67c128c331"),
    ("ply_data_all_15.h5", "f431f58fe6460bfb842e43da14d363e4"),
    ("ply_data_all_16.h5", "5b46e283f0a5601994c3967466b10b8f"),
    ("ply_data_all_17.h5", "05643a31973875bfc580ba82a19195b9"),
    ("ply_data_all_18.h5", "ca258a7159a892c9d888bcaf8bd621c0"),
    ("ply_data_all_19.h5", "1f5dd15150274c5810c714624102eeed"),
    ("ply_data_all_20.h5", "6d44469f525825d17c046217e4ce6750"),
    ("ply_data_all_21.h5", "aedc2ec2984a058b9d914ba6d9b65159"),
    ("ply_data_all_22.h5", "a01ae14ceff1165ad49e1973570c08c5"),
    ("ply_data_all_23.h5", "67e8c5a7179babe18f110ebea1d3e3b7"),
];

/// 类别名，下标即标签值
pub const S3DIS_CATEGORIES: [&str; 13] = [
    "ceiling", "floor", "wall", "beam", "column", "window", "door", "table", "chair", "sofa",
    "bookcase", "board", "clutter",
];

/// 类别数
pub const NUM_CLASSES: usize = S3DIS_CATEGORIES.len();

/// 标签值对应的类别名，越界返回 `None`
pub fn category_name(label: i64) -> Option<&'static str> {
    usize::try_from(label)
        .ok()
        .and_then(|i| S3DIS_CATEGORIES.get(i).copied())
}

/// 清单条目：相对 `basedir` 的文件名及其 MD5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub md5: String,
}

impl ManifestEntry {
    pub fn new(filename: impl Into<String>, md5: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            md5: md5.into(),
        }
    }
}

/// 数据集在磁盘上的布局与来源
///
/// 默认值即 S3DIS 官方分发；自定义布局可用于镜像或本地重新打包的数据。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetLayout {
    /// `root` 下存放容器文件的子目录
    pub basedir: String,
    /// 容器文件清单，顺序即拼接顺序
    pub files: Vec<ManifestEntry>,
    /// 房间清单文件名（位于 `basedir` 下）
    pub room_filelist: String,
    /// 压缩包下载地址
    pub url: String,
    /// 压缩包 MD5，`None` 时不校验压缩包
    pub archive_md5: Option<String>,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self::s3dis()
    }
}

impl DatasetLayout {
    /// S3DIS 官方布局
    pub fn s3dis() -> Self {
        Self {
            basedir: S3DIS_BASEDIR.to_string(),
            files: S3DIS_FILES
                .iter()
                .map(|&(filename, md5)| ManifestEntry::new(filename, md5))
                .collect(),
            room_filelist: S3DIS_ROOM_FILELIST.to_string(),
            url: S3DIS_URL.to_string(),
            archive_md5: Some(S3DIS_ARCHIVE_MD5.to_string()),
        }
    }

    /// 从 JSON 字符串解析布局（镜像或重新打包的数据）
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::ConfigError(e.to_string()))
    }

    /// 序列化为 JSON，便于保存自定义布局
    pub fn to_json(&self) -> Result<String, DataError> {
        serde_json::to_string_pretty(self).map_err(|e| DataError::ConfigError(e.to_string()))
    }

    /// `root/basedir`
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.basedir)
    }

    /// 房间清单的完整路径
    pub fn room_filelist_path(&self, root: &Path) -> PathBuf {
        self.data_dir(root).join(&self.room_filelist)
    }

    /// 检查清单中所有文件是否存在且 MD5 一致
    ///
    /// 遇到第一个缺失或不一致的文件即返回 `false`；不会触发下载。
    pub fn check_integrity(&self, root: &Path) -> bool {
        let data_dir = self.data_dir(root);
        self.files.iter().all(|entry| {
            let ok = check_integrity(&data_dir.join(&entry.filename), &entry.md5);
            if !ok {
                log::debug!("完整性校验失败: {}", entry.filename);
            }
            ok
        })
    }

    /// 下载并解压数据集到 `root`
    ///
    /// 已通过完整性校验时直接返回，不访问网络。
    pub fn download(&self, root: &Path) -> Result<(), DataError> {
        if self.check_integrity(root) {
            log::info!("文件已下载并校验通过: {:?}", self.data_dir(root));
            return Ok(());
        }
        download_and_extract_archive(&self.url, root, self.archive_md5.as_deref())?;
        Ok(())
    }

    /// 按清单顺序读取全部容器文件
    fn read_blocks(&self, root: &Path) -> Result<Vec<SampleBlock>, DataError> {
        let data_dir = self.data_dir(root);
        self.files
            .iter()
            .map(|entry| -> Result<SampleBlock, DataError> {
                let block = read_container(&data_dir.join(&entry.filename))?;
                log::debug!("读取 {}: {} 个样本", entry.filename, block.num_samples());
                Ok(block)
            })
            .collect()
    }
}

/// S3DIS 加载配置
///
/// 可直接构造、链式设置，或从 JSON 反序列化（缺省字段取默认值）：
/// ```ignore
/// let config = S3disConfig::new().root("data/s3dis").train(false).test_area(6);
/// let config = S3disConfig::from_json_str(r#"{"root": "data/s3dis", "test_area": 6}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3disConfig {
    /// 数据根目录，`None` 则使用默认目录 (~/.cache/torch3d/datasets/s3dis)
    pub root: Option<PathBuf>,
    /// true=训练集，false=测试集
    pub train: bool,
    /// 留作测试集的区域编号
    pub test_area: u32,
    /// true=校验失败时自动下载
    pub download: bool,
}

impl Default for S3disConfig {
    fn default() -> Self {
        Self {
            root: None,
            train: true,
            test_area: DEFAULT_TEST_AREA,
            download: false,
        }
    }
}

impl S3disConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn train(mut self, train: bool) -> Self {
        self.train = train;
        self
    }

    pub fn test_area(mut self, test_area: u32) -> Self {
        self.test_area = test_area;
        self
    }

    pub fn download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::ConfigError(e.to_string()))
    }

    /// 实际使用的数据根目录
    pub fn resolved_root(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| default_data_dir().join("s3dis"))
    }
}

/// 区域标记，如 `Area_5`
pub fn area_token(test_area: u32) -> String {
    format!("Area_{test_area}")
}

/// 计算划分下标（升序）
///
/// 测试集为房间名包含区域标记的样本，训练集为其补集。
/// 注意这里是子串匹配：`Area_1` 同样会匹配 `Area_15_office_1`。
pub fn split_indices<S: AsRef<str>>(rooms: &[S], test_area: u32, train: bool) -> Vec<usize> {
    let token = area_token(test_area);
    rooms
        .iter()
        .enumerate()
        .filter(|(_, room)| {
            let in_test_area = room.as_ref().contains(&token);
            if train { !in_test_area } else { in_test_area }
        })
        .map(|(i, _)| i)
        .collect()
}

/// 读取房间清单：每行去除首尾空白后为一个房间名
pub fn read_room_filelist(path: &Path) -> Result<Vec<String>, DataError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::FileNotFound(path.to_path_buf()),
        _ => DataError::IoError(e),
    })?;
    Ok(content.lines().map(|line| line.trim().to_string()).collect())
}

/// 沿样本维拼接各文件的样本块
///
/// - 点特征须为三维 [n, points_per_sample, feature_dim]，各文件后两维一致
/// - 标签拼接后若为三维且末维为 1，去掉该维（只在拼接后做一次）
/// - 最终标签形状须为 [num_samples, points_per_sample]
pub fn concatenate_blocks(
    blocks: Vec<SampleBlock>,
) -> Result<(Array3<f32>, Array2<i64>), DataError> {
    let Some(first) = blocks.first() else {
        return Err(DataError::FormatError("容器文件清单为空".to_string()));
    };
    let data_tail = first.data.shape().get(1..).unwrap_or_default().to_vec();
    let label_tail = first.label.shape().get(1..).unwrap_or_default().to_vec();

    for block in &blocks {
        if block.data.ndim() != 3 {
            return Err(DataError::FormatError(format!(
                "data 应为三维，实际形状 {:?}",
                block.data.shape()
            )));
        }
        if block.label.ndim() == 0 {
            return Err(DataError::FormatError("label 不能是标量".to_string()));
        }
        if block.data.shape()[1..] != data_tail[..] {
            return Err(DataError::ShapeMismatch {
                expected: data_tail.clone(),
                got: block.data.shape()[1..].to_vec(),
            });
        }
        if block.label.shape()[1..] != label_tail[..] {
            return Err(DataError::ShapeMismatch {
                expected: label_tail.clone(),
                got: block.label.shape()[1..].to_vec(),
            });
        }
        if block.label.len_of(Axis(0)) != block.data.len_of(Axis(0)) {
            return Err(DataError::ShapeMismatch {
                expected: vec![block.data.len_of(Axis(0))],
                got: vec![block.label.len_of(Axis(0))],
            });
        }
    }

    let data_views: Vec<ArrayViewD<f32>> = blocks.iter().map(|b| b.data.view()).collect();
    let label_views: Vec<ArrayViewD<i64>> = blocks.iter().map(|b| b.label.view()).collect();

    let points = concatenate(Axis(0), &data_views)
        .map_err(|e| DataError::FormatError(format!("拼接 data 失败: {e}")))?
        .into_dimensionality::<Ix3>()
        .map_err(|e| DataError::FormatError(format!("data 维度错误: {e}")))?;

    let mut labels: ArrayD<i64> = concatenate(Axis(0), &label_views)
        .map_err(|e| DataError::FormatError(format!("拼接 label 失败: {e}")))?;
    if labels.ndim() == 3 && labels.shape()[2] == 1 {
        labels = labels.index_axis_move(Axis(2), 0);
    }

    let (num_samples, points_per_sample, _) = points.dim();
    let expected = vec![num_samples, points_per_sample];
    if labels.shape() != expected.as_slice() {
        return Err(DataError::ShapeMismatch {
            expected,
            got: labels.shape().to_vec(),
        });
    }
    let labels = labels
        .into_dimensionality::<Ix2>()
        .map_err(|e| DataError::FormatError(format!("label 维度错误: {e}")))?;

    Ok((points, labels))
}

/// S3DIS 点云语义分割数据集
///
/// 构造过程要么完整成功，要么返回错误；构造后数据只读。
#[derive(Clone)]
pub struct S3disDataset {
    /// 点特征 [N, num_points, feature_dim]
    points: Array3<f32>,
    /// 逐点标签 [N, num_points]，取值 0..NUM_CLASSES
    labels: Array2<i64>,
    /// 样本数量
    len: usize,
    /// 是否为训练集
    train: bool,
    /// 留作测试集的区域
    test_area: u32,
    /// 每次 `get` 时执行的样本变换
    transforms: Option<PointTransform>,
}

impl fmt::Debug for S3disDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3disDataset")
            .field("points_shape", &self.points.shape())
            .field("labels_shape", &self.labels.shape())
            .field("train", &self.train)
            .field("test_area", &self.test_area)
            .field("has_transforms", &self.transforms.is_some())
            .finish()
    }
}

impl S3disDataset {
    /// 完整加载 API
    ///
    /// # 参数
    /// - `root`: 数据目录，None 则使用默认 (~/.cache/torch3d/datasets/s3dis)
    /// - `train`: true=训练集，false=测试集
    /// - `test_area`: 留作测试集的区域编号（S3DIS 为 1..=6）
    /// - `download`: true=校验失败时自动下载
    pub fn load(
        root: Option<&str>,
        train: bool,
        test_area: u32,
        download: bool,
    ) -> Result<Self, DataError> {
        let mut config = S3disConfig::new()
            .train(train)
            .test_area(test_area)
            .download(download);
        config.root = root.map(PathBuf::from);
        Self::from_config(&config)
    }

    /// 便捷 API：加载训练集（默认路径，区域 5 为测试集，自动下载）
    pub fn train() -> Result<Self, DataError> {
        Self::load(None, true, DEFAULT_TEST_AREA, true)
    }

    /// 便捷 API：加载测试集（默认路径，区域 5，自动下载）
    pub fn test() -> Result<Self, DataError> {
        Self::load(None, false, DEFAULT_TEST_AREA, true)
    }

    /// 按配置加载官方布局的数据
    pub fn from_config(config: &S3disConfig) -> Result<Self, DataError> {
        Self::load_with_layout(config, &DatasetLayout::s3dis())
    }

    /// 按配置与自定义布局加载
    ///
    /// 1. 需要时下载（已校验通过则跳过）
    /// 2. 完整性校验
    /// 3. 按清单顺序读取并拼接
    /// 4. 读取房间清单，按区域划分并取出对应样本
    pub fn load_with_layout(
        config: &S3disConfig,
        layout: &DatasetLayout,
    ) -> Result<Self, DataError> {
        let root = config.resolved_root();

        if config.download {
            layout.download(&root)?;
        }

        if !layout.check_integrity(&root) {
            return Err(DataError::DatasetNotFoundOrCorrupted(layout.data_dir(&root)));
        }

        let blocks = layout.read_blocks(&root)?;
        let (points, labels) = concatenate_blocks(blocks)?;
        validate_labels(&labels)?;

        let rooms = read_room_filelist(&layout.room_filelist_path(&root))?;
        let num_samples = points.len_of(Axis(0));
        if rooms.len() != num_samples {
            return Err(DataError::FormatError(format!(
                "房间清单有 {} 行，但共有 {} 个样本",
                rooms.len(),
                num_samples
            )));
        }

        let index = split_indices(&rooms, config.test_area, config.train);
        if index.is_empty() {
            log::warn!(
                "区域 {} 的{}为空",
                area_token(config.test_area),
                if config.train { "训练集" } else { "测试集" }
            );
        }
        let points = points.select(Axis(0), &index);
        let labels = labels.select(Axis(0), &index);

        log::info!(
            "S3DIS {}加载完成: {} / {} 个样本（测试区域 {}）",
            if config.train { "训练集" } else { "测试集" },
            index.len(),
            num_samples,
            config.test_area
        );

        Ok(Self {
            points,
            labels,
            len: index.len(),
            train: config.train,
            test_area: config.test_area,
            transforms: None,
        })
    }

    /// 附加样本变换，在每次 `get` 时执行
    ///
    /// 消耗 self，返回带变换的新版本
    pub fn with_transforms(mut self, transforms: PointTransform) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// 包装闭包为变换并附加
    pub fn with_transform_fn<F>(self, f: F) -> Self
    where
        F: Fn(Array2<f32>, Array1<i64>) -> (Array2<f32>, Array1<i64>) + Send + Sync + 'static,
    {
        self.with_transforms(Arc::new(f))
    }

    /// 返回数据集中的样本数量
    pub fn len(&self) -> usize {
        self.len
    }

    /// 数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 获取第 index 个样本
    ///
    /// # 返回
    /// (points, labels) 元组
    /// - points: [num_points, feature_dim]
    /// - labels: [num_points]
    pub fn get(&self, index: usize) -> Result<(Array2<f32>, Array1<i64>), DataError> {
        if index >= self.len {
            return Err(DataError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        let points = self.points.index_axis(Axis(0), index).to_owned();
        let labels = self.labels.index_axis(Axis(0), index).to_owned();

        Ok(match &self.transforms {
            Some(transforms) => transforms(points, labels),
            None => (points, labels),
        })
    }

    /// 每个样本的点数
    pub fn num_points(&self) -> usize {
        self.points.len_of(Axis(1))
    }

    /// 每个点的特征维数
    pub fn feature_dim(&self) -> usize {
        self.points.len_of(Axis(2))
    }

    /// 是否为训练集
    pub fn is_train(&self) -> bool {
        self.train
    }

    /// 留作测试集的区域
    pub fn test_area(&self) -> u32 {
        self.test_area
    }

    /// 类别名表
    pub fn categories(&self) -> &'static [&'static str] {
        &S3DIS_CATEGORIES
    }

    /// 获取所有点特征（未经变换）
    pub fn points(&self) -> &Array3<f32> {
        &self.points
    }

    /// 获取所有标签（未经变换）
    pub fn labels(&self) -> &Array2<i64> {
        &self.labels
    }
}

impl Dataset for S3disDataset {
    type Item = (Array2<f32>, Array1<i64>);

    fn len(&self) -> usize {
        self.len
    }

    fn get(&self, index: usize) -> Result<Self::Item, DataError> {
        S3disDataset::get(self, index)
    }
}

/// 标签须落在 [0, NUM_CLASSES)
fn validate_labels(labels: &Array2<i64>) -> Result<(), DataError> {
    match labels.iter().find(|&&l| l < 0 || l >= NUM_CLASSES as i64) {
        Some(bad) => Err(DataError::FormatError(format!(
            "标签 {bad} 超出范围 [0, {NUM_CLASSES})"
        ))),
        None => Ok(()),
    }
}
