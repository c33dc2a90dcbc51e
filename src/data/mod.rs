//! 数据加载模块
//!
//! 提供点云数据集的下载、校验、加载、变换和批处理功能。
//!
//! # 主要组件
//!
//! - [`S3disDataset`]: S3DIS 室内点云语义分割数据集（按区域划分训练/测试集）
//! - [`Dataset`]: 可按长度与下标访问的数据集接口
//! - [`DataLoader`]: `PyTorch` 风格的数据批量加载器
//! - [`transforms`]: 样本变换（中心化、单位球缩放、随机采样等）
//! - [`download`]: 下载、MD5 校验与解压
//! - [`DataError`]: 数据加载错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use torch3d::data::{DataLoader, S3disDataset, transforms};
//!
//! let dataset = S3disDataset::load(Some("data/s3dis"), true, 5, true)?
//!     .with_transforms(transforms::center_xyz());
//! let loader = DataLoader::new(dataset, 16).shuffle(true).seed(42);
//!
//! for batch in loader.iter() {
//!     let (points, labels) = batch?;
//!     // ...
//! }
//! ```

pub mod container;
mod dataloader;
mod dataset;
pub mod datasets;
pub mod download;
pub mod error;
pub mod transforms;

#[cfg(test)]
mod tests;

// Re-exports
pub use container::{SampleBlock, read_container};
pub use dataloader::{Collate, DataLoader, DataLoaderIterator};
pub use dataset::Dataset;
pub use datasets::{
    DatasetLayout, ManifestEntry, NUM_CLASSES, S3DIS_CATEGORIES, S3disConfig, S3disDataset,
    default_data_dir,
};
pub use error::DataError;
pub use transforms::PointTransform;
