//! 内置数据集
//!
//! 提供常用的预定义数据集：
//! - S3DIS：室内场景逐点语义分割（按区域划分训练/测试集）

use std::path::PathBuf;

mod s3dis;

pub use s3dis::{
    DEFAULT_TEST_AREA, DatasetLayout, ManifestEntry, NUM_CLASSES, S3DIS_ARCHIVE_MD5, S3DIS_BASEDIR,
    S3DIS_CATEGORIES, S3DIS_FILES, S3DIS_ROOM_FILELIST, S3DIS_URL, S3disConfig, S3disDataset,
    area_token, category_name, concatenate_blocks, read_room_filelist, split_indices,
};

/// 获取默认数据目录
pub fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("torch3d")
        .join("datasets")
}
