//! data 模块单元测试
//!
//! 测试数据以 .npz 容器写入临时目录，布局与 S3DIS 官方分发一致（仅扩展名不同），
//! MD5 在写入后现场计算，因此无需网络。


use std::fs::File;
use std::path::Path;

use ndarray::{Array, Array2, Array3, Dimension};
use ndarray_npy::NpzWriter;
use tempfile::TempDir;

use crate::data::datasets::{DatasetLayout, ManifestEntry, S3disConfig};
use crate::data::download::compute_file_md5;

/// 不可达的下载地址：若测试意外触发下载会立刻失败
pub(super) const UNREACHABLE_URL: &str = "http://127.0.0.1:9/indoor3d_sem_seg_hdf5_data.zip";

/// 每个样本的点数
pub(super) const POINTS: usize = 4;
/// 每个点的特征维数（xyz + rgb + 归一化 xyz）
pub(super) const CHANNELS: usize = 9;

/// 生成 `n` 个样本，第 i 个样本所有点特征都为 `first_row + i`，
/// 标签为 `(first_row + i) % 13`，便于在划分后核对原始行号。
pub(super) fn make_block(first_row: usize, n: usize) -> (Array3<f32>, Array2<i64>) {
    let points = Array3::from_shape_fn((n, POINTS, CHANNELS), |(i, _, _)| (first_row + i) as f32);
    let labels = Array2::from_shape_fn((n, POINTS), |(i, _)| ((first_row + i) % 13) as i64);
    (points, labels)
}

/// 写入一个 .npz 容器
pub(super) fn write_npz<D1, D2>(
    path: &Path,
    data: Option<&Array<f32, D1>>,
    label: Option<&Array<i64, D2>>,
) where
    D1: Dimension,
    D2: Dimension,
{
    let mut npz = NpzWriter::new(File::create(path).expect("创建 npz 失败"));
    if let Some(data) = data {
        npz.add_array("data", data).expect("写入 data 失败");
    }
    if let Some(label) = label {
        npz.add_array("label", label).expect("写入 label 失败");
    }
    npz.finish().expect("完成 npz 失败");
}

/// 按给定样本块与房间清单构建临时数据集目录，并返回对应布局
pub(super) fn build_fixture(
    blocks: &[(Array3<f32>, Array2<i64>)],
    rooms: &[&str],
) -> (TempDir, DatasetLayout) {
    let dir = TempDir::new().expect("创建临时目录失败");
    let mut layout = empty_layout();
    let data_dir = layout.data_dir(dir.path());
    std::fs::create_dir_all(&data_dir).expect("创建数据目录失败");

    for (i, (points, labels)) in blocks.iter().enumerate() {
        let filename = format!("ply_data_all_{i}.npz");
        let path = data_dir.join(&filename);
        write_npz(&path, Some(points), Some(labels));
        let md5 = compute_file_md5(&path).expect("计算 MD5 失败");
        layout.files.push(ManifestEntry::new(filename, md5));
    }

    write_rooms(&layout, dir.path(), rooms);
    (dir, layout)
}

/// 写入房间清单（每行一个，末尾带换行）
pub(super) fn write_rooms(layout: &DatasetLayout, root: &Path, rooms: &[&str]) {
    let mut content = rooms.join("\n");
    content.push('\n');
    std::fs::write(layout.room_filelist_path(root), content).expect("写入房间清单失败");
}

/// S3DIS 目录结构、空清单、不可达下载地址
pub(super) fn empty_layout() -> DatasetLayout {
    DatasetLayout {
        files: Vec::new(),
        url: UNREACHABLE_URL.to_string(),
        archive_md5: None,
        ..DatasetLayout::s3dis()
    }
}

/// 指向临时目录的配置
pub(super) fn config_for(root: &Path, train: bool, test_area: u32) -> S3disConfig {
    S3disConfig::new()
        .root(root)
        .train(train)
        .test_area(test_area)
}
