//! 具名数组容器读取
//!
//! 每个容器文件包含两个具名数组：`data`（点特征）和 `label`（逐点类别）。
//! 按扩展名分派：
//! - `.npz`：由 `ndarray-npy` 读取，始终可用
//! - `.h5` / `.hdf5`：需启用 `hdf5` feature

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::ArrayD;
use ndarray_npy::NpzReader;

use super::error::DataError;

/// 点特征字段名
pub const DATA_FIELD: &str = "data";
/// 标签字段名
pub const LABEL_FIELD: &str = "label";

/// 单个容器文件读出的样本块
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    /// 点特征，通常为 [num_samples, points_per_sample, feature_dim]
    pub data: ArrayD<f32>,
    /// 逐点标签，通常为 [num_samples, points_per_sample] 或多一个长度为 1 的尾维
    pub label: ArrayD<i64>,
}

impl SampleBlock {
    /// 样本数（第 0 维长度）
    pub fn num_samples(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }
}

/// 读取容器文件中的 `data` 与 `label` 字段
///
/// 文件句柄只在本函数内持有，无论成功与否都会在返回前释放。
pub fn read_container(path: &Path) -> Result<SampleBlock, DataError> {
    if !path.is_file() {
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "npz" => read_npz(path),
        "h5" | "hdf5" => read_hdf5(path),
        _ => Err(DataError::FormatError(format!("不支持的容器格式: {path:?}"))),
    }
}

fn read_npz(path: &Path) -> Result<SampleBlock, DataError> {
    let file = File::open(path)?;
    let mut npz = NpzReader::new(BufReader::new(file))
        .map_err(|e| DataError::FormatError(format!("无法解析 {path:?}: {e}")))?;

    let names = npz
        .names()
        .map_err(|e| DataError::FormatError(format!("无法列出 {path:?} 的字段: {e}")))?;
    let missing =
        |field: &str| DataError::FormatError(format!("{path:?} 缺少字段 \"{field}\""));
    let data_entry = entry_name(&names, DATA_FIELD).ok_or_else(|| missing(DATA_FIELD))?;
    let label_entry = entry_name(&names, LABEL_FIELD).ok_or_else(|| missing(LABEL_FIELD))?;

    let data: ArrayD<f32> = npz
        .by_name(data_entry)
        .map_err(|e| DataError::FormatError(format!("读取 {path:?} 的 data 失败: {e}")))?;
    let label = read_npz_label(&mut npz, label_entry, path)?;

    Ok(SampleBlock { data, label })
}

/// 字段在 npz 中的实际条目名：`ndarray-npy` 写入 `field`，numpy 写入 `field.npy`
fn entry_name<'a>(names: &'a [String], field: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.as_str() == field || n.strip_suffix(".npy") == Some(field))
        .map(String::as_str)
}

/// 标签可能以 i64 / i32 / u8 存储，统一拓宽为 i64
fn read_npz_label<R>(
    npz: &mut NpzReader<R>,
    entry: &str,
    path: &Path,
) -> Result<ArrayD<i64>, DataError>
where
    R: std::io::Read + std::io::Seek,
{
    let first_err = match npz.by_name::<ndarray::OwnedRepr<i64>, _>(entry) {
        Ok(label) => return Ok(label),
        Err(e) => e,
    };
    if let Ok(label) = npz.by_name::<ndarray::OwnedRepr<i32>, ndarray::IxDyn>(entry) {
        return Ok(label.mapv(i64::from));
    }
    if let Ok(label) = npz.by_name::<ndarray::OwnedRepr<u8>, ndarray::IxDyn>(entry) {
        return Ok(label.mapv(i64::from));
    }
    Err(DataError::FormatError(format!("读取 {path:?} 的 label 失败: {first_err}")))
}

#[cfg(feature = "hdf5")]
fn read_hdf5(path: &Path) -> Result<SampleBlock, DataError> {
    let to_format_err = |e: hdf5::Error| DataError::FormatError(format!("{path:?}: {e}"));

    let file = hdf5::File::open(path).map_err(to_format_err)?;
    for field in [DATA_FIELD, LABEL_FIELD] {
        if !file.link_exists(field) {
            return Err(DataError::FormatError(format!("{path:?} 缺少字段 \"{field}\"")));
        }
    }

    let data = file
        .dataset(DATA_FIELD)
        .and_then(|ds| ds.read_dyn::<f32>())
        .map_err(to_format_err)?;
    let label = file
        .dataset(LABEL_FIELD)
        .and_then(|ds| ds.read_dyn::<i64>())
        .map_err(to_format_err)?;

    Ok(SampleBlock { data, label })
}

#[cfg(not(feature = "hdf5"))]
fn read_hdf5(path: &Path) -> Result<SampleBlock, DataError> {
    Err(DataError::FormatError(format!("读取 {path:?} 需要启用 `hdf5` feature")))
}
