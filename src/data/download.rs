//! 通用下载工具
//!
//! 提供 HTTP 下载、MD5 校验和 zip 解压功能，供各数据集复用。

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use super::error::DataError;

/// 下载文件并保存到指定路径
///
/// 响应体以流的方式写入磁盘，不会整体读入内存。
///
/// # 参数
/// - `url`: 下载地址
/// - `dest_path`: 保存路径
/// - `expected_md5`: 可选的 MD5 校验码，提供时会验证下载内容
///
/// # 返回
/// - 成功返回 `Ok(())`
/// - 失败返回 `DataError::DownloadError` 或 `DataError::ChecksumMismatch`
pub fn download_file(
    url: &str,
    dest_path: &Path,
    expected_md5: Option<&str>,
) -> Result<(), DataError> {
    log::info!("正在下载 {url} ...");

    let response = ureq::get(url)
        .call()
        .map_err(|e| DataError::DownloadError(format!("HTTP 请求失败: {e}")))?;

    if response.status() != 200 {
        return Err(DataError::DownloadError(format!(
            "HTTP 状态码: {}",
            response.status()
        )));
    }

    let mut writer = BufWriter::new(File::create(dest_path)?);
    io::copy(&mut response.into_reader(), &mut writer)
        .map_err(|e| DataError::DownloadError(format!("读取响应失败: {e}")))?;
    writer.flush()?;
    drop(writer);

    // MD5 校验（如果提供了预期值）
    if let Some(expected) = expected_md5 {
        let actual = compute_file_md5(dest_path)?;
        if actual != expected {
            return Err(DataError::ChecksumMismatch {
                expected: expected.to_string(),
                got: actual,
            });
        }
        log::info!("MD5 校验通过: {actual}");
    }

    log::info!("下载完成: {dest_path:?}");
    Ok(())
}

/// 将 zip 压缩包解压到目标目录
///
/// 条目路径若试图逃出 `dest_dir`（如 `../x`、绝对路径），返回解压错误。
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<(), DataError> {
    log::info!("正在解压 {archive_path:?} 到 {dest_dir:?} ...");

    let file = File::open(archive_path)
        .map_err(|_| DataError::FileNotFound(archive_path.to_path_buf()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| DataError::DecompressionError(format!("无法打开压缩包: {e}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| {
                DataError::DecompressionError(format!("读取第 {i} 个条目失败: {e}"))
            })?;

        let relative = entry.enclosed_name().map(Path::to_path_buf).ok_or_else(|| {
            DataError::DecompressionError(format!("非法条目路径: {}", entry.name()))
        })?;
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&out_path)?);
        io::copy(&mut entry, &mut out).map_err(|e| {
            DataError::DecompressionError(format!("解压 {out_path:?} 失败: {e}"))
        })?;
        out.flush()?;
    }

    log::info!("解压完成，共 {} 个条目", archive.len());
    Ok(())
}

/// 下载压缩包到 `root` 并解压到 `root`
///
/// 压缩包保存为 `root/<url 最后一段>`，解压后保留。
pub fn download_and_extract_archive(
    url: &str,
    root: &Path,
    expected_md5: Option<&str>,
) -> Result<PathBuf, DataError> {
    let archive_name = url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| DataError::DownloadError(format!("无法从 URL 推断文件名: {url}")))?;

    std::fs::create_dir_all(root)?;
    let archive_path = root.join(archive_name);
    download_file(url, &archive_path, expected_md5)?;
    extract_archive(&archive_path, root)?;
    Ok(archive_path)
}

/// 检查文件是否存在且 MD5 与预期一致
///
/// 文件缺失、不可读或校验不符都返回 `false`，不会报错。
pub fn check_integrity(path: &Path, expected_md5: &str) -> bool {
    if !path.is_file() {
        return false;
    }
    match compute_file_md5(path) {
        Ok(actual) => actual == expected_md5,
        Err(e) => {
            log::debug!("计算 {path:?} 的 MD5 失败: {e}");
            false
        }
    }
}

/// 计算数据的 MD5 校验码
pub fn compute_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// 流式计算文件的 MD5 校验码
pub fn compute_file_md5(path: &Path) -> Result<String, DataError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Md5::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
