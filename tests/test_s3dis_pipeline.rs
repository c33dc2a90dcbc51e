/*
 * @Description  : S3DIS 加载流水线集成测试
 *                 验证：夹具写入 → 完整性校验 → 拼接 → 按区域划分 → 变换 → DataLoader 分批
 *                 数据以 .npz 容器写入临时目录，不需要网络
 */

use std::fs::File;
use std::path::Path;

use ndarray::{Array2, Array3};
use ndarray_npy::NpzWriter;
use torch3d::data::download::compute_file_md5;
use torch3d::data::transforms::{center_xyz, compose, scale_to_unit_sphere};
use torch3d::data::{
    DataError, DataLoader, DatasetLayout, ManifestEntry, NUM_CLASSES, S3disConfig, S3disDataset,
};

const POINTS: usize = 16;
const CHANNELS: usize = 9;

/// 六个区域各若干房间，每个房间两个样本块
const ROOMS: [&str; 8] = [
    "Area_1_office_1",
    "Area_2_hallway_1",
    "Area_3_lobby_1",
    "Area_4_WC_1",
    "Area_5_office_1",
    "Area_5_conferenceRoom_2",
    "Area_6_pantry_1",
    "Area_6_openspace_1",
];

/// 写入 `num_files` 个容器，样本依次编号，xyz 取值随编号和点序号变化
fn write_dataset(root: &Path, num_files: usize) -> DatasetLayout {
    let mut layout = DatasetLayout {
        files: Vec::new(),
        url: "http://127.0.0.1:9/indoor3d_sem_seg_hdf5_data.zip".to_string(),
        archive_md5: None,
        ..DatasetLayout::s3dis()
    };
    let data_dir = layout.data_dir(root);
    std::fs::create_dir_all(&data_dir).unwrap();

    let samples_per_room = 2;
    let total = ROOMS.len() * samples_per_room;
    let per_file = total / num_files;
    let mut rooms = Vec::with_capacity(total);

    for f in 0..num_files {
        let first = f * per_file;
        let data = Array3::from_shape_fn((per_file, POINTS, CHANNELS), |(i, j, k)| {
            let sample = (first + i) as f32;
            if k < 3 { sample + j as f32 * 0.1 } else { 0.5 }
        });
        let label = Array2::from_shape_fn((per_file, POINTS), |(i, j)| {
            ((first + i + j) % NUM_CLASSES) as i64
        });

        let filename = format!("ply_data_all_{f}.npz");
        let path = data_dir.join(&filename);
        let mut npz = NpzWriter::new(File::create(&path).unwrap());
        npz.add_array("data", &data).unwrap();
        npz.add_array("label", &label).unwrap();
        npz.finish().unwrap();

        layout
            .files
            .push(ManifestEntry::new(filename, compute_file_md5(&path).unwrap()));
    }

    for room in ROOMS {
        for _ in 0..samples_per_room {
            rooms.push(room);
        }
    }
    std::fs::write(layout.room_filelist_path(root), rooms.join("\n") + "\n").unwrap();

    layout
}

#[test]
fn test_s3dis_pipeline() -> Result<(), DataError> {
    println!("\n{}", "=".repeat(60));
    println!("=== S3DIS 加载流水线集成测试 ===");
    println!("{}\n", "=".repeat(60));

    // ========== 1. 写入夹具 ==========
    let dir = tempfile::TempDir::new()?;
    let layout = write_dataset(dir.path(), 4);
    assert!(layout.check_integrity(dir.path()));
    println!("[1/3] 夹具写入完成: {} 个容器文件", layout.files.len());

    // ========== 2. 按区域划分 ==========
    let config = S3disConfig::new().root(dir.path()).download(true);
    let train = S3disDataset::load_with_layout(&config, &layout)?;
    let test = S3disDataset::load_with_layout(&config.clone().train(false), &layout)?;

    assert_eq!(train.len(), 12);
    assert_eq!(test.len(), 4);
    assert_eq!(train.num_points(), POINTS);
    assert_eq!(train.feature_dim(), CHANNELS);
    // 测试集为 Area_5 的两个房间，即原始第 8..12 个样本
    let first_ids: Vec<f32> = (0..test.len())
        .map(|i| test.points()[[i, 0, 0]])
        .collect();
    assert_eq!(first_ids, vec![8.0, 9.0, 10.0, 11.0]);
    println!("[2/3] 训练集 {} 个样本，测试集 {} 个样本", train.len(), test.len());

    // ========== 3. 变换 + 分批 ==========
    let train = train.with_transforms(compose(vec![center_xyz(), scale_to_unit_sphere()]));
    let loader = DataLoader::new(train, 5).shuffle(true).seed(7);
    assert_eq!(loader.num_batches(), 3);

    let mut seen = 0;
    for batch in loader.iter() {
        let (points, labels) = batch?;
        assert_eq!(points.shape()[1..], [POINTS, CHANNELS]);
        assert_eq!(labels.shape()[1], POINTS);
        assert!(labels.iter().all(|&l| (0..NUM_CLASSES as i64).contains(&l)));
        // 变换后 xyz 在单位球内
        for sample in points.outer_iter() {
            for point in sample.outer_iter() {
                let norm = (point[0].powi(2) + point[1].powi(2) + point[2].powi(2)).sqrt();
                assert!(norm <= 1.0 + 1e-5, "点模长 {norm} 超出单位球");
            }
        }
        seen += points.shape()[0];
    }
    assert_eq!(seen, 12);
    println!("[3/3] 分批迭代完成: {seen} 个样本");

    Ok(())
}

#[test]
fn test_s3dis_every_area_partitions_samples() -> Result<(), DataError> {
    let dir = tempfile::TempDir::new()?;
    let layout = write_dataset(dir.path(), 2);

    for area in 1..=6 {
        let config = S3disConfig::new().root(dir.path()).test_area(area);
        let train = S3disDataset::load_with_layout(&config, &layout)?;
        let test = S3disDataset::load_with_layout(&config.clone().train(false), &layout)?;
        assert_eq!(train.len() + test.len(), ROOMS.len() * 2, "区域 {area}");
        assert!(!test.is_empty(), "区域 {area} 的测试集不应为空");
    }
    Ok(())
}

#[test]
fn test_s3dis_corrupted_root_fails_whole_construction() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut layout = write_dataset(dir.path(), 2);
    layout.files[1].md5 = "ffffffffffffffffffffffffffffffff".to_string();

    let config = S3disConfig::new().root(dir.path());
    match S3disDataset::load_with_layout(&config, &layout) {
        Err(DataError::DatasetNotFoundOrCorrupted(path)) => {
            assert!(path.ends_with("indoor3d_sem_seg_hdf5_data"));
        }
        other => panic!("期望数据集损坏错误，实际: {other:?}"),
    }
}
