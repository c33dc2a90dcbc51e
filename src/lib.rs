//! # torch3d
//!
//! `torch3d` 为三维点云机器学习提供数据侧的基础设施：
//! 数据集的下载与 MD5 校验、具名数组容器的读取与拼接、
//! 按区域划分训练/测试集，以及 `PyTorch` 风格的样本变换与批量加载。
//!

pub mod data;
