//! 数据集接口
//!
//! 任何可按长度与下标访问的样本集合都可实现 [`Dataset`]，
//! 从而交给 [`DataLoader`](super::DataLoader) 分批迭代。

use super::error::DataError;

/// 可按下标随机访问的数据集
pub trait Dataset {
    /// 单个样本的类型
    type Item;

    /// 样本数量
    fn len(&self) -> usize;

    /// 获取第 `index` 个样本，越界时返回 [`DataError::IndexOutOfBounds`]
    fn get(&self, index: usize) -> Result<Self::Item, DataError>;

    /// 数据集是否为空
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D: Dataset + ?Sized> Dataset for &D {
    type Item = D::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Result<Self::Item, DataError> {
        (**self).get(index)
    }
}
