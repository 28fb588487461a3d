//! 低缩放级别掩膜的上采样.
//!
//! 标签往往只在较低的缩放级别上提供 (如 z = 12), 而图像瓦片位于更高的级别
//! (如 z = 13, 14). 对于一个高级别瓦片, 先在低级别掩膜中找到它覆盖的窗口,
//! 再用最近邻插值放大到瓦片大小. 最近邻插值保证结果仍是二值的.

use crate::io::{read_mask, LoadError};
use crate::tile::TileKey;
use crate::Idx2d;
use ndarray::{s, Array2, ArrayView2};
use std::path::Path;

/// 最近邻缩放到 `(out_h, out_w)`.
///
/// 输出像素 `(r, c)` 取输入像素 `(r * h / out_h, c * w / out_w)`.
/// 输入或输出为空时返回空数组.
pub fn resize_nearest<T: Copy + Default>(src: ArrayView2<T>, (out_h, out_w): Idx2d) -> Array2<T> {
    let (h, w) = src.dim();
    if h == 0 || w == 0 {
        return Array2::default((out_h, out_w));
    }
    Array2::from_shape_fn((out_h, out_w), |(r, c)| src[(r * h / out_h, c * w / out_w)])
}

/// 以整数倍 `factor` 进行最近邻放大. 每个像素扩展为 `factor x factor` 的块.
pub fn upsample_nearest<T: Copy + Default>(src: ArrayView2<T>, factor: usize) -> Array2<T> {
    let (h, w) = src.dim();
    resize_nearest(src, (h * factor, w * factor))
}

/// 从低缩放级别瓦片 `mask_key` 的掩膜 `mask` 中, 得到高缩放级别瓦片
/// `target_key` 对应的 `out_size x out_size` 掩膜.
///
/// # 注意
///
/// 1. `mask` 必须是正方形, 否则返回 `LoadError::ShapeMismatch`.
/// 2. `mask_key` 必须在空间上包含 `target_key`, 且 `mask` 边长能被
///   `2^(target.z - mask.z)` 整除, 否则返回 `LoadError::Zoom`.
/// 3. 年份不参与比较.
pub fn upsample_mask(
    mask: ArrayView2<u8>,
    mask_key: &TileKey,
    target_key: &TileKey,
    out_size: usize,
) -> Result<Array2<u8>, LoadError> {
    let (h, w) = mask.dim();
    if h != w {
        return Err(LoadError::ShapeMismatch {
            expected: vec![h, h],
            found: vec![h, w],
        });
    }
    let (row0, col0, size) = target_key.window_in(mask_key, h)?;
    let window = mask.slice(s![row0..row0 + size, col0..col0 + size]);
    Ok(resize_nearest(window, (out_size, out_size)))
}

/// 读取路径为 `mask_path` 的低缩放级别掩膜 (文件名必须能解析为瓦片),
/// 并上采样为 `target_key` 对应的 `out_size x out_size` 掩膜.
pub fn upsample_mask_file<P: AsRef<Path>>(
    mask_path: P,
    target_key: &TileKey,
    out_size: usize,
) -> Result<Array2<u8>, LoadError> {
    let mask_path = mask_path.as_ref();
    let mask_key =
        TileKey::from_path(mask_path).map_err(|e| LoadError::Tile(mask_path.to_owned(), e))?;
    let mask = read_mask(mask_path)?;
    upsample_mask(mask.view(), &mask_key, target_key, out_size)
}
