//! 季度马赛克合成年度马赛克.
//!
//! 输入和输出都是 `(H, W, C)` 布局的 8-bit 图像. 在某个季度中, 若一个像素所有通道都为 0,
//! 则该像素被视为无数据 (云、缺测), 不参与合成.

use crate::io::read_rgb8_hwc;
use crate::source::Quarter;
use crate::tile::TileKey;
use image::ImageError;
use ndarray::{s, Array3, ArrayView3, ArrayViewMut1, Axis, Zip};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// 合成方式.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CompositeMethod {
    /// 有效观测的均值 (四舍五入).
    #[default]
    Mean,
    /// 有效观测的中位数. 偶数个观测时取中间两个值的均值 (四舍五入).
    Median,
}

/// 合成错误.
#[derive(Debug)]
pub enum CompositeError {
    /// 没有任何输入季度.
    Empty,
    /// 季度之间形状不一致.
    ShapeMismatch {
        /// 第一个季度的形状.
        expected: (usize, usize, usize),
        /// 不一致的形状.
        found: (usize, usize, usize),
    },
    /// 瓦片的四个季度都无法读取.
    NoQuarter(TileKey),
    /// 保存合成结果失败.
    Save(PathBuf, ImageError),
}

impl Display for CompositeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no quarterly mosaic to composite"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "quarter shape {found:?} differs from {expected:?}")
            }
            Self::NoQuarter(key) => write!(f, "no readable quarterly mosaic for tile {key}"),
            Self::Save(p, e) => write!(f, "{}: {e}", p.display()),
        }
    }
}

impl std::error::Error for CompositeError {}

#[inline]
fn mean(values: &mut [u8]) -> u8 {
    let n = values.len() as u32;
    let sum: u32 = values.iter().map(|v| *v as u32).sum();
    ((sum + n / 2) / n) as u8
}

#[inline]
fn median(values: &mut [u8]) -> u8 {
    values.sort_unstable();
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        ((values[n / 2 - 1] as u16 + values[n / 2] as u16 + 1) / 2) as u8
    }
}

/// 逐像素合成多个季度马赛克.
///
/// 所有季度必须形状相同. 某像素在所有季度中都无数据时, 结果为 0.
pub fn composite(
    quarters: &[ArrayView3<u8>],
    method: CompositeMethod,
) -> Result<Array3<u8>, CompositeError> {
    let first = quarters.first().ok_or(CompositeError::Empty)?;
    let expected = first.dim();
    if let Some(q) = quarters.iter().find(|q| q.dim() != expected) {
        return Err(CompositeError::ShapeMismatch {
            expected,
            found: q.dim(),
        });
    }

    let combine: fn(&mut [u8]) -> u8 = match method {
        CompositeMethod::Mean => mean,
        CompositeMethod::Median => median,
    };

    let mut out = Array3::<u8>::zeros(expected);
    let fill = |(r, c): (usize, usize), mut px: ArrayViewMut1<u8>| {
        let valid: Vec<&ArrayView3<u8>> = quarters
            .iter()
            .filter(|q| q.slice(s![r, c, ..]).iter().any(|v| *v != 0))
            .collect();
        if valid.is_empty() {
            return;
        }
        let mut buf = Vec::with_capacity(valid.len());
        for (ch, dst) in px.iter_mut().enumerate() {
            buf.clear();
            buf.extend(valid.iter().map(|q| q[(r, c, ch)]));
            *dst = combine(&mut buf);
        }
    };

    let zip = Zip::indexed(out.lanes_mut(Axis(2)));
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            zip.par_for_each(fill);
        } else {
            zip.for_each(fill);
        }
    }
    Ok(out)
}

/// 读取瓦片 `key` 的四个季度马赛克 (见 [`Quarter::mosaic_path`]) 并合成.
///
/// 无法读取的季度会被跳过并记录警告; 若全部无法读取则返回
/// `CompositeError::NoQuarter`.
pub fn composite_tile<P: AsRef<Path>>(
    dir: P,
    key: &TileKey,
    method: CompositeMethod,
) -> Result<Array3<u8>, CompositeError> {
    let quarters: Vec<Array3<u8>> = Quarter::ALL
        .iter()
        .filter_map(|q| {
            let path = q.mosaic_path(dir.as_ref(), key);
            match read_rgb8_hwc(&path) {
                Ok(arr) => Some(arr),
                Err(e) => {
                    log::warn!("skip quarter Q{} of tile {key}: {e}", q.number());
                    None
                }
            }
        })
        .collect();
    if quarters.is_empty() {
        return Err(CompositeError::NoQuarter(*key));
    }
    log::debug!("compositing {} quarters of tile {key}", quarters.len());

    let views: Vec<ArrayView3<u8>> = quarters.iter().map(|q| q.view()).collect();
    composite(&views, method)
}

/// 将 `(H, W, 3)` 合成结果保存为 png.
pub fn save_composite<P: AsRef<Path>>(path: P, img: ArrayView3<u8>) -> Result<(), CompositeError> {
    let path = path.as_ref();
    let (h, w, c) = img.dim();
    if c != 3 {
        return Err(CompositeError::ShapeMismatch {
            expected: (h, w, 3),
            found: (h, w, c),
        });
    }
    let buf = image::RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([img[(y, x, 0)], img[(y, x, 1)], img[(y, x, 2)]])
    });
    buf.save(path)
        .map_err(|e| CompositeError::Save(path.to_owned(), e))
}
