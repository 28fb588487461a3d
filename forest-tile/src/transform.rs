//! 图像张量变换.

use crate::consts::{CHANNELS, LANDSAT_MEAN, LANDSAT_STD};
use ndarray::{Array3, ArrayView3, ArrayViewMut3, Axis};
use std::fmt::{self, Display, Formatter};

/// 构建 [`Normalize`] 时的参数错误.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NormalizeError {
    /// 第 `.0` 个通道的标准差不是有限正数.
    InvalidStd(usize),
    /// 第 `.0` 个通道的均值不是有限数.
    InvalidMean(usize),
}

impl Display for NormalizeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidStd(c) => write!(f, "std of channel {c} must be finite and positive"),
            Self::InvalidMean(c) => write!(f, "mean of channel {c} must be finite"),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// 逐通道标准化: `(v - mean[c]) / std[c]`.
///
/// 只读. 若要修改参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normalize {
    mean: [f32; CHANNELS],
    std: [f32; CHANNELS],
}

impl Default for Normalize {
    #[inline]
    fn default() -> Self {
        Self::landsat()
    }
}

impl Normalize {
    /// 构建标准化变换. 标准差必须是有限正数, 均值必须是有限数.
    pub fn new(mean: [f32; CHANNELS], std: [f32; CHANNELS]) -> Result<Self, NormalizeError> {
        if let Some(c) = mean.iter().position(|m| !m.is_finite()) {
            return Err(NormalizeError::InvalidMean(c));
        }
        if let Some(c) = std.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(NormalizeError::InvalidStd(c));
        }
        Ok(Self { mean, std })
    }

    /// Landsat 年度马赛克的统计量.
    #[inline]
    pub const fn landsat() -> Self {
        Self {
            mean: LANDSAT_MEAN,
            std: LANDSAT_STD,
        }
    }

    /// 各通道均值.
    #[inline]
    pub fn mean(&self) -> [f32; CHANNELS] {
        self.mean
    }

    /// 各通道标准差.
    #[inline]
    pub fn std(&self) -> [f32; CHANNELS] {
        self.std
    }

    /// 就地标准化 `(3, H, W)` 图像.
    ///
    /// 通道数不为 3 时程序 panic.
    pub fn apply(&self, mut img: ArrayViewMut3<f32>) {
        assert_eq!(img.len_of(Axis(0)), CHANNELS, "只支持 3 通道图像");
        for (c, mut plane) in img.axis_iter_mut(Axis(0)).enumerate() {
            let (m, s) = (self.mean[c], self.std[c]);
            plane.mapv_inplace(|v| (v - m) / s);
        }
    }

    /// 标准化的逆变换: `v * std[c] + mean[c]`.
    ///
    /// 通道数不为 3 时程序 panic.
    pub fn inverse(&self, img: ArrayView3<f32>) -> Array3<f32> {
        assert_eq!(img.len_of(Axis(0)), CHANNELS, "只支持 3 通道图像");
        let mut out = img.to_owned();
        for (c, mut plane) in out.axis_iter_mut(Axis(0)).enumerate() {
            let (m, s) = (self.mean[c], self.std[c]);
            plane.mapv_inplace(|v| v * s + m);
        }
        out
    }
}

/// 将 `(3, H, W)`、取值约在 `[0, 1]` 的图像转换为 8-bit RGB 图像. 超出范围的值被截断.
pub fn to_rgb_image(img: ArrayView3<f32>) -> image::RgbImage {
    let (_, h, w) = img.dim();
    image::RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        image::Rgb([0, 1, 2].map(|c| unit_to_u8(img[(c, y, x)])))
    })
}

/// `[0, 1] -> [0, 255]`. NaN 映射为 0.
#[inline]
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(
            Normalize::new([0.0; 3], [1.0, 0.0, 1.0]),
            Err(NormalizeError::InvalidStd(1))
        );
        assert_eq!(
            Normalize::new([0.0, 0.0, f32::NAN], [1.0; 3]),
            Err(NormalizeError::InvalidMean(2))
        );
        assert!(Normalize::new([0.5; 3], [0.25; 3]).is_ok());
    }

    #[test]
    fn test_apply_and_inverse() {
        let norm = Normalize::landsat();
        let mut img = Array3::from_elem((3, 2, 2), 0.5f32);
        norm.apply(img.view_mut());
        assert!(float_eq(img[(0, 0, 0)], (0.5 - 0.3326) / 0.1059));
        assert!(float_eq(img[(2, 1, 1)], (0.5 - 0.2224) / 0.1283));

        let back = norm.inverse(img.view());
        assert!(back.iter().all(|v| float_eq(*v, 0.5)));
    }

    #[test]
    fn test_to_rgb_image() {
        let mut img = Array3::zeros((3, 1, 2));
        img[(0, 0, 1)] = 1.5;
        img[(1, 0, 1)] = 0.5;
        img[(2, 0, 1)] = -1.0;
        let out = to_rgb_image(img.view());
        assert_eq!(out.dimensions(), (2, 1));
        assert_eq!(out.get_pixel(1, 0).0, [255, 128, 0]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(unit_to_u8(f32::NAN), 0);
    }
}
