//! 图像的持久化存储.

use crate::transform::to_rgb_image;
use image::error::{ImageError, ParameterError, ParameterErrorKind};
use image::ImageResult;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};
use std::collections::BTreeMap;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// 对于 `(3, H, W)` 的浮点图像, 取值截断到 `[0, 1]` 后放大到 `[0, 255]`;
/// 对于二值掩膜, 非森林为黑色, 森林为白色.
pub trait ImgWriteVis {
    /// 按照可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 使掩膜像素更有利于单通道可视化. 只接受 0, 1 像素.
#[inline]
pub(crate) fn pretty(label: u8) -> ImageResult<u8> {
    use crate::consts::mask::*;
    match label {
        NON_FOREST => Ok(BLACK),
        FOREST => Ok(WHITE),
        any_else => Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::Generic(format!("掩膜只允许存在 0, 1 像素, 但发现了 `{any_else}`")),
        ))),
    }
}

macro_rules! impl_mask_vis {
    ($($mask: ty),+) => {
        $(
            /// 非森林/森林像素分别映射为黑色/白色. 其他值返回 `ImageError::Parameter`.
            impl ImgWriteVis for $mask {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.dim();
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, image::Luma([pretty(pix)?]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

macro_rules! impl_rgb_vis {
    ($($img: ty),+) => {
        $(
            /// `(3, H, W)`, 取值 `[0, 1]`.
            impl ImgWriteVis for $img {
                fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    to_rgb_image(self.view()).save(path)
                }
            }
        )+
    };
}

impl_mask_vis!(ArrayView2<'_, u8>, Array2<u8>);
impl_rgb_vis!(ArrayView3<'_, f32>, Array3<f32>);

/// 时间序列中某一年的可视化三元组.
#[derive(Clone, Debug)]
pub struct Panel {
    /// 去标准化后的 `(3, H, W)` 图像, 取值约在 `[0, 1]`.
    pub image: Array3<f32>,
    /// 真值掩膜.
    pub gt: Array2<u8>,
    /// 二值化后的预测掩膜.
    pub pred: Array2<u8>,
}

/// 将时间序列样本 `index` 的每一年分别保存为
/// `{index:05}_{year}_img.png`, `{index:05}_{year}_gt.png`, `{index:05}_{year}_pred.png`.
///
/// `out_dir` 不存在时自动创建.
pub fn save_video_panels<P: AsRef<Path>>(
    out_dir: P,
    index: usize,
    panels: &BTreeMap<u16, Panel>,
) -> ImageResult<()> {
    let out_dir = out_dir.as_ref();
    std::fs::create_dir_all(out_dir)?;
    for (year, panel) in panels {
        let stem = format!("{index:05}_{year}");
        panel.image.save(out_dir.join(format!("{stem}_img.png")))?;
        panel.gt.save(out_dir.join(format!("{stem}_gt.png")))?;
        panel.pred.save(out_dir.join(format!("{stem}_pred.png")))?;
    }
    Ok(())
}
