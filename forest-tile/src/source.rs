//! 瓦片到文件路径的映射.
//!
//! 所有马赛克与标签都按年份分目录存放: `{dir}/{year}/{prefix}{year}_{z}_{x}_{y}.{ext}`.

use crate::consts::{prefix, FIRST_GENERATED_YEAR};
use crate::tile::{ParseTileError, TileKey};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 图像马赛克来源.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageSource {
    /// 预处理过的 Planet 马赛克, 以 `(3, H, W)` 的 npy 存储.
    Planet,
    /// Landsat 年度马赛克, png.
    Landsat,
    /// 转换到 Landsat 风格的 Planet 马赛克, png.
    PlanetToLandsat,
}

impl ImageSource {
    /// 根据图像目录名推断来源.
    ///
    /// 目录包含 `planet2landsat` 时为 [`ImageSource::PlanetToLandsat`];
    /// 否则包含 `landsat` 时为 [`ImageSource::Landsat`]; 其余情况为
    /// [`ImageSource::Planet`].
    pub fn infer<P: AsRef<Path>>(img_dir: P) -> Self {
        let dir = img_dir.as_ref().to_string_lossy();
        if dir.contains("planet2landsat") {
            Self::PlanetToLandsat
        } else if dir.contains("landsat") {
            Self::Landsat
        } else {
            Self::Planet
        }
    }

    /// 文件名前缀.
    #[inline]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Landsat => prefix::LANDSAT,
            Self::Planet | Self::PlanetToLandsat => prefix::PLANET,
        }
    }

    /// 文件扩展名.
    #[inline]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Planet => "npy",
            Self::Landsat | Self::PlanetToLandsat => "png",
        }
    }

    /// 瓦片 `key` 在 `img_dir` 下的图像路径.
    pub fn image_path<P: AsRef<Path>>(&self, img_dir: P, key: &TileKey) -> PathBuf {
        year_dir(img_dir, key.year).join(key.filename(self.prefix(), self.extension()))
    }
}

/// 季度.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quarter {
    /// 1-3 月.
    Q1,
    /// 4-6 月.
    Q2,
    /// 7-9 月.
    Q3,
    /// 10-12 月.
    Q4,
}

impl Quarter {
    /// 全部季度, 按时间顺序.
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    /// 季度序号, 从 1 开始.
    #[inline]
    pub fn number(&self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    /// 季度马赛克路径: `{dir}/{year}/q{n}/pl{year}_{z}_{x}_{y}.png`.
    pub fn mosaic_path<P: AsRef<Path>>(&self, dir: P, key: &TileKey) -> PathBuf {
        year_dir(dir, key.year)
            .join(format!("q{}", self.number()))
            .join(key.filename(prefix::PLANET, "png"))
    }
}

#[inline]
fn year_dir<P: AsRef<Path>>(dir: P, year: u16) -> PathBuf {
    dir.as_ref().join(year.to_string())
}

/// 瓦片 `key` 在 `img_dir` 下的图像路径, 来源由目录名推断.
#[inline]
pub fn image_path<P: AsRef<Path>>(img_dir: P, key: &TileKey) -> PathBuf {
    ImageSource::infer(img_dir.as_ref()).image_path(img_dir, key)
}

/// 瓦片 `key` 在 `label_dir` 下的森林覆盖标签路径:
/// `{label_dir}/{year}/fc{year}_{z}_{x}_{y}.npy`.
#[inline]
pub fn label_path<P: AsRef<Path>>(label_dir: P, key: &TileKey) -> PathBuf {
    year_dir(label_dir, key.year).join(key.filename(prefix::FOREST_COVER, "npy"))
}

/// 根据掩膜文件名找到同一瓦片的图像路径.
pub fn image_for_mask<P: AsRef<Path>, Q: AsRef<Path>>(
    mask_path: P,
    img_dir: Q,
) -> Result<PathBuf, ParseTileError> {
    let key = TileKey::from_path(mask_path)?;
    Ok(image_path(img_dir, &key))
}

/// 视频预测结果中某个生成年份的帧路径:
/// `{video_dir}/{spatial_key}/gen_image_00000_00_0{i}.png`, 其中 `i = year - 2015`.
///
/// `year` 早于第一个生成年份时返回 `None`.
pub fn video_frame_path<P: AsRef<Path>>(video_dir: P, spatial_key: &str, year: u16) -> Option<PathBuf> {
    let frame = year.checked_sub(FIRST_GENERATED_YEAR)?;
    Some(
        video_dir
            .as_ref()
            .join(spatial_key)
            .join(format!("gen_image_00000_00_0{frame}.png")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TileKey {
        TileKey::new(2017, 12, 1223, 2516).unwrap()
    }

    #[test]
    fn test_infer_source() {
        assert_eq!(
            ImageSource::infer("/mnt/data/planet2landsat/min_pct"),
            ImageSource::PlanetToLandsat
        );
        assert_eq!(
            ImageSource::infer("/mnt/data/landsat/min_pct"),
            ImageSource::Landsat
        );
        assert_eq!(ImageSource::infer("/mnt/data/planet"), ImageSource::Planet);
    }

    #[test]
    fn test_image_path() {
        assert_eq!(
            image_path("/d/landsat", &key()),
            PathBuf::from("/d/landsat/2017/ld2017_12_1223_2516.png")
        );
        assert_eq!(
            image_path("/d/planet2landsat", &key()),
            PathBuf::from("/d/planet2landsat/2017/pl2017_12_1223_2516.png")
        );
        assert_eq!(
            image_path("/d/planet", &key()),
            PathBuf::from("/d/planet/2017/pl2017_12_1223_2516.npy")
        );
    }

    #[test]
    fn test_label_and_mask_mapping() {
        assert_eq!(
            label_path("/d/fc", &key()),
            PathBuf::from("/d/fc/2017/fc2017_12_1223_2516.npy")
        );
        assert_eq!(
            image_for_mask("/d/fc/2017/fc2017_12_1223_2516.npy", "/d/landsat").unwrap(),
            PathBuf::from("/d/landsat/2017/ld2017_12_1223_2516.png")
        );
        assert!(image_for_mask("/d/fc/2017/readme", "/d/landsat").is_err());
    }

    #[test]
    fn test_quarter_and_video_paths() {
        assert_eq!(
            Quarter::Q3.mosaic_path("/d/quarterly", &key()),
            PathBuf::from("/d/quarterly/2017/q3/pl2017_12_1223_2516.png")
        );
        assert_eq!(
            video_frame_path("/v", "12_1223_2516", 2016),
            Some(PathBuf::from("/v/12_1223_2516/gen_image_00000_00_01.png"))
        );
        assert_eq!(video_frame_path("/v", "12_1223_2516", 2014), None);
    }
}
