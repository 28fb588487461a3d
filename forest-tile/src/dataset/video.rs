//! 2013-2017 时间序列数据集.
//!
//! 视频预测结果目录下的每个子目录 (名为空间键 `z_x_y`) 对应一个样本.
//! 2013, 2014 两年使用真实 Landsat 瓦片, 2015-2017 使用视频预测生成的帧,
//! 标签则全部来自森林覆盖标签目录.

use super::{is_hidden, load_pair, sorted_entries, Dataset, Sample};
use crate::consts::{prefix, YEARS};
use crate::io::LoadError;
use crate::source::video_frame_path;
use crate::tile::TileKey;
use crate::transform::Normalize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 某一年的图像与标签路径.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YearPaths {
    /// 该年的瓦片.
    pub tile: TileKey,
    /// 图像路径.
    pub image: PathBuf,
    /// 标签路径.
    pub label: PathBuf,
}

/// 时间序列样本: 同一空间位置 2013-2017 每年的图像与掩膜.
#[derive(Clone, Debug)]
pub struct VideoSample {
    /// 空间键 `z_x_y`.
    pub key: String,
    /// 按年份排列的样本.
    pub frames: BTreeMap<u16, Sample>,
}

/// 时间序列数据集.
#[derive(Clone, Debug)]
pub struct VideoDataset {
    img_dir: PathBuf,
    label_dir: PathBuf,
    video_dir: PathBuf,
    keys: Vec<String>,
    normalize: Normalize,
}

impl VideoDataset {
    /// 以 `video_dir` 的直接子目录名 (隐藏目录除外) 为空间键建立数据集, 按名字排序后截断到至多
    /// `max_len` 个 (`None` 表示不限).
    ///
    /// `video_dir` 不是目录时返回 `LoadError::NotADirectory`.
    pub fn new<P, Q, R>(
        img_dir: P,
        label_dir: Q,
        video_dir: R,
        max_len: Option<usize>,
    ) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        R: AsRef<Path>,
    {
        let video_dir = video_dir.as_ref().to_owned();
        let mut keys: Vec<String> = sorted_entries(&video_dir, |p| p.is_dir() && !is_hidden(p))?
            .into_iter()
            .filter_map(|p| p.file_name().and_then(|s| s.to_str()).map(str::to_owned))
            .collect();
        keys.sort();
        if let Some(max_len) = max_len {
            keys.truncate(max_len);
        }
        log::info!("video dataset: {} tiles under {}", keys.len(), video_dir.display());

        Ok(Self {
            img_dir: img_dir.as_ref().to_owned(),
            label_dir: label_dir.as_ref().to_owned(),
            video_dir,
            keys,
            normalize: Normalize::landsat(),
        })
    }

    /// 显式指定标准化参数.
    #[inline]
    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    /// 标准化参数.
    #[inline]
    pub fn normalize(&self) -> &Normalize {
        &self.normalize
    }

    /// 全部空间键.
    #[inline]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 第 `index` 个样本每一年的图像与标签路径. 越界时程序 panic.
    ///
    /// 文件名直接使用目录名作为空间键, 不做规范化.
    ///
    /// - 真实年份: `{img_dir}/{year}/ld{year}_{key}.png`;
    /// - 生成年份: `{video_dir}/{key}/gen_image_00000_00_0{year - 2015}.png`;
    /// - 标签: `{label_dir}/{year}/fc{year}_{key}.npy`.
    pub fn paths(&self, index: usize) -> Result<BTreeMap<u16, YearPaths>, LoadError> {
        let key = &self.keys[index];
        let mut ans = BTreeMap::new();
        for year in YEARS {
            let tile = TileKey::parse_spatial(year, key)
                .map_err(|e| LoadError::Tile(self.video_dir.join(key), e))?;
            let year_str = year.to_string();
            let image = video_frame_path(&self.video_dir, key, year).unwrap_or_else(|| {
                self.img_dir
                    .join(&year_str)
                    .join(format!("{}{year}_{key}.png", prefix::LANDSAT))
            });
            let label = self
                .label_dir
                .join(&year_str)
                .join(format!("{}{year}_{key}.npy", prefix::FOREST_COVER));
            ans.insert(year, YearPaths { tile, image, label });
        }
        Ok(ans)
    }
}

impl Dataset for VideoDataset {
    type Item = VideoSample;

    #[inline]
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn get(&self, index: usize) -> Result<VideoSample, LoadError> {
        let key = &self.keys[index];
        let mut frames = BTreeMap::new();
        for (year, paths) in self.paths(index)? {
            frames.insert(
                year,
                load_pair(paths.tile, &paths.image, &paths.label, &self.normalize)?,
            );
        }
        Ok(VideoSample {
            key: key.clone(),
            frames,
        })
    }
}
