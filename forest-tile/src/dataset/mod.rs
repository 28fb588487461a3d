//! 数据集操作.
//!
//! 提供迭代器风格的数据集获取模式.

use crate::io::{read_mask, read_rgb, LoadError};
use crate::tile::TileKey;
use crate::transform::Normalize;
use ndarray::{Array2, Array3, Axis};
use std::path::{Path, PathBuf};

mod batch;
pub mod single;
pub mod video;

pub use batch::{Batch, BatchLoader};
pub use single::TileDataset;
pub use video::{VideoDataset, VideoSample, YearPaths};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 一个图像/掩膜样本.
#[derive(Clone, Debug)]
pub struct Sample {
    /// 样本对应的瓦片.
    pub key: TileKey,
    /// 标准化后的 `(3, H, W)` 图像.
    pub image: Array3<f32>,
    /// `(H, W)` 二值掩膜.
    pub mask: Array2<u8>,
}

impl Sample {
    /// 图像的空间分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.mask.dim()
    }

    /// 以 `(1, H, W)` 浮点数组形式返回掩膜.
    pub fn mask_f32(&self) -> Array3<f32> {
        self.mask.mapv(f32::from).insert_axis(Axis(0))
    }
}

/// 可按索引随机访问的数据集.
pub trait Dataset {
    /// 样本类型.
    type Item;

    /// 样本个数.
    fn len(&self) -> usize;

    /// 数据集是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 读取第 `index` 个样本. `index` 越界时程序 panic.
    fn get(&self, index: usize) -> Result<Self::Item, LoadError>;

    /// 按索引序迭代全部样本的加载器.
    fn loader(&self) -> Loader<'_, Self>
    where
        Self: Sized,
    {
        Loader {
            dataset: self,
            data_rev: (0..self.len()).rev().collect(),
        }
    }
}

/// 数据集加载器. 迭代时才真正读取文件.
#[derive(Debug)]
pub struct Loader<'a, D> {
    dataset: &'a D,
    data_rev: Vec<usize>,
}

impl<D: Dataset> Iterator for Loader<'_, D> {
    type Item = (usize, Result<D::Item, LoadError>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;
        Some((idx, self.dataset.get(idx)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.data_rev.len(), Some(self.data_rev.len()))
    }
}

impl<D: Dataset> ExactSizeIterator for Loader<'_, D> {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

/// 读取一对图像/掩膜, 并标准化图像.
///
/// 图像与掩膜的空间分辨率必须一致.
pub(crate) fn load_pair(
    key: TileKey,
    img_path: &Path,
    label_path: &Path,
    normalize: &Normalize,
) -> Result<Sample, LoadError> {
    let mask = read_mask(label_path)?;
    let mut image = read_rgb(img_path)?;
    let (_, h, w) = image.dim();
    if (h, w) != mask.dim() {
        return Err(LoadError::ShapeMismatch {
            expected: vec![h, w],
            found: mask.shape().to_vec(),
        });
    }
    normalize.apply(image.view_mut());
    log::debug!("loaded tile {key} from {}", img_path.display());
    Ok(Sample { key, image, mask })
}

/// 文件名是否以 `.` 开头 (如 `.DS_Store`).
pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.starts_with('.'))
}

/// 列出 `dir` 下的直接条目, 按 `keep` 过滤, 并按文件名字典序排序.
pub(crate) fn sorted_entries<F>(dir: &Path, keep: F) -> Result<Vec<PathBuf>, LoadError>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        return Err(LoadError::NotADirectory(dir.to_owned()));
    }
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if keep(&path) {
            entries.push(path);
        }
    }
    entries.sort();
    Ok(entries)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_dataset_dir() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(home_dataset_dir(), Some(home.join("dataset")));
            assert_eq!(
                home_dataset_dir_with(["fc", "2017"]),
                Some(home.join("dataset").join("fc").join("2017"))
            );
        }
    }

    #[test]
    fn test_sample_mask_f32() {
        let sample = Sample {
            key: TileKey::new(2017, 1, 0, 0).unwrap(),
            image: Array3::zeros((3, 2, 2)),
            mask: ndarray::array![[0, 1], [1, 0]],
        };
        let m = sample.mask_f32();
        assert_eq!(m.shape(), &[1, 2, 2]);
        assert_eq!(m[(0, 0, 1)], 1.0);
        assert_eq!(sample.shape(), (2, 2));
    }

    #[test]
    fn test_load_pair_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("ld2017_1_0_0.png");
        let label = dir.path().join("fc2017_1_0_0.npy");
        fixtures::write_png(&img, 4, [0, 0, 0]);
        fixtures::write_mask(&label, 2, 0, 1);
        let key = TileKey::new(2017, 1, 0, 0).unwrap();
        assert!(matches!(
            load_pair(key, &img, &label, &Normalize::landsat()),
            Err(LoadError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_sorted_entries() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b", "a", "c"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("d")).unwrap();
        let files = sorted_entries(dir.path(), |p| p.is_file()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);

        assert!(is_hidden(Path::new("fc/2017/.DS_Store")));
        assert!(!is_hidden(Path::new("fc/2017/fc2017_1_0_0.npy")));

        assert!(matches!(
            sorted_entries(&dir.path().join("a"), |_| true),
            Err(LoadError::NotADirectory(_))
        ));
    }
}
