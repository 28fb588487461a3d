//! 单时相瓦片数据集.
//!
//! 以标签目录为准: `label_dir/{year}` 下的每个文件都是一个样本,
//! 其图像路径由文件名解析出的瓦片和图像来源推出.

use super::{is_hidden, load_pair, sorted_entries, BatchLoader, Dataset, Sample};
use crate::io::LoadError;
use crate::source::ImageSource;
use crate::tile::TileKey;
use crate::transform::Normalize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// 单时相瓦片数据集, 返回标准化图像和二值掩膜.
#[derive(Clone, Debug)]
pub struct TileDataset {
    img_dir: PathBuf,
    paths: Vec<PathBuf>,
    source: ImageSource,
    normalize: Normalize,
}

impl TileDataset {
    /// 收集 `label_dir/{year}` (对每个 `years`) 下的全部文件, 按路径字典序排序后,
    /// 截断到至多 `max_len` 个 (`None` 表示不限).
    ///
    /// 图像来源由 `img_dir` 推断 (见 [`ImageSource::infer`]), 图像按 Landsat
    /// 统计量标准化.
    ///
    /// # 注意
    ///
    /// 1. `label_dir` 必须是目录, 否则返回 `LoadError::NotADirectory`.
    /// 2. 不存在的年份目录会被跳过并记录警告.
    /// 3. 以 `.` 开头的隐藏文件不是样本.
    pub fn new<P, Q, I>(
        img_dir: P,
        label_dir: Q,
        years: I,
        max_len: Option<usize>,
    ) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
        I: IntoIterator<Item = u16>,
    {
        let label_dir = label_dir.as_ref();
        if !label_dir.is_dir() {
            return Err(LoadError::NotADirectory(label_dir.to_owned()));
        }

        let mut paths = Vec::new();
        for year in years {
            let dir = label_dir.join(year.to_string());
            if !dir.is_dir() {
                log::warn!("label directory {} does not exist, skipped", dir.display());
                continue;
            }
            paths.extend(sorted_entries(&dir, |p| p.is_file() && !is_hidden(p))?);
        }
        paths.sort();
        if let Some(max_len) = max_len {
            paths.truncate(max_len);
        }
        log::info!("tile dataset: {} samples under {}", paths.len(), label_dir.display());

        let img_dir = img_dir.as_ref().to_owned();
        Ok(Self {
            source: ImageSource::infer(&img_dir),
            img_dir,
            paths,
            normalize: Normalize::landsat(),
        })
    }

    /// 显式指定图像来源.
    #[inline]
    pub fn with_source(mut self, source: ImageSource) -> Self {
        self.source = source;
        self
    }

    /// 显式指定标准化参数.
    #[inline]
    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    /// 图像来源.
    #[inline]
    pub fn source(&self) -> ImageSource {
        self.source
    }

    /// 第 `index` 个样本的掩膜路径. 越界时返回 `None`.
    #[inline]
    pub fn mask_path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    /// 第 `index` 个样本的瓦片和图像路径. 越界时程序 panic.
    pub fn image_path(&self, index: usize) -> Result<(TileKey, PathBuf), LoadError> {
        let mask_path = &self.paths[index];
        let key =
            TileKey::from_path(mask_path).map_err(|e| LoadError::Tile(mask_path.clone(), e))?;
        Ok((key, self.source.image_path(&self.img_dir, &key)))
    }

    /// 分批加载器. `shuffle` 为 `Some(seed)` 时以该种子打乱样本顺序.
    ///
    /// 最后一批可能不足 `batch_size` 个样本.
    #[inline]
    pub fn batches(&self, batch_size: NonZeroUsize, shuffle: Option<u64>) -> BatchLoader<'_> {
        BatchLoader::new(self, batch_size, shuffle)
    }
}

impl Dataset for TileDataset {
    type Item = Sample;

    #[inline]
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn get(&self, index: usize) -> Result<Sample, LoadError> {
        let (key, img_path) = self.image_path(index)?;
        load_pair(key, &img_path, &self.paths[index], &self.normalize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures;

    fn keys() -> Vec<TileKey> {
        vec![
            TileKey::new(2016, 12, 1, 1).unwrap(),
            TileKey::new(2017, 12, 1, 0).unwrap(),
            TileKey::new(2017, 12, 0, 0).unwrap(),
        ]
    }

    #[test]
    fn test_collect_sort_truncate() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::landsat_dataset(dir.path(), &keys(), 4);
        let root = dir.path();

        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2017, 2016], None).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.source(), ImageSource::Landsat);
        let names: Vec<_> = (0..ds.len())
            .map(|i| ds.mask_path(i).unwrap().file_name().unwrap().to_owned())
            .collect();
        assert_eq!(
            names,
            ["fc2016_12_1_1.npy", "fc2017_12_0_0.npy", "fc2017_12_1_0.npy"]
        );
        assert!(ds.mask_path(3).is_none());

        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2017], Some(1)).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.image_path(0).unwrap().0, TileKey::new(2017, 12, 0, 0).unwrap());

        // 年份目录不存在时跳过.
        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2013], None).unwrap();
        assert!(ds.is_empty());

        assert!(matches!(
            TileDataset::new(root.join("landsat"), root.join("nope"), [2017], None),
            Err(LoadError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_hidden_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let keys = [
            TileKey::new(2017, 12, 0, 0).unwrap(),
            TileKey::new(2017, 12, 1, 0).unwrap(),
        ];
        fixtures::landsat_dataset(root, &keys, 4);
        std::fs::write(root.join("fc/2017/.DS_Store"), b"").unwrap();

        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2017], None).unwrap();
        assert_eq!(ds.len(), 2);
        let batches: Vec<_> = ds.batches(NonZeroUsize::new(3).unwrap(), None).collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_get_sample() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::landsat_dataset(dir.path(), &keys(), 4);
        let root = dir.path();
        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2016, 2017], None).unwrap();

        let sample = ds.get(0).unwrap();
        assert_eq!(sample.key, TileKey::new(2016, 12, 1, 1).unwrap());
        assert_eq!(sample.image.shape(), &[3, 4, 4]);
        let expected = (85.0 / 255.0 - 0.3326) / 0.1059;
        assert!((sample.image[(0, 2, 2)] - expected).abs() < 1e-5);
        assert_eq!(sample.mask.row(0).to_vec(), vec![0, 0, 1, 1]);

        let loaded: Vec<_> = ds.loader().collect();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(
            loaded.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_missing_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::landsat_dataset(dir.path(), &keys(), 4);
        let root = dir.path();
        let ds = TileDataset::new(root.join("landsat"), root.join("fc"), [2016], None)
            .unwrap()
            .with_source(ImageSource::PlanetToLandsat);
        assert!(matches!(ds.get(0), Err(LoadError::Image(..))));
    }
}
