//! 分批加载.

use super::{Dataset, Sample, TileDataset};
use crate::io::LoadError;
use crate::tile::TileKey;
use ndarray::{stack, Array4, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::num::NonZeroUsize;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// 一批样本.
#[derive(Clone, Debug)]
pub struct Batch {
    /// 各样本的瓦片.
    pub keys: Vec<TileKey>,
    /// `(B, 3, H, W)` 标准化图像.
    pub images: Array4<f32>,
    /// `(B, 1, H, W)` 浮点二值掩膜.
    pub masks: Array4<f32>,
}

impl Batch {
    /// 将若干同分辨率样本堆叠为一批. `samples` 为空或分辨率不一致时返回错误.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, LoadError> {
        let first = samples.first().ok_or(LoadError::ShapeMismatch {
            expected: vec![1],
            found: vec![0],
        })?;
        if let Some(bad) = samples.iter().find(|s| s.image.dim() != first.image.dim()) {
            return Err(LoadError::ShapeMismatch {
                expected: first.image.shape().to_vec(),
                found: bad.image.shape().to_vec(),
            });
        }

        let images: Vec<ArrayView3<f32>> = samples.iter().map(|s| s.image.view()).collect();
        let masks: Vec<_> = samples.iter().map(Sample::mask_f32).collect();
        let masks: Vec<ArrayView3<f32>> = masks.iter().map(|m| m.view()).collect();

        // 形状已经检查过, 堆叠不会失败.
        let shape_err = |_| LoadError::ShapeMismatch {
            expected: first.image.shape().to_vec(),
            found: vec![],
        };
        Ok(Self {
            keys: samples.iter().map(|s| s.key).collect(),
            images: stack(Axis(0), &images).map_err(shape_err)?,
            masks: stack(Axis(0), &masks).map_err(shape_err)?,
        })
    }

    /// 批大小.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// 是否为空批.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// [`TileDataset`] 的分批加载器.
#[derive(Debug)]
pub struct BatchLoader<'a> {
    dataset: &'a TileDataset,
    order: Vec<usize>,
    pos: usize,
    batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    pub(super) fn new(dataset: &'a TileDataset, batch_size: NonZeroUsize, shuffle: Option<u64>) -> Self {
        let mut order: Vec<usize> = (0..dataset.len()).collect();
        if let Some(seed) = shuffle {
            let mut rng = StdRng::seed_from_u64(seed);
            order.shuffle(&mut rng);
        }
        Self {
            dataset,
            order,
            pos: 0,
            batch_size: batch_size.get(),
        }
    }

    /// 本加载器的样本顺序.
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    fn load(&self, chunk: &[usize]) -> Result<Vec<Sample>, LoadError> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                chunk.par_iter().map(|&i| self.dataset.get(i)).collect()
            } else {
                chunk.iter().map(|&i| self.dataset.get(i)).collect()
            }
        }
    }
}

impl Iterator for BatchLoader<'_> {
    type Item = Result<Batch, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.batch_size).min(self.order.len());
        let chunk = &self.order[self.pos..end];
        let batch = self
            .load(chunk)
            .and_then(|samples| Batch::from_samples(&samples));
        self.pos = end;
        Some(batch)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.len();
        (n, Some(n))
    }
}

impl ExactSizeIterator for BatchLoader<'_> {
    #[inline]
    fn len(&self) -> usize {
        (self.order.len() - self.pos).div_ceil(self.batch_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures;
    use ndarray::Array3;

    fn dataset(dir: &std::path::Path, n: u32) -> TileDataset {
        let keys: Vec<_> = (0..n).map(|x| TileKey::new(2017, 4, x, 0).unwrap()).collect();
        fixtures::landsat_dataset(dir, &keys, 4);
        TileDataset::new(dir.join("landsat"), dir.join("fc"), [2017], None).unwrap()
    }

    #[test]
    fn test_batches_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ds = dataset(dir.path(), 5);
        let loader = ds.batches(NonZeroUsize::new(2).unwrap(), None);
        assert_eq!(loader.len(), 3);

        let batches: Vec<Batch> = loader.map(Result::unwrap).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].images.shape(), &[2, 3, 4, 4]);
        assert_eq!(batches[0].masks.shape(), &[2, 1, 4, 4]);
        assert_eq!(batches[2].len(), 1);
        assert_eq!(batches[0].keys[1].x, 1);
        assert_eq!(batches[0].masks[(0, 0, 0, 3)], 1.0);
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let dir = tempfile::tempdir().unwrap();
        let ds = dataset(dir.path(), 6);
        let size = NonZeroUsize::new(4).unwrap();

        let a = ds.batches(size, Some(7)).order().to_vec();
        let b = ds.batches(size, Some(7)).order().to_vec();
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..6).collect::<Vec<_>>());

        let keys: Vec<TileKey> = ds
            .batches(size, Some(7))
            .flat_map(|b| b.unwrap().keys)
            .collect();
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn test_from_samples_rejects_mixed_shapes() {
        let key = TileKey::new(2017, 1, 0, 0).unwrap();
        let a = Sample {
            key,
            image: Array3::zeros((3, 2, 2)),
            mask: ndarray::Array2::zeros((2, 2)),
        };
        let b = Sample {
            key,
            image: Array3::zeros((3, 4, 4)),
            mask: ndarray::Array2::zeros((4, 4)),
        };
        assert!(Batch::from_samples(&[a.clone(), b]).is_err());
        assert!(Batch::from_samples(&[]).is_err());
        assert_eq!(Batch::from_samples(&[a]).unwrap().len(), 1);
    }
}
