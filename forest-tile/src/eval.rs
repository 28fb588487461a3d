//! 2013-2017 时间序列评估.
//!
//! 模型推理被抽象为 [`Predictor`]. 每个样本每一年的预测概率与真值掩膜在同一阈值下二值化,
//! 分别累计到该年和全部年份的混淆矩阵中.

use crate::consts::YEARS;
use crate::dataset::{Dataset, VideoDataset, VideoSample};
use crate::io::{read_npy_f32, LoadError};
use crate::metrics::{threshold, ConfusionMatrix, Scores};
use crate::save::{save_video_panels, Panel};
use ndarray::{Array2, ArrayView3, Axis, Ix2};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 逐像素森林概率的来源.
pub trait Predictor {
    /// 预测空间键为 `key` 的瓦片在 `year` 年的森林概率.
    ///
    /// `image` 是标准化后的 `(3, H, W)` 图像, 返回 `(H, W)` 概率图.
    fn predict(&self, key: &str, year: u16, image: ArrayView3<f32>) -> Result<Array2<f32>, LoadError>;
}

/// 从磁盘读取预先计算好的概率图: `{dir}/{key}/{year}.npy`.
///
/// 数组可以是 `(H, W)` 或 `(1, H, W)`, 元素类型可以是任意受支持的数值类型.
#[derive(Clone, Debug)]
pub struct NpyPredictor {
    dir: PathBuf,
}

impl NpyPredictor {
    /// 以 `dir` 为根目录.
    #[inline]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_owned(),
        }
    }

    /// 某一年的概率图路径.
    #[inline]
    pub fn path(&self, key: &str, year: u16) -> PathBuf {
        self.dir.join(key).join(format!("{year}.npy"))
    }
}

impl Predictor for NpyPredictor {
    fn predict(&self, key: &str, year: u16, image: ArrayView3<f32>) -> Result<Array2<f32>, LoadError> {
        let path = self.path(key, year);
        let arr = read_npy_f32(&path)?;
        let shape = arr.shape().to_vec();
        let squeezed = match shape.as_slice() {
            [_, _] => arr.into_dimensionality::<Ix2>().ok(),
            [1, _, _] => arr.index_axis_move(Axis(0), 0).into_dimensionality::<Ix2>().ok(),
            _ => None,
        };
        let Some(arr) = squeezed else {
            return Err(LoadError::Shape { path, shape });
        };

        let (_, h, w) = image.dim();
        if arr.dim() != (h, w) {
            return Err(LoadError::ShapeMismatch {
                expected: vec![h, w],
                found: arr.shape().to_vec(),
            });
        }
        Ok(arr)
    }
}

/// 与 [`NpyPredictor`] 相同的目录布局, 但文件中存放的是 logits,
/// 读取后经过 sigmoid 变为概率.
#[derive(Clone, Debug)]
pub struct SigmoidNpyPredictor(NpyPredictor);

impl SigmoidNpyPredictor {
    /// 以 `dir` 为根目录.
    #[inline]
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self(NpyPredictor::new(dir))
    }
}

#[inline]
fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl Predictor for SigmoidNpyPredictor {
    fn predict(&self, key: &str, year: u16, image: ArrayView3<f32>) -> Result<Array2<f32>, LoadError> {
        let mut logits = self.0.predict(key, year, image)?;
        logits.mapv_inplace(sigmoid);
        Ok(logits)
    }
}

/// 时间序列评估结果.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VideoReport {
    /// 全部年份合计.
    pub overall: Scores,
    /// 各年份.
    pub per_year: BTreeMap<u16, Scores>,
    /// 参与统计的样本数.
    pub samples: usize,
    /// 加载或预测失败而被跳过的样本数.
    pub failed: usize,
}

/// 时间序列评估的累计状态.
#[derive(Clone, Debug)]
pub struct VideoEvaluation {
    threshold: f32,
    overall: ConfusionMatrix,
    per_year: BTreeMap<u16, ConfusionMatrix>,
    samples: usize,
    failed: usize,
}

impl VideoEvaluation {
    /// 以 `threshold` 为二值化阈值.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            overall: ConfusionMatrix::binary(),
            per_year: YEARS.iter().map(|&y| (y, ConfusionMatrix::binary())).collect(),
            samples: 0,
            failed: 0,
        }
    }

    /// 二值化阈值.
    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 已统计的样本数.
    #[inline]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// 对 `sample` 的每一年做预测并累计.
    ///
    /// 任何一年预测失败或概率图与掩膜形状不一致时, 整个样本都不计入统计.
    /// 成功时返回各年份二值化后的预测.
    pub fn update<P: Predictor + ?Sized>(
        &mut self,
        sample: &VideoSample,
        predictor: &P,
    ) -> Result<BTreeMap<u16, Array2<u8>>, LoadError> {
        let mut preds = BTreeMap::new();
        for (&year, frame) in &sample.frames {
            let prob = predictor.predict(&sample.key, year, frame.image.view())?;
            if prob.dim() != frame.mask.dim() {
                return Err(LoadError::ShapeMismatch {
                    expected: frame.mask.shape().to_vec(),
                    found: prob.shape().to_vec(),
                });
            }
            preds.insert(year, threshold(prob.view(), self.threshold));
        }

        for (&year, frame) in &sample.frames {
            let target = self.binary_target(frame.mask.view());
            let pred = preds[&year].view();
            let hist = self.per_year.entry(year).or_insert_with(ConfusionMatrix::binary);
            hist.accumulate(pred, target.view());
            self.overall.accumulate(pred, target.view());
        }
        self.samples += 1;
        Ok(preds)
    }

    /// 记录一个被跳过的样本.
    #[inline]
    pub fn skip(&mut self) {
        self.failed += 1;
    }

    /// 当前的评估结果.
    pub fn report(&self) -> VideoReport {
        VideoReport {
            overall: self.overall.scores(),
            per_year: self.per_year.iter().map(|(&y, h)| (y, h.scores())).collect(),
            samples: self.samples,
            failed: self.failed,
        }
    }

    fn binary_target(&self, mask: ndarray::ArrayView2<u8>) -> Array2<u8> {
        threshold(mask.mapv(f32::from).view(), self.threshold)
    }
}

/// 在整个时间序列数据集上评估 `predictor`.
///
/// `out_dir` 非空时, 每个样本的去标准化图像、真值和预测会保存到该目录 (见
/// [`save_video_panels`]). 加载或预测失败的样本被跳过, 保存失败只记录警告.
pub fn evaluate_video<P: Predictor + ?Sized>(
    dataset: &VideoDataset,
    predictor: &P,
    threshold: f32,
    out_dir: Option<&Path>,
) -> VideoReport {
    let mut eval = VideoEvaluation::new(threshold);
    let n = dataset.len();
    log::info!("evaluating {n} video samples, threshold = {threshold}");

    for (index, sample) in dataset.loader() {
        let key = &dataset.keys()[index];
        let sample = match sample {
            Ok(s) => s,
            Err(e) => {
                log::warn!("[{}/{n}] {key}: failed to load, skipped: {e}", index + 1);
                eval.skip();
                continue;
            }
        };
        let preds = match eval.update(&sample, predictor) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("[{}/{n}] {key}: failed to predict, skipped: {e}", index + 1);
                eval.skip();
                continue;
            }
        };
        log::debug!("[{}/{n}] {key}: done", index + 1);

        if let Some(out_dir) = out_dir {
            let panels: BTreeMap<u16, Panel> = sample
                .frames
                .iter()
                .map(|(&year, frame)| {
                    let panel = Panel {
                        image: dataset.normalize().inverse(frame.image.view()),
                        gt: eval.binary_target(frame.mask.view()),
                        pred: preds[&year].clone(),
                    };
                    (year, panel)
                })
                .collect();
            if let Err(e) = save_video_panels(out_dir, index, &panels) {
                log::warn!("{key}: failed to save panels to {}: {e}", out_dir.display());
            }
        }
    }

    let report = eval.report();
    log::info!(
        "evaluated {} samples ({} skipped): {}",
        report.samples,
        report.failed,
        report.overall
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures;
    use ndarray::Array3;
    use ndarray_npy::write_npy;

    /// 写入 `size x size` 概率图, 左半为 `left`, 右半为 `right`.
    fn write_pred(dir: &Path, key: &str, year: u16, size: usize, left: f32, right: f32) {
        let path = NpyPredictor::new(dir).path(key, year);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let arr = Array2::from_shape_fn((size, size), |(_, c)| if c < size / 2 { left } else { right });
        write_npy(path, &arr).unwrap();
    }

    fn open(root: &Path) -> VideoDataset {
        VideoDataset::new(root.join("img"), root.join("fc"), root.join("video"), None).unwrap()
    }

    #[test]
    fn test_npy_predictor_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let p = NpyPredictor::new(dir.path());
        let image = Array3::<f32>::zeros((3, 2, 2));

        write_pred(dir.path(), "1_0_0", 2013, 2, 0.9, 0.1);
        let prob = p.predict("1_0_0", 2013, image.view()).unwrap();
        assert_eq!(prob, ndarray::array![[0.9, 0.1], [0.9, 0.1]]);

        let path = p.path("1_0_0", 2014);
        write_npy(&path, &Array3::<f32>::ones((1, 2, 2))).unwrap();
        assert_eq!(p.predict("1_0_0", 2014, image.view()).unwrap().dim(), (2, 2));

        write_npy(&path, &Array3::<f32>::ones((2, 2, 2))).unwrap();
        assert!(matches!(
            p.predict("1_0_0", 2014, image.view()),
            Err(LoadError::Shape { .. })
        ));

        let big = Array3::<f32>::zeros((3, 4, 4));
        assert!(matches!(
            p.predict("1_0_0", 2013, big.view()),
            Err(LoadError::ShapeMismatch { .. })
        ));
        assert!(p.predict("1_0_0", 2015, image.view()).is_err());
    }

    #[test]
    fn test_sigmoid_predictor() {
        let dir = tempfile::tempdir().unwrap();
        write_pred(dir.path(), "1_0_0", 2016, 2, 0.0, 20.0);
        let prob = SigmoidNpyPredictor::new(dir.path())
            .predict("1_0_0", 2016, Array3::zeros((3, 2, 2)).view())
            .unwrap();
        assert!((prob[(0, 0)] - 0.5).abs() < 1e-6);
        assert!(prob[(0, 1)] > 0.99);
    }

    #[test]
    fn test_update_per_year() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fixtures::video_dataset(root, &["12_1_2"], 4);
        let preds = root.join("pred");
        for year in YEARS {
            // 2017 年全部预测为森林, 其余年份完全正确.
            let right = if year == 2017 { 0.9 } else { 0.1 };
            write_pred(&preds, "12_1_2", year, 4, 0.9, right);
        }

        let ds = open(root);
        let mut eval = VideoEvaluation::new(0.3);
        let binary = eval.update(&ds.get(0).unwrap(), &NpyPredictor::new(&preds)).unwrap();
        assert_eq!(binary.len(), 5);
        assert_eq!(binary[&2017].row(0).to_vec(), vec![1, 1, 1, 1]);
        assert_eq!(binary[&2013].row(0).to_vec(), vec![1, 1, 0, 0]);

        let report = eval.report();
        assert_eq!(report.samples, 1);
        assert_eq!(report.per_year[&2013].acc, 1.0);
        assert!((report.per_year[&2017].acc - 0.5).abs() < 1e-9);
        // (4 * 16 + 8) / 80
        assert!((report.overall.acc - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_video_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fixtures::video_dataset(root, &["12_1_2", "12_3_3"], 4);
        let preds = root.join("pred");
        // 只有第一个样本有预测结果.
        for year in YEARS {
            write_pred(&preds, "12_1_2", year, 4, 0.9, 0.1);
        }

        let out = root.join("out");
        let report = evaluate_video(&open(root), &NpyPredictor::new(&preds), 0.3, Some(&out));
        assert_eq!(report.samples, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.overall.acc, 1.0);
        assert_eq!(report.per_year.len(), 5);
        for kind in ["img", "gt", "pred"] {
            assert!(out.join(format!("00000_2015_{kind}.png")).is_file());
        }
        assert!(!out.join("00001_2015_img.png").exists());
    }

    /// 总是返回 `2 x 2` 概率图, 与 `4 x 4` 瓦片不符.
    struct WrongShape;

    impl Predictor for WrongShape {
        fn predict(&self, _: &str, _: u16, _: ArrayView3<f32>) -> Result<Array2<f32>, LoadError> {
            Ok(Array2::zeros((2, 2)))
        }
    }

    #[test]
    fn test_mismatched_prediction_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fixtures::video_dataset(root, &["12_1_2"], 4);
        let ds = open(root);

        let mut eval = VideoEvaluation::new(0.3);
        assert!(matches!(
            eval.update(&ds.get(0).unwrap(), &WrongShape),
            Err(LoadError::ShapeMismatch { .. })
        ));
        assert_eq!(eval.samples(), 0);
        assert!(eval.report().overall.acc.is_nan());

        let report = evaluate_video(&ds, &WrongShape, 0.3, None);
        assert_eq!(report.samples, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_evaluate_video_skips_unloadable_samples() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fixtures::video_dataset(root, &["12_1_2", "12_3_3"], 4);
        let preds = root.join("pred");
        for key in ["12_1_2", "12_3_3"] {
            for year in YEARS {
                write_pred(&preds, key, year, 4, 0.9, 0.1);
            }
        }
        // 第二个样本缺少 2016 年的标签.
        std::fs::remove_file(root.join("fc/2016/fc2016_12_3_3.npy")).unwrap();

        let report = evaluate_video(&open(root), &NpyPredictor::new(&preds), 0.3, None);
        assert_eq!(report.samples, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.overall.acc, 1.0);
        assert_eq!(report.per_year[&2016].acc, 1.0);
    }

    #[test]
    fn test_empty_report() {
        let report = VideoEvaluation::new(0.5).report();
        assert_eq!(report.samples, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.per_year.len(), YEARS.len());
    }
}
