//! 基于混淆矩阵的分割评估.
//!
//! 混淆矩阵的第 0 轴 (行) 是真值, 第 1 轴 (列) 是预测值.

use crate::consts::{EPS, NUM_CLASSES};
use ndarray::{Array, Array1, Array2, ArrayView, Axis, Dimension};
use std::fmt::{self, Display, Formatter};
use std::ops::AddAssign;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 二值化: 大于 `t` 的值为 1, 其余 (包括 NaN) 为 0.
pub fn threshold<D: Dimension>(values: ArrayView<f32, D>, t: f32) -> Array<u8, D> {
    values.mapv(|v| (v > t) as u8)
}

/// `n x n` 混淆矩阵.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfusionMatrix {
    hist: Array2<u64>,
}

impl Default for ConfusionMatrix {
    #[inline]
    fn default() -> Self {
        Self::binary()
    }
}

impl ConfusionMatrix {
    /// 创建 `n` 类的空矩阵. `n < 2` 时返回 `None`.
    pub fn new(n: usize) -> Option<Self> {
        (n >= 2).then(|| Self {
            hist: Array2::zeros((n, n)),
        })
    }

    /// 创建二分类 (森林/非森林) 空矩阵.
    #[inline]
    pub fn binary() -> Self {
        Self {
            hist: Array2::zeros((NUM_CLASSES, NUM_CLASSES)),
        }
    }

    /// 类别数.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.hist.nrows()
    }

    /// 真值为 `gt`、预测为 `pred` 的像素数. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, gt: usize, pred: usize) -> Option<u64> {
        self.hist.get((gt, pred)).copied()
    }

    /// 底层计数矩阵.
    #[inline]
    pub fn counts(&self) -> &Array2<u64> {
        &self.hist
    }

    /// 已统计的像素总数.
    #[inline]
    pub fn total(&self) -> u64 {
        self.hist.sum()
    }

    /// 是否尚未统计任何像素.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// 逐对统计 `(预测, 真值)`. 只统计真值与预测都在 `[0, n)` 范围内的像素.
    pub fn accumulate_iter<I: IntoIterator<Item = (u8, u8)>>(&mut self, pairs: I) {
        let n = self.num_classes();
        for (pred, gt) in pairs {
            let (pred, gt) = (pred as usize, gt as usize);
            if gt < n && pred < n {
                self.hist[(gt, pred)] += 1;
            }
        }
    }

    /// 统计一对同形状的二值预测 `outputs` 和真值 `targets`.
    ///
    /// 两者形状不一致时程序 panic.
    pub fn accumulate<D: Dimension>(&mut self, outputs: ArrayView<u8, D>, targets: ArrayView<u8, D>) {
        assert_eq!(outputs.shape(), targets.shape(), "预测与真值形状不一致");
        self.accumulate_iter(outputs.iter().copied().zip(targets.iter().copied()));
    }

    /// 计算全部评估指标.
    pub fn scores(&self) -> Scores {
        let hist = self.hist.mapv(|v| v as f64);
        let total = hist.sum();
        let diag: Array1<f64> = hist.diag().to_owned();
        let rows = hist.sum_axis(Axis(1));
        let cols = hist.sum_axis(Axis(0));

        let acc = diag.sum() / total;
        let acc_cls = nanmean((&diag / &rows).iter().copied());
        let iu = &diag / &(&rows + &cols - &diag);
        let mean_iu = nanmean(iu.iter().copied());
        let fwavacc: f64 = rows
            .iter()
            .zip(iu.iter())
            .map(|(r, iu)| (r / total, iu))
            .filter(|(freq, _)| *freq > 0.0)
            .map(|(freq, iu)| freq * iu)
            .sum();

        let tp = hist[(1, 1)];
        let fp = hist[(0, 1)];
        let fn_ = hist[(1, 0)];
        let precision = tp / (tp + fp + EPS);
        let recall = tp / (tp + fn_ + EPS);
        let f1 = 2.0 * ((precision * recall) / (precision + recall + EPS));

        Scores {
            acc,
            acc_cls,
            mean_iu,
            fwavacc,
            precision,
            recall,
            f1,
        }
    }
}

/// 合并另一个同类别数的混淆矩阵. 类别数不同时程序 panic.
impl AddAssign<&ConfusionMatrix> for ConfusionMatrix {
    fn add_assign(&mut self, rhs: &ConfusionMatrix) {
        assert_eq!(self.num_classes(), rhs.num_classes(), "类别数不一致");
        self.hist += &rhs.hist;
    }
}

/// 忽略 NaN 的均值. 全部为 NaN (或为空) 时返回 NaN.
fn nanmean<I: IntoIterator<Item = f64>>(it: I) -> f64 {
    let (sum, cnt) = it
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if cnt == 0 {
        f64::NAN
    } else {
        sum / cnt as f64
    }
}

/// 分割评估指标.
///
/// 没有任何像素时, `acc` 等比值为 NaN; precision/recall/F1 因为带有 `EPS`
/// 而为 0.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scores {
    /// 像素准确率.
    pub acc: f64,
    /// 各类别准确率的均值.
    pub acc_cls: f64,
    /// 平均 IoU.
    pub mean_iu: f64,
    /// 频率加权 IoU.
    pub fwavacc: f64,
    /// 森林类的精确率.
    pub precision: f64,
    /// 森林类的召回率.
    pub recall: f64,
    /// 森林类的 F1.
    pub f1: f64,
}

impl Scores {
    /// `(名字, 值)` 形式的全部指标, 顺序固定.
    pub fn named(&self) -> [(&'static str, f64); 7] {
        [
            ("acc", self.acc),
            ("acc_cls", self.acc_cls),
            ("mean_iu", self.mean_iu),
            ("fwavacc", self.fwavacc),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1),
        ]
    }
}

/// 压缩到一行.
impl Display for Scores {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, (name, v)) in self.named().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {v:.6}")?;
        }
        Ok(())
    }
}

/// 对一系列 `(预测, 真值)` 对统计二分类混淆矩阵, 然后计算评估指标.
pub fn evaluate<'a, D, I>(pairs: I) -> Scores
where
    D: Dimension + 'a,
    I: IntoIterator<Item = (ArrayView<'a, u8, D>, ArrayView<'a, u8, D>)>,
{
    let mut hist = ConfusionMatrix::binary();
    for (outputs, targets) in pairs {
        hist.accumulate(outputs, targets);
    }
    hist.scores()
}
