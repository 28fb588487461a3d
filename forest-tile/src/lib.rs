#![warn(missing_docs)]

//! 核心库. 提供 Planet/Landsat 多时相马赛克瓦片的森林覆盖数据集组织、预处理,
//! 以及二值语义分割结果的评估.
//!
//! # 注意
//!
//! 1. 瓦片坐标遵循 slippy-map 四叉树约定: 缩放级别每增加 1, `x`/`y` 翻倍.
//! 2. 图像张量统一使用通道优先 `(C, H, W)` 布局, 掩膜使用 `(H, W)` 布局.
//! 3. 库代码不会因为 I/O 失败而 panic, 所有错误都通过 `Result` 返回.
//!
//! # 功能概览
//!
//! ### 瓦片坐标与路径模板 ✅
//!
//! 从文件名 (如 `ly2017_12_1223_2516.png`) 解析年份与 `(z, x, y)`,
//! 在不同缩放级别之间换算, 并映射到图像/标签文件路径.
//!
//! 实现位于 `forest-tile/src/tile.rs` 和 `forest-tile/src/source.rs`.
//!
//! ### 低缩放级别掩膜上采样 ✅
//!
//! 从低缩放级别的掩膜中裁剪出高缩放级别瓦片对应的窗口, 再最近邻放大.
//!
//! 实现位于 `forest-tile/src/upsample.rs`.
//!
//! ### 季度马赛克合成年度马赛克 ✅
//!
//! 逐像素合并四个季度的有效观测 (均值或中位数).
//!
//! 实现位于 `forest-tile/src/composite.rs`.
//!
//! ### 单年数据集与 2013-2017 时间序列数据集 ✅
//!
//! 实现位于 `forest-tile/src/dataset`.
//!
//! ### 混淆矩阵评估 ✅
//!
//! accuracy, mean IoU, precision/recall/F1 等.
//!
//! 实现位于 `forest-tile/src/metrics.rs` 和 `forest-tile/src/eval.rs`.

/// 二维索引 `(h, w)`.
pub type Idx2d = (usize, usize);

pub mod consts;

pub mod tile;

pub mod source;

pub mod io;

pub mod transform;

pub mod upsample;

pub mod composite;

pub mod metrics;

pub mod save;

pub mod dataset;

pub mod eval;

pub mod prelude;

pub use io::LoadError;
pub use metrics::{ConfusionMatrix, Scores};
pub use source::{ImageSource, Quarter};
pub use tile::TileKey;
