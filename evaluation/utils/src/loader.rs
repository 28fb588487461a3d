//! 对 `forest_tile::dataset` 的更一层封装. 从环境变量读取目录与参数.
//!
//! 所有目录在环境变量为空时都回退到 `$HOME/dataset` 下的固定子目录.

use forest_tile::consts::DEFAULT_THRESHOLD;
use forest_tile::dataset::{home_dataset_dir_with, VideoDataset};
use forest_tile::eval::{NpyPredictor, Predictor, SigmoidNpyPredictor};
use forest_tile::LoadError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// 读取非空环境变量.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// 1. 若环境变量 `$name` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/{fallback}`.
fn dir_from_env_or_home(name: &str, fallback: &str) -> PathBuf {
    match non_empty_var(name) {
        Some(d) => PathBuf::from(d),
        None => home_dataset_dir_with([fallback]).expect("无法确定用户主目录"),
    }
}

/// 解析可选的环境变量值. 无法解析时记录警告并返回 `None`.
fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("cannot parse ${name} = `{value}`, ignored");
            None
        }
    }
}

/// 图像根目录: `$FOREST_IMG_DIR` 或 `$HOME/dataset/img`.
pub fn img_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("FOREST_IMG_DIR", "img")
}

/// 森林覆盖标签根目录: `$FOREST_LABEL_DIR` 或 `$HOME/dataset/fc`.
pub fn label_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("FOREST_LABEL_DIR", "fc")
}

/// 视频预测帧根目录: `$FOREST_VIDEO_DIR` 或 `$HOME/dataset/video`.
pub fn video_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("FOREST_VIDEO_DIR", "video")
}

/// 概率图根目录: `$FOREST_PRED_DIR` 或 `$HOME/dataset/pred`.
pub fn pred_dir_from_env_or_home() -> PathBuf {
    dir_from_env_or_home("FOREST_PRED_DIR", "pred")
}

/// 可视化输出目录: `$FOREST_OUT_DIR`. 未设置时不保存.
pub fn out_dir_from_env() -> Option<PathBuf> {
    non_empty_var("FOREST_OUT_DIR").map(PathBuf::from)
}

/// 二值化阈值: `$FOREST_THRESHOLD`, 默认 [`DEFAULT_THRESHOLD`].
pub fn threshold_from_env() -> f32 {
    threshold_or_default(non_empty_var("FOREST_THRESHOLD"))
}

fn threshold_or_default(value: Option<String>) -> f32 {
    parse_var::<f32>("FOREST_THRESHOLD", value)
        .filter(|t| t.is_finite())
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// 最多评估的样本数: `$FOREST_MAX_SAMPLES`. 未设置时不限.
pub fn max_samples_from_env() -> Option<usize> {
    parse_var("FOREST_MAX_SAMPLES", non_empty_var("FOREST_MAX_SAMPLES"))
}

/// 从环境变量或者 `$HOME/dataset` 下加载时间序列数据集.
pub fn video_dataset_from_env_or_home() -> Result<VideoDataset, LoadError> {
    VideoDataset::new(
        img_dir_from_env_or_home(),
        label_dir_from_env_or_home(),
        video_dir_from_env_or_home(),
        max_samples_from_env(),
    )
}

/// 从环境变量或者 `$HOME/dataset/pred` 下读取概率图.
///
/// `$FOREST_PRED_LOGITS` 非空时, 文件被当作 logits 处理.
pub fn predictor_from_env_or_home() -> Box<dyn Predictor> {
    let dir = pred_dir_from_env_or_home();
    if non_empty_var("FOREST_PRED_LOGITS").is_some() {
        Box::new(SigmoidNpyPredictor::new(dir))
    } else {
        Box::new(NpyPredictor::new(dir))
    }
}
