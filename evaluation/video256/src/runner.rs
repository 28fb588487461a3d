//! 程序运行函数.

use crate::result::VideoResult;
use forest_tile::dataset::Dataset;
use forest_tile::eval::evaluate_video;
use forest_tile::LoadError;
use utils::loader;

/// 实际运行.
pub fn run() -> Result<VideoResult, LoadError> {
    let dataset = loader::video_dataset_from_env_or_home()?;
    let predictor = loader::predictor_from_env_or_home();
    let threshold = loader::threshold_from_env();
    let out_dir = loader::out_dir_from_env();

    // 短路判断
    assert!(!dataset.is_empty(), "No video sample found");

    println!("Evaluating {} video samples...", dataset.len());
    let report = evaluate_video(&dataset, &*predictor, threshold, out_dir.as_deref());
    Ok(VideoResult::new(threshold, report))
}
