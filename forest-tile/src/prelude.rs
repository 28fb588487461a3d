//! 🌲欢迎光临🌳
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::consts::mask::{FOREST, NON_FOREST};
pub use crate::consts::{DEFAULT_THRESHOLD, GROUND_TRUTH_YEARS, LANDSAT_MEAN, LANDSAT_STD, YEARS};

pub use crate::tile::{ParseTileError, TileKey, ZoomError};

pub use crate::source::{image_for_mask, image_path, label_path, ImageSource, Quarter};

pub use crate::composite::{composite, composite_tile, CompositeMethod};
pub use crate::io::{read_mask, read_rgb, LoadError};
pub use crate::transform::Normalize;
pub use crate::upsample::{upsample_mask, upsample_mask_file};

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, Dataset, Sample, TileDataset, VideoDataset, VideoSample};

pub use crate::eval::{
    evaluate_video, NpyPredictor, Predictor, SigmoidNpyPredictor, VideoEvaluation, VideoReport,
};
pub use crate::metrics::{threshold, ConfusionMatrix, Scores};
pub use crate::save::{ImgWriteVis, Panel};
