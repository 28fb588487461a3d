//! 通用常量.

/// 掩膜像素值.
pub mod mask {
    /// 非森林像素值.
    pub const NON_FOREST: u8 = 0;

    /// 森林像素值.
    pub const FOREST: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是森林?
    #[inline]
    pub const fn is_forest(p: u8) -> bool {
        matches!(p, FOREST)
    }

    /// 像素是否是非森林?
    #[inline]
    pub const fn is_non_forest(p: u8) -> bool {
        matches!(p, NON_FOREST)
    }
}

/// 文件名前缀.
pub mod prefix {
    /// Landsat 年度马赛克.
    pub const LANDSAT: &str = "ld";

    /// Planet 马赛克 (包括转换到 Landsat 风格的 Planet 马赛克).
    pub const PLANET: &str = "pl";

    /// 森林覆盖标签.
    pub const FOREST_COVER: &str = "fc";
}

/// 时间序列覆盖的年份.
pub const YEARS: [u16; 5] = [2013, 2014, 2015, 2016, 2017];

/// 时间序列中使用真实 Landsat 瓦片的年份. 其余年份来自视频预测生成帧.
pub const GROUND_TRUTH_YEARS: [u16; 2] = [2013, 2014];

/// 第一个由视频预测生成的年份. 生成帧编号 `i = year - FIRST_GENERATED_YEAR`.
pub const FIRST_GENERATED_YEAR: u16 = 2015;

/// Landsat 年度马赛克各通道 (R, G, B) 均值.
pub const LANDSAT_MEAN: [f32; 3] = [0.3326, 0.3570, 0.2224];

/// Landsat 年度马赛克各通道 (R, G, B) 标准差.
pub const LANDSAT_STD: [f32; 3] = [0.1059, 0.1086, 0.1283];

/// 模型输出概率与标签的默认二值化阈值.
pub const DEFAULT_THRESHOLD: f32 = 0.3;

/// 瓦片边长 (像素).
pub const TILE_SIZE: usize = 256;

/// 二值分割的类别数.
pub const NUM_CLASSES: usize = 2;

/// 允许的最大缩放级别.
pub const MAX_ZOOM: u8 = 30;

/// 数值稳定项.
pub const EPS: f64 = 1e-10;

/// 图像通道数.
pub const CHANNELS: usize = 3;

/// 判断 `year` 是否取自真实 Landsat 瓦片.
#[inline]
pub fn is_ground_truth_year(year: u16) -> bool {
    GROUND_TRUTH_YEARS.contains(&year)
}
