//! 瓦片坐标.
//!
//! 瓦片由年份和 slippy-map 坐标 `(z, x, y)` 唯一确定. 缩放级别 `z` 每增加 1,
//! 一个瓦片在空间上被等分为 `2 x 2` 个子瓦片. 在图像中, `x` 对应宽 (列) 方向,
//! `y` 对应高 (行) 方向.

use crate::consts::MAX_ZOOM;
use itertools::iproduct;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 某一年份的一个瓦片.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileKey {
    /// 马赛克年份.
    pub year: u16,
    /// 缩放级别.
    pub z: u8,
    /// 列坐标.
    pub x: u32,
    /// 行坐标.
    pub y: u32,
}

/// 瓦片文件名解析错误.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseTileError {
    /// 文件名没有扩展名.
    MissingExtension,
    /// 以 `_` 分隔的字段个数不是 4.
    FieldCount(usize),
    /// 首字段不足以容纳两个字符的前缀和年份.
    BadPrefix,
    /// 字段无法解析为数字. 内容为字段名.
    InvalidNumber(&'static str),
    /// 坐标超出缩放级别允许的范围.
    OutOfRange,
}

impl Display for ParseTileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingExtension => write!(f, "tile filename has no extension"),
            Self::FieldCount(n) => write!(f, "expected 4 `_`-separated fields, found {n}"),
            Self::BadPrefix => write!(f, "first field must be a 2-char prefix followed by a year"),
            Self::InvalidNumber(field) => write!(f, "field `{field}` is not a valid number"),
            Self::OutOfRange => write!(f, "tile coordinate out of range for its zoom level"),
        }
    }
}

impl std::error::Error for ParseTileError {}

/// 缩放级别换算错误.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ZoomError {
    /// 目标缩放级别比当前瓦片更精细, 但操作要求更粗糙的级别.
    NotCoarser {
        /// 当前缩放级别.
        from: u8,
        /// 目标缩放级别.
        to: u8,
    },
    /// 目标缩放级别比当前瓦片更粗糙, 但操作要求更精细的级别.
    NotFiner {
        /// 当前缩放级别.
        from: u8,
        /// 目标缩放级别.
        to: u8,
    },
    /// 缩放级别超过 [`MAX_ZOOM`].
    TooDeep(u8),
    /// 给定瓦片并不在空间上包含当前瓦片.
    NotContained,
    /// 瓦片像素边长无法被缩放比例整除. 内容为 `(tile_size, scale)`.
    Indivisible(usize, usize),
}

impl Display for ZoomError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotCoarser { from, to } => {
                write!(f, "zoom {to} is finer than tile zoom {from}")
            }
            Self::NotFiner { from, to } => {
                write!(f, "zoom {to} is coarser than tile zoom {from}")
            }
            Self::TooDeep(z) => write!(f, "zoom {z} exceeds maximum {MAX_ZOOM}"),
            Self::NotContained => write!(f, "tile is not contained in the given ancestor"),
            Self::Indivisible(size, scale) => {
                write!(f, "tile size {size} is not divisible by scale {scale}")
            }
        }
    }
}

impl std::error::Error for ZoomError {}

/// `year_z_x_y` 格式.
impl Display for TileKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}_{}", self.year, self.z, self.x, self.y)
    }
}

impl TileKey {
    /// 构建瓦片. 若 `z > MAX_ZOOM` 或 `x`, `y` 不小于 `2^z`, 则返回 `None`.
    pub fn new(year: u16, z: u8, x: u32, y: u32) -> Option<Self> {
        if z > MAX_ZOOM {
            return None;
        }
        let side = 1u64 << z;
        if (x as u64) < side && (y as u64) < side {
            Some(Self { year, z, x, y })
        } else {
            None
        }
    }

    /// 从形如 `ly2017_12_1223_2516.png` 的文件名解析瓦片.
    ///
    /// 首字段由任意两个字符的前缀和年份组成, 扩展名从最后一个 `.` 处截断.
    pub fn parse_filename(name: &str) -> Result<Self, ParseTileError> {
        let (stem, _ext) = name
            .rsplit_once('.')
            .ok_or(ParseTileError::MissingExtension)?;
        let fields: Vec<&str> = stem.split('_').collect();
        let &[first, z, x, y] = fields.as_slice() else {
            return Err(ParseTileError::FieldCount(fields.len()));
        };
        let year = first
            .char_indices()
            .nth(2)
            .map(|(at, _)| &first[at..])
            .ok_or(ParseTileError::BadPrefix)?;

        let year = year
            .parse::<u16>()
            .map_err(|_| ParseTileError::InvalidNumber("year"))?;
        let z = z
            .parse::<u8>()
            .map_err(|_| ParseTileError::InvalidNumber("z"))?;
        let x = x
            .parse::<u32>()
            .map_err(|_| ParseTileError::InvalidNumber("x"))?;
        let y = y
            .parse::<u32>()
            .map_err(|_| ParseTileError::InvalidNumber("y"))?;

        Self::new(year, z, x, y).ok_or(ParseTileError::OutOfRange)
    }

    /// 从路径的文件名部分解析瓦片.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ParseTileError> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or(ParseTileError::MissingExtension)?;
        Self::parse_filename(name)
    }

    /// 从 `z_x_y` 格式的空间键和年份构建瓦片.
    pub fn parse_spatial(year: u16, key: &str) -> Result<Self, ParseTileError> {
        let fields: Vec<&str> = key.split('_').collect();
        let &[z, x, y] = fields.as_slice() else {
            return Err(ParseTileError::FieldCount(fields.len() + 1));
        };
        let z = z
            .parse::<u8>()
            .map_err(|_| ParseTileError::InvalidNumber("z"))?;
        let x = x
            .parse::<u32>()
            .map_err(|_| ParseTileError::InvalidNumber("x"))?;
        let y = y
            .parse::<u32>()
            .map_err(|_| ParseTileError::InvalidNumber("y"))?;
        Self::new(year, z, x, y).ok_or(ParseTileError::OutOfRange)
    }

    /// 不含年份的空间键 `z_x_y`.
    #[inline]
    pub fn spatial(&self) -> String {
        format!("{}_{}_{}", self.z, self.x, self.y)
    }

    /// 以 `prefix` 为前缀、`ext` 为扩展名的文件名, 如 `ld2017_12_1223_2516.png`.
    #[inline]
    pub fn filename(&self, prefix: &str, ext: &str) -> String {
        format!("{prefix}{self}.{ext}")
    }

    /// 同一位置的另一个年份.
    #[inline]
    pub fn with_year(&self, year: u16) -> Self {
        Self { year, ..*self }
    }

    /// 是否与 `other` 在空间上是同一个瓦片 (忽略年份).
    #[inline]
    pub fn same_place(&self, other: &Self) -> bool {
        (self.z, self.x, self.y) == (other.z, other.x, other.y)
    }

    /// 获取缩放级别 `z` 下包含自身的瓦片.
    pub fn ancestor(&self, z: u8) -> Result<Self, ZoomError> {
        if z > self.z {
            return Err(ZoomError::NotCoarser { from: self.z, to: z });
        }
        let dz = self.z - z;
        Ok(Self {
            z,
            x: self.x >> dz,
            y: self.y >> dz,
            ..*self
        })
    }

    /// 获取缩放级别 `z` 下覆盖自身的全部瓦片, 行优先 (`y` 外层, `x` 内层) 排列,
    /// 共 `4^(z - self.z)` 个.
    pub fn descendants(&self, z: u8) -> Result<impl Iterator<Item = Self>, ZoomError> {
        if z < self.z {
            return Err(ZoomError::NotFiner { from: self.z, to: z });
        }
        if z > MAX_ZOOM {
            return Err(ZoomError::TooDeep(z));
        }
        let dz = z - self.z;
        let (x0, y0) = (self.x << dz, self.y << dz);
        let side = 1u32 << dz;
        let year = self.year;
        Ok(iproduct!(y0..y0 + side, x0..x0 + side).map(move |(y, x)| Self { year, z, x, y }))
    }

    /// 计算自身在祖先瓦片 `ancestor` 中的像素窗口 `(row0, col0, size)`,
    /// 其中祖先瓦片以 `tile_size x tile_size` 像素渲染.
    ///
    /// 年份不参与比较.
    pub fn window_in(
        &self,
        ancestor: &Self,
        tile_size: usize,
    ) -> Result<(usize, usize, usize), ZoomError> {
        if !self.ancestor(ancestor.z)?.same_place(ancestor) {
            return Err(ZoomError::NotContained);
        }
        let dz = self.z - ancestor.z;
        let scale = 1usize << dz;
        if scale > tile_size || tile_size % scale != 0 {
            return Err(ZoomError::Indivisible(tile_size, scale));
        }
        let size = tile_size / scale;
        let row = (self.y - (ancestor.y << dz)) as usize;
        let col = (self.x - (ancestor.x << dz)) as usize;
        Ok((row * size, col * size, size))
    }
}
