//! 瓦片图像与掩膜的读写.
//!
//! 只支持 `png` 和 `npy` 两种格式, 按扩展名区分.

use crate::tile::{ParseTileError, ZoomError};
use image::ImageError;
use ndarray::{Array2, Array3, ArrayD, ArrayView2, Ix2, Ix3};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, ReadableElement, WriteNpyError};
use num::traits::AsPrimitive;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// 数据加载错误.
#[derive(Debug)]
pub enum LoadError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 解码/编码图像错误.
    Image(PathBuf, ImageError),

    /// 读取 npy 文件错误.
    Npy(PathBuf, ReadNpyError),

    /// 写入 npy 文件错误.
    WriteNpy(PathBuf, WriteNpyError),

    /// 既不是 `png` 也不是 `npy` 的文件.
    UnsupportedFormat(PathBuf),

    /// 数组形状不符合预期.
    Shape {
        /// 文件路径.
        path: PathBuf,
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 两个数组的形状不一致.
    ShapeMismatch {
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 文件名无法解析为瓦片.
    Tile(PathBuf, ParseTileError),

    /// 缩放级别换算错误.
    Zoom(ZoomError),

    /// 期望是目录的路径不是目录.
    NotADirectory(PathBuf),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Image(p, e) => write!(f, "{}: {e}", p.display()),
            Self::Npy(p, e) => write!(f, "{}: {e}", p.display()),
            Self::WriteNpy(p, e) => write!(f, "{}: {e}", p.display()),
            Self::UnsupportedFormat(p) => {
                write!(f, "{}: only png and npy files are supported", p.display())
            }
            Self::Shape { path, shape } => {
                write!(f, "{}: unexpected array shape {shape:?}", path.display())
            }
            Self::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected:?}, found {found:?}")
            }
            Self::Tile(p, e) => write!(f, "{}: {e}", p.display()),
            Self::Zoom(e) => write!(f, "{e}"),
            Self::NotADirectory(p) => write!(f, "{} is not a directory", p.display()),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(_, e) => Some(e),
            Self::Npy(_, e) => Some(e),
            Self::WriteNpy(_, e) => Some(e),
            Self::Tile(_, e) => Some(e),
            Self::Zoom(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    #[inline]
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ZoomError> for LoadError {
    #[inline]
    fn from(e: ZoomError) -> Self {
        Self::Zoom(e)
    }
}

/// 支持的文件类型.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileType {
    /// 8-bit png 图像.
    Png,
    /// numpy 数组.
    Npy,
}

impl FileType {
    /// 按扩展名判断文件类型.
    pub fn of<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("png") => Ok(Self::Png),
            Some("npy") => Ok(Self::Npy),
            _ => Err(LoadError::UnsupportedFormat(path.to_owned())),
        }
    }
}

type NpyReader = fn(&Path) -> Result<ArrayD<f32>, ReadNpyError>;

fn read_as<T>(path: &Path) -> Result<ArrayD<f32>, ReadNpyError>
where
    T: ReadableElement + AsPrimitive<f32>,
{
    read_npy::<_, ArrayD<T>>(path).map(|a| a.mapv(|v| v.as_()))
}

/// 依次尝试的 npy 元素类型. 仅在类型描述符不符时才尝试下一个.
const NPY_READERS: [NpyReader; 3] = [read_as::<u8>, read_as::<i64>, read_as::<f32>];

/// 最后尝试的元素类型, 其错误即为最终错误.
const NPY_LAST_READER: NpyReader = read_as::<f64>;

/// 以任意受支持的元素类型读取 npy 文件, 统一转换为 `f32`.
pub fn read_npy_f32<P: AsRef<Path>>(path: P) -> Result<ArrayD<f32>, LoadError> {
    let path = path.as_ref();
    for reader in NPY_READERS {
        match reader(path) {
            Ok(arr) => return Ok(arr),
            Err(ReadNpyError::WrongDescriptor(_)) => continue,
            Err(e) => return Err(LoadError::Npy(path.to_owned(), e)),
        }
    }
    NPY_LAST_READER(path).map_err(|e| LoadError::Npy(path.to_owned(), e))
}

/// 读取 RGB 图像, 返回 `(3, H, W)` 布局、取值 `[0, 1]` 的数组.
///
/// - png: 解码为 8-bit RGB 后除以 255;
/// - npy: 必须是 `(3, H, W)` 形状, 除以 255.
pub fn read_rgb<P: AsRef<Path>>(path: P) -> Result<Array3<f32>, LoadError> {
    let path = path.as_ref();
    match FileType::of(path)? {
        FileType::Png => {
            let img = image::open(path)
                .map_err(|e| LoadError::Image(path.to_owned(), e))?
                .to_rgb8();
            let (w, h) = img.dimensions();
            Ok(Array3::from_shape_fn(
                (3, h as usize, w as usize),
                |(c, r, col)| img.get_pixel(col as u32, r as u32)[c] as f32 / 255.0,
            ))
        }
        FileType::Npy => {
            let arr = read_npy_f32(path)?;
            if arr.ndim() != 3 || arr.shape()[0] != 3 {
                return Err(LoadError::Shape {
                    path: path.to_owned(),
                    shape: arr.shape().to_vec(),
                });
            }
            let arr = arr
                .into_dimensionality::<Ix3>()
                .map_err(|_| LoadError::Shape {
                    path: path.to_owned(),
                    shape: vec![],
                })?;
            Ok(arr / 255.0)
        }
    }
}

/// 读取 png 为 `(H, W, 3)` 布局的 8-bit RGB 数组, 不做归一化.
pub fn read_rgb8_hwc<P: AsRef<Path>>(path: P) -> Result<Array3<u8>, LoadError> {
    let path = path.as_ref();
    if FileType::of(path)? != FileType::Png {
        return Err(LoadError::UnsupportedFormat(path.to_owned()));
    }
    let img = image::open(path)
        .map_err(|e| LoadError::Image(path.to_owned(), e))?
        .to_rgb8();
    let (w, h) = img.dimensions();
    let shape = vec![h as usize, w as usize, 3];
    Array3::from_shape_vec((h as usize, w as usize, 3), img.into_raw()).map_err(|_| {
        LoadError::Shape {
            path: path.to_owned(),
            shape,
        }
    })
}

/// 读取二值掩膜. 所有非零值都被视为森林 (1).
///
/// - npy: 接受 `(H, W)` 或 `(1, H, W)` 形状;
/// - png: 转为灰度后判断.
pub fn read_mask<P: AsRef<Path>>(path: P) -> Result<Array2<u8>, LoadError> {
    let path = path.as_ref();
    match FileType::of(path)? {
        FileType::Png => {
            let img = image::open(path)
                .map_err(|e| LoadError::Image(path.to_owned(), e))?
                .to_luma8();
            let (w, h) = img.dimensions();
            Ok(Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
                (img.get_pixel(c as u32, r as u32)[0] != 0) as u8
            }))
        }
        FileType::Npy => {
            let arr = read_npy_f32(path)?;
            let shape = arr.shape().to_vec();
            let arr = match shape.as_slice() {
                &[_, _] => arr.into_dimensionality::<Ix2>(),
                &[1, h, w] => arr.into_shape((h, w)),
                _ => {
                    return Err(LoadError::Shape {
                        path: path.to_owned(),
                        shape: shape.clone(),
                    })
                }
            }
            .map_err(|_| LoadError::Shape {
                path: path.to_owned(),
                shape: vec![],
            })?;
            Ok(arr.mapv(|v| (v != 0.0) as u8))
        }
    }
}

/// 以 `u8` npy 格式保存掩膜.
pub fn write_mask_npy<P: AsRef<Path>>(path: P, mask: ArrayView2<u8>) -> Result<(), LoadError> {
    let path = path.as_ref();
    write_npy(path, &mask).map_err(|e| LoadError::WriteNpy(path.to_owned(), e))
}
