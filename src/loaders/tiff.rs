//! # TIFF 图像读取
//!
//! 用 `tiff` 库解码单通道（灰度）探测器图像。样本可以是任意位宽的
//! 无符号整数、有符号整数或浮点；压缩、多条带与分块由库处理。
//!
//! ## 文本标签
//! ```text
//! 269 DocumentName -> comment
//! 306 DateTime     -> date
//! ```
//!
//! ## 依赖关系
//! - 被 `loaders/dat.rs`, `loaders/mod.rs` 使用
//! - 使用 `tiff` 库解码

use crate::error::{DfredError, Result};
use crate::models::{keys, Image, Metadata, Size2d};

use ::tiff::decoder::{Decoder, DecodingResult};
use ::tiff::tags::Tag;
use ::tiff::{ColorType, TiffError};
use std::fs;
use std::io::Cursor;
use std::path::Path;

const DOCUMENT_NAME: u16 = 269;

/// 读出的图像及其文本元数据
#[derive(Debug, Clone)]
pub struct TiffImage {
    pub image: Image,
    pub metadata: Metadata,
}

fn tiff_error(name: &str, reason: impl Into<String>) -> DfredError {
    DfredError::ParseError {
        format: "tiff".to_string(),
        path: name.to_string(),
        reason: reason.into(),
    }
}

fn decode_error(name: &str, e: TiffError) -> DfredError {
    tiff_error(name, e.to_string())
}

/// 读取 TIFF 文件
pub fn read_tiff_file(path: &Path) -> Result<TiffImage> {
    if !path.exists() {
        return Err(DfredError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let data = fs::read(path).map_err(|e| DfredError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_tiff_bytes(&data, &path.display().to_string())
}

/// 从内存解析 TIFF（第一幅图像）
pub fn parse_tiff_bytes(data: &[u8], name: &str) -> Result<TiffImage> {
    let mut decoder = Decoder::new(Cursor::new(data)).map_err(|e| decode_error(name, e))?;

    let (width, height) = decoder.dimensions().map_err(|e| decode_error(name, e))?;
    match decoder.colortype().map_err(|e| decode_error(name, e))? {
        ColorType::Gray(_) => {}
        other => {
            return Err(tiff_error(
                name,
                format!("only single-channel images are supported, found {:?}", other),
            ))
        }
    }

    let mut metadata = Metadata::new();
    for (tag, key) in [
        (Tag::from_u16_exhaustive(DOCUMENT_NAME), keys::COMMENT),
        (Tag::DateTime, keys::DATE),
    ] {
        if let Some(text) = text_tag(&mut decoder, tag, name)? {
            metadata = metadata.with(key, text);
        }
    }

    let intens = match decoder.read_image().map_err(|e| decode_error(name, e))? {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    };

    let size = Size2d::new(width as usize, height as usize);
    Ok(TiffImage {
        image: Image::new(size, intens)?,
        metadata,
    })
}

/// 可选的 ASCII 标签（去掉结尾的 NUL 与空白）
fn text_tag(
    decoder: &mut Decoder<Cursor<&[u8]>>,
    tag: Tag,
    name: &str,
) -> Result<Option<String>> {
    let Some(value) = decoder.find_tag(tag).map_err(|e| decode_error(name, e))? else {
        return Ok(None);
    };
    let text = value.into_string().map_err(|e| decode_error(name, e))?;
    let text = text.trim_end_matches('\0').trim();
    Ok((!text.is_empty()).then(|| text.to_string()))
}

/// 写一幅灰度 TIFF（测试用）
#[cfg(test)]
pub(crate) fn encode_test_tiff_as<C>(
    w: u32,
    h: u32,
    samples: &[C::Inner],
    comment: Option<&str>,
    rows_per_strip: u32,
) -> Vec<u8>
where
    C: ::tiff::encoder::colortype::ColorType,
    [C::Inner]: ::tiff::encoder::TiffValue,
{
    use ::tiff::encoder::TiffEncoder;

    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut out).unwrap();
        let mut image = encoder.new_image::<C>(w, h).unwrap();
        image.rows_per_strip(rows_per_strip).unwrap();
        if let Some(c) = comment {
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(DOCUMENT_NAME), c)
                .unwrap();
        }
        image
            .encoder()
            .write_tag(Tag::DateTime, "2024:03:01 12:00:00")
            .unwrap();
        image.write_data(samples).unwrap();
    }
    out.into_inner()
}

/// 32 位无符号灰度，单条带
#[cfg(test)]
pub(crate) fn encode_test_tiff(
    w: u32,
    h: u32,
    samples: &[u32],
    comment: Option<&str>,
) -> Vec<u8> {
    encode_test_tiff_as::<::tiff::encoder::colortype::Gray32>(w, h, samples, comment, h)
}
