use crate::{HunterError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::str::FromStr;

// ICO entries store each side in one byte; 0 means 256.
const ICO_MAX_SIDE: u32 = 256;

/// A fetched logo: SVG stays text, everything else is decoded.
#[derive(Debug, Clone)]
pub enum LogoImage {
    Svg(String),
    Raster(DynamicImage),
}

impl LogoImage {
    pub fn is_svg(&self) -> bool {
        matches!(self, Self::Svg(_))
    }

    /// Pixel size; `None` for SVG.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Svg(_) => None,
            Self::Raster(img) => Some((img.width(), img.height())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Svg(_) => "svg",
            Self::Raster(_) => "raster",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Gif,
    WebP,
    Ico,
    Bmp,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "gif" => Ok(Self::Gif),
            "webp" => Ok(Self::WebP),
            "ico" => Ok(Self::Ico),
            "bmp" => Ok(Self::Bmp),
            _ => Err(HunterError::UnsupportedOutputFormat(value.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::Ico => "ico",
            Self::Bmp => "bmp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::WebP => ImageFormat::WebP,
            Self::Ico => ImageFormat::Ico,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = HunterError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

/// Parses `WxH` (e.g. `64x64`). Both sides must be positive.
pub fn parse_resize(value: &str) -> Result<(u32, u32)> {
    let invalid = || HunterError::InvalidResize(value.to_string());
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let w = w.trim().parse::<u32>().map_err(|_| invalid())?;
    let h = h.trim().parse::<u32>().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Encodes a fetched logo.
///
/// SVG text is returned as-is (format and resize do not apply). Rasters are
/// resized with Lanczos3 when requested; JPEG output is flattened onto white.
/// ICO output without a resize is scaled down to fit 256x256.
pub fn process_image(
    image: &LogoImage,
    format: OutputFormat,
    resize: Option<(u32, u32)>,
) -> Result<Vec<u8>> {
    let raster = match image {
        LogoImage::Svg(svg) => return Ok(svg.as_bytes().to_vec()),
        LogoImage::Raster(raster) => raster,
    };

    let resized;
    let source = match resize {
        Some((w, h)) if w == 0 || h == 0 => {
            return Err(HunterError::InvalidResize(format!("{w}x{h}")));
        }
        Some((w, h)) => {
            resized = raster.resize_exact(w, h, FilterType::Lanczos3);
            &resized
        }
        None if format == OutputFormat::Ico
            && (raster.width() > ICO_MAX_SIDE || raster.height() > ICO_MAX_SIDE) =>
        {
            resized = raster.resize(ICO_MAX_SIDE, ICO_MAX_SIDE, FilterType::Lanczos3);
            &resized
        }
        None => raster,
    };

    let encodable = match format {
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(flatten_onto_white(source)),
        OutputFormat::Png => source.clone(),
        OutputFormat::Gif | OutputFormat::WebP | OutputFormat::Ico | OutputFormat::Bmp => {
            DynamicImage::ImageRgba8(source.to_rgba8())
        }
    };

    let mut out = Vec::new();
    encodable.write_to(&mut Cursor::new(&mut out), format.image_format())?;
    Ok(out)
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}
