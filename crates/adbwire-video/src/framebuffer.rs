//! Header of a raw framebuffer dump (`framebuffer:` service).

use bytes::Buf;

use crate::error::{Result, VideoError};

/// Size of the framebuffer header: thirteen little-endian u32 fields.
pub const FRAMEBUFFER_HEADER_SIZE: usize = 52;

/// Header version used by the pre-ICS raw image format.
pub const LEGACY_RAW_IMAGE_VERSION: u32 = 16;

/// Channel order of the pixels that follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Rgb => "rgb",
            PixelFormat::Rgba => "rgba",
        }
    }
}

/// Framebuffer geometry and channel placement. Offsets and lengths are in
/// bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferMeta {
    pub version: u32,
    pub bpp: u32,
    pub size: u32,
    pub width: u32,
    pub height: u32,
    pub red_offset: u32,
    pub red_length: u32,
    pub blue_offset: u32,
    pub blue_length: u32,
    pub green_offset: u32,
    pub green_length: u32,
    pub alpha_offset: u32,
    pub alpha_length: u32,
}

impl FramebufferMeta {
    /// Parse the 52-byte header.
    ///
    /// Wire order is version, bpp, size, width, height, then offset/length
    /// pairs for red, blue, green and alpha.
    pub fn parse(header: &[u8]) -> Result<Self> {
        if header.len() < FRAMEBUFFER_HEADER_SIZE {
            return Err(VideoError::Decode(format!(
                "framebuffer header needs {FRAMEBUFFER_HEADER_SIZE} bytes, got {}",
                header.len()
            )));
        }

        let mut src = &header[..FRAMEBUFFER_HEADER_SIZE];
        let version = src.get_u32_le();
        if version == LEGACY_RAW_IMAGE_VERSION {
            return Err(VideoError::Decode(
                "legacy raw image format (version 16) is not supported".to_string(),
            ));
        }

        Ok(Self {
            version,
            bpp: src.get_u32_le(),
            size: src.get_u32_le(),
            width: src.get_u32_le(),
            height: src.get_u32_le(),
            red_offset: src.get_u32_le(),
            red_length: src.get_u32_le(),
            blue_offset: src.get_u32_le(),
            blue_length: src.get_u32_le(),
            green_offset: src.get_u32_le(),
            green_length: src.get_u32_le(),
            alpha_offset: src.get_u32_le(),
            alpha_length: src.get_u32_le(),
        })
    }

    /// `Rgba` when the header declares an alpha channel.
    pub fn format(&self) -> PixelFormat {
        if self.alpha_length > 0 {
            PixelFormat::Rgba
        } else {
            PixelFormat::Rgb
        }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::pixel::{PixelLayout, PixelNormalizer};

    fn header(fields: [u32; 13]) -> BytesMut {
        let mut buf = BytesMut::new();
        for field in fields {
            buf.put_u32_le(field);
        }
        buf
    }

    #[test]
    fn parses_rgba_header() {
        let raw = header([1, 32, 8, 1, 2, 0, 8, 16, 8, 8, 8, 24, 8]);
        let meta = FramebufferMeta::parse(&raw).unwrap();

        assert_eq!(meta.version, 1);
        assert_eq!(meta.bpp, 32);
        assert_eq!((meta.width, meta.height), (1, 2));
        assert_eq!(meta.blue_offset, 16);
        assert_eq!(meta.green_offset, 8);
        assert_eq!(meta.format(), PixelFormat::Rgba);
        assert_eq!(meta.pixel_count(), 2);
    }

    #[test]
    fn rgb_when_no_alpha() {
        let raw = header([1, 24, 6, 2, 1, 0, 8, 16, 8, 8, 8, 0, 0]);
        let meta = FramebufferMeta::parse(&raw).unwrap();
        assert_eq!(meta.format(), PixelFormat::Rgb);
        assert_eq!(meta.format().as_str(), "rgb");
    }

    #[test]
    fn rejects_legacy_and_short_headers() {
        let legacy = header([16, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            FramebufferMeta::parse(&legacy),
            Err(VideoError::Decode(_))
        ));
        assert!(matches!(
            FramebufferMeta::parse(&[0u8; 51]),
            Err(VideoError::Decode(_))
        ));
    }

    #[test]
    fn layout_from_meta_converts_bit_offsets() {
        // BGRA: blue at byte 0, red at byte 2.
        let raw = header([1, 32, 4, 1, 1, 16, 8, 0, 8, 8, 8, 24, 8]);
        let meta = FramebufferMeta::parse(&raw).unwrap();
        assert_eq!(PixelLayout::from_meta(&meta).unwrap(), PixelLayout::bgra8888());

        let mut normalizer = PixelNormalizer::from_meta(&meta).unwrap();
        assert_eq!(normalizer.transform(&[30, 20, 10, 255]).as_ref(), &[10, 20, 30]);
    }

    #[test]
    fn layout_from_meta_rejects_rgb565() {
        let raw = header([1, 16, 4, 1, 1, 11, 5, 0, 5, 5, 6, 0, 0]);
        let meta = FramebufferMeta::parse(&raw).unwrap();
        assert!(matches!(
            PixelLayout::from_meta(&meta),
            Err(VideoError::UnsupportedPixelFormat { bits_per_pixel: 16 })
        ));
    }
}
