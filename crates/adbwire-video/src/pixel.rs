use std::io::Write;
use std::iter::FusedIterator;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, VideoError};
use crate::framebuffer::FramebufferMeta;

/// Bytes per pixel in normalized output.
pub const RGB_BYTES: usize = 3;

/// Where each 8-bit channel sits inside a packed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    bits_per_pixel: u32,
    red: usize,
    green: usize,
    blue: usize,
    alpha: Option<usize>,
}

impl PixelLayout {
    /// Describe a packed layout. Offsets are in bytes from the pixel start.
    ///
    /// Fails unless `bits_per_pixel` is 24 or 32 and every offset lies
    /// inside the pixel.
    pub fn new(
        bits_per_pixel: u32,
        red: usize,
        green: usize,
        blue: usize,
        alpha: Option<usize>,
    ) -> Result<Self> {
        if bits_per_pixel != 24 && bits_per_pixel != 32 {
            return Err(VideoError::UnsupportedPixelFormat { bits_per_pixel });
        }
        let pixel_bytes = (bits_per_pixel / 8) as usize;

        let channels = [
            ("red", Some(red)),
            ("green", Some(green)),
            ("blue", Some(blue)),
            ("alpha", alpha),
        ];
        for (channel, offset) in channels {
            if let Some(offset) = offset.filter(|o| *o >= pixel_bytes) {
                return Err(VideoError::InvalidChannelOffset {
                    channel,
                    offset,
                    pixel_bytes,
                });
            }
        }

        Ok(Self {
            bits_per_pixel,
            red,
            green,
            blue,
            alpha,
        })
    }

    /// Layout described by a framebuffer header. Header offsets are in bits.
    pub fn from_meta(meta: &FramebufferMeta) -> Result<Self> {
        let alpha = (meta.alpha_length > 0).then_some((meta.alpha_offset / 8) as usize);
        Self::new(
            meta.bpp,
            (meta.red_offset / 8) as usize,
            (meta.green_offset / 8) as usize,
            (meta.blue_offset / 8) as usize,
            alpha,
        )
    }

    /// Packed `R G B`.
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 24,
            red: 0,
            green: 1,
            blue: 2,
            alpha: None,
        }
    }

    /// Packed `R G B A`.
    pub fn rgba8888() -> Self {
        Self {
            bits_per_pixel: 32,
            red: 0,
            green: 1,
            blue: 2,
            alpha: Some(3),
        }
    }

    /// Packed `B G R A`.
    pub fn bgra8888() -> Self {
        Self {
            bits_per_pixel: 32,
            red: 2,
            green: 1,
            blue: 0,
            alpha: Some(3),
        }
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_pixel
    }

    pub fn pixel_bytes(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    pub fn alpha_offset(&self) -> Option<usize> {
        self.alpha
    }

    fn rgb(&self, pixel: &[u8]) -> [u8; RGB_BYTES] {
        [pixel[self.red], pixel[self.green], pixel[self.blue]]
    }
}

/// Converts raw pixel chunks into packed RGB.
///
/// Chunks may split a pixel anywhere; the trailing partial pixel is kept
/// until the next [`push`](Self::push) completes it. Alpha is dropped.
#[derive(Debug)]
pub struct PixelNormalizer {
    layout: PixelLayout,
    residual: BytesMut,
}

impl PixelNormalizer {
    pub fn new(layout: PixelLayout) -> Self {
        Self {
            layout,
            residual: BytesMut::new(),
        }
    }

    /// Normalizer for the pixel data following a framebuffer header.
    pub fn from_meta(meta: &FramebufferMeta) -> Result<Self> {
        Ok(Self::new(PixelLayout::from_meta(meta)?))
    }

    /// Append `chunk` and iterate the RGB triples of every complete pixel.
    ///
    /// The iterator is lazy: pixels it has not yet yielded when dropped stay
    /// buffered and come out of the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Pixels<'_> {
        self.residual.extend_from_slice(chunk);
        Pixels { normalizer: self }
    }

    /// Append `chunk` and return all complete pixels as contiguous RGB bytes.
    ///
    /// The result is empty when less than one full pixel is available.
    pub fn transform(&mut self, chunk: &[u8]) -> Bytes {
        let pixels = self.push(chunk);
        let mut out = BytesMut::with_capacity(pixels.len() * RGB_BYTES);
        for rgb in pixels {
            out.put_slice(&rgb);
        }
        out.freeze()
    }

    /// Bytes of an incomplete pixel (or unread pixels) held for the next call.
    pub fn residual_len(&self) -> usize {
        self.residual.len()
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }
}

/// RGB triples of the complete pixels currently buffered.
#[derive(Debug)]
pub struct Pixels<'a> {
    normalizer: &'a mut PixelNormalizer,
}

impl Iterator for Pixels<'_> {
    type Item = [u8; RGB_BYTES];

    fn next(&mut self) -> Option<Self::Item> {
        let pixel_bytes = self.normalizer.layout.pixel_bytes();
        let residual = &mut self.normalizer.residual;
        if residual.len() < pixel_bytes {
            return None;
        }
        let rgb = self.normalizer.layout.rgb(&residual[..pixel_bytes]);
        residual.advance(pixel_bytes);
        Some(rgb)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.normalizer.residual.len() / self.normalizer.layout.pixel_bytes();
        (n, Some(n))
    }
}

impl ExactSizeIterator for Pixels<'_> {}

impl FusedIterator for Pixels<'_> {}

/// `Write` adapter that normalizes everything written into a sink.
///
/// Lets a raw pixel stream be copied straight into RGB output, e.g. with
/// `FramedReader::read_byte_flow`.
///
/// RGB bytes the sink refuses stay pending and are retried by the next
/// `write` or `flush`. A `write` only fails, consuming nothing, while that
/// retry fails.
#[derive(Debug)]
pub struct RgbWriter<W> {
    normalizer: PixelNormalizer,
    pending: BytesMut,
    sink: W,
}

impl<W: Write> RgbWriter<W> {
    pub fn new(normalizer: PixelNormalizer, sink: W) -> Self {
        Self {
            normalizer,
            pending: BytesMut::new(),
            sink,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Bytes of an incomplete trailing pixel not yet written.
    pub fn residual_len(&self) -> usize {
        self.normalizer.residual_len()
    }

    /// Normalized bytes not yet accepted by the sink.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Consume the adapter and return the sink. Pending bytes are dropped;
    /// call `flush` first.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn write_pending(&mut self) -> std::io::Result<()> {
        while !self.pending.is_empty() {
            match self.sink.write(&self.pending) {
                Ok(0) => return Err(std::io::ErrorKind::WriteZero.into()),
                Ok(n) => self.pending.advance(n),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<W: Write> Write for RgbWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.write_pending()?;

        let rgb = self.normalizer.transform(buf);
        self.pending.extend_from_slice(&rgb);
        // `buf` is accepted from here on; a failure is reported by the next call.
        let _ = self.write_pending();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.write_pending()?;
        self.sink.flush()
    }
}
