use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, VideoError};

/// Size of the banner fields this parser understands.
///
/// A banner may declare a larger length; trailing bytes are skipped.
pub const HEADER_SIZE: usize = 24;

/// Frames are sent even when nothing changed.
pub const FLAG_FRAMES_REPEAT: u8 = 0x01;
/// Frames are always upright regardless of device rotation.
pub const FLAG_ALWAYS_UPRIGHT: u8 = 0x02;
/// Frame tearing may be visible.
pub const FLAG_MAY_TEAR: u8 = 0x04;

/// The minicap banner, sent once at the start of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u8,
    pub pid: u32,
    pub real_width: u32,
    pub real_height: u32,
    pub virtual_width: u32,
    pub virtual_height: u32,
    pub orientation: u8,
    pub bitflags: u8,
}

impl FrameHeader {
    /// Width of the emitted frames (the virtual width).
    pub fn width(&self) -> u32 {
        self.virtual_width
    }

    /// Height of the emitted frames (the virtual height).
    pub fn height(&self) -> u32 {
        self.virtual_height
    }

    pub fn frames_repeat(&self) -> bool {
        self.bitflags & FLAG_FRAMES_REPEAT != 0
    }

    pub fn always_upright(&self) -> bool {
        self.bitflags & FLAG_ALWAYS_UPRIGHT != 0
    }

    pub fn may_tear(&self) -> bool {
        self.bitflags & FLAG_MAY_TEAR != 0
    }

    /// Write the banner in wire format.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u8(self.version);
        dst.put_u8(HEADER_SIZE as u8);
        dst.put_u32_le(self.pid);
        dst.put_u32_le(self.real_width);
        dst.put_u32_le(self.real_height);
        dst.put_u32_le(self.virtual_width);
        dst.put_u32_le(self.virtual_height);
        dst.put_u8(self.orientation);
        dst.put_u8(self.bitflags);
    }
}

/// Decode the banner from a buffer.
///
/// Returns `Ok(None)` until the full declared length is buffered. On success,
/// consumes the banner bytes.
pub fn decode_header(src: &mut BytesMut) -> Result<Option<FrameHeader>> {
    if src.len() < 2 {
        return Ok(None);
    }

    let declared = src[1] as usize;
    if declared < HEADER_SIZE {
        return Err(VideoError::Decode(format!(
            "banner declares {declared} bytes, need at least {HEADER_SIZE}"
        )));
    }
    if src.len() < declared {
        return Ok(None);
    }

    let mut banner = src.split_to(declared);
    let version = banner.get_u8();
    banner.advance(1);
    Ok(Some(FrameHeader {
        version,
        pid: banner.get_u32_le(),
        real_width: banner.get_u32_le(),
        real_height: banner.get_u32_le(),
        virtual_width: banner.get_u32_le(),
        virtual_height: banner.get_u32_le(),
        orientation: banner.get_u8(),
        bitflags: banner.get_u8(),
    }))
}

/// Total bytes the banner needs given what is buffered so far.
pub(crate) fn header_bytes_needed(src: &[u8]) -> usize {
    match src.get(1) {
        Some(&declared) => (declared as usize).max(HEADER_SIZE),
        None => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameHeader {
        FrameHeader {
            version: 1,
            pid: 100,
            real_width: 1080,
            real_height: 1920,
            virtual_width: 1080,
            virtual_height: 1920,
            orientation: 0,
            bitflags: 3,
        }
    }

    #[test]
    fn decodes_banner_fields() {
        let mut buf = BytesMut::new();
        sample().encode(&mut buf);
        assert_eq!(buf.len(), HEADER_SIZE);

        let header = decode_header(&mut buf).unwrap().unwrap();
        assert_eq!(header, sample());
        assert!(buf.is_empty());
    }

    #[test]
    fn flag_helpers() {
        let header = sample();
        assert!(header.frames_repeat());
        assert!(header.always_upright());
        assert!(!header.may_tear());
        assert_eq!((header.width(), header.height()), (1080, 1920));
    }

    #[test]
    fn waits_for_declared_length() {
        let mut full = BytesMut::new();
        sample().encode(&mut full);

        for cut in 0..HEADER_SIZE {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode_header(&mut partial).unwrap().is_none(), "cut {cut}");
            assert_eq!(partial.len(), cut);
        }
    }

    #[test]
    fn skips_extended_banner_bytes() {
        let mut buf = BytesMut::new();
        sample().encode(&mut buf);
        buf[1] = 26;
        buf.put_slice(&[0xAA, 0xBB, 0xFF, 0xD8]);

        let header = decode_header(&mut buf).unwrap().unwrap();
        assert_eq!(header.pid, 100);
        assert_eq!(buf.as_ref(), &[0xFF, 0xD8]);
    }

    #[test]
    fn rejects_short_declared_length() {
        let mut buf = BytesMut::from(&[1u8, 10, 0, 0][..]);
        assert!(matches!(
            decode_header(&mut buf),
            Err(VideoError::Decode(_))
        ));
    }

    #[test]
    fn bytes_needed_tracks_declared_length() {
        assert_eq!(header_bytes_needed(&[]), 2);
        assert_eq!(header_bytes_needed(&[1]), 2);
        assert_eq!(header_bytes_needed(&[1, 24]), 24);
        assert_eq!(header_bytes_needed(&[1, 30]), 30);
    }
}
