use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, VideoError};

/// JPEG start-of-image marker every frame body must begin with.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Size of the little-endian length in front of each frame.
pub const FRAME_LENGTH_SIZE: usize = 4;

/// Default maximum frame size: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Write one frame in wire format: 4-byte LE length, then the JPEG body.
pub fn encode_frame(jpeg: &[u8], dst: &mut BytesMut) -> Result<()> {
    if jpeg.len() > u32::MAX as usize {
        return Err(VideoError::FrameTooLarge {
            size: jpeg.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(FRAME_LENGTH_SIZE + jpeg.len());
    dst.put_u32_le(jpeg.len() as u32);
    dst.put_slice(jpeg);
    Ok(())
}

/// Decode one frame from a buffer.
///
/// Returns `Ok(None)` until the whole frame is buffered. A complete frame
/// whose body does not start with [`JPEG_SOI`] is `StreamCorruption`; the
/// buffer is left untouched in that case.
pub fn decode_frame(src: &mut BytesMut, max_frame_size: usize) -> Result<Option<Bytes>> {
    if src.len() < FRAME_LENGTH_SIZE {
        return Ok(None);
    }

    let frame_len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    if frame_len > max_frame_size {
        return Err(VideoError::FrameTooLarge {
            size: frame_len,
            max: max_frame_size,
        });
    }

    let total = FRAME_LENGTH_SIZE + frame_len;
    if src.len() < total {
        return Ok(None);
    }

    let body = &src[FRAME_LENGTH_SIZE..total];
    if !body.starts_with(&JPEG_SOI) {
        return Err(VideoError::StreamCorruption {
            found: body[..body.len().min(JPEG_SOI.len())].to_vec(),
        });
    }

    src.advance(FRAME_LENGTH_SIZE);
    Ok(Some(src.split_to(frame_len).freeze()))
}

/// Total bytes the next frame needs given what is buffered so far.
pub(crate) fn frame_bytes_needed(src: &[u8]) -> usize {
    match src.get(..FRAME_LENGTH_SIZE) {
        Some(len) => {
            FRAME_LENGTH_SIZE + u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize
        }
        None => FRAME_LENGTH_SIZE,
    }
}

#[cfg(feature = "async")]
pub use self::async_codec::{MinicapCodec, MinicapEvent};

#[cfg(feature = "async")]
mod async_codec {
    use bytes::{Bytes, BytesMut};
    use tokio_util::codec::Decoder;
    use tracing::{debug, trace, warn};

    use super::{decode_frame, frame_bytes_needed, DEFAULT_MAX_FRAME_SIZE};
    use crate::error::VideoError;
    use crate::minicap::header::{decode_header, header_bytes_needed, FrameHeader};

    /// One parsed unit of the minicap stream.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MinicapEvent {
        /// The banner; always the first event, emitted once.
        Header(FrameHeader),
        /// A complete JPEG frame.
        Frame(Bytes),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum State {
        Header,
        Streaming,
        Stopped,
    }

    /// `tokio_util` decoder for the minicap stream.
    ///
    /// After any error the decoder stops and yields nothing further.
    #[derive(Debug, Clone)]
    pub struct MinicapCodec {
        state: State,
        max_frame_size: usize,
    }

    impl MinicapCodec {
        pub fn new() -> Self {
            Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
        }

        pub fn with_max_frame_size(max_frame_size: usize) -> Self {
            Self {
                state: State::Header,
                max_frame_size,
            }
        }

        /// Whether the decoder has stopped after an error.
        pub fn is_stopped(&self) -> bool {
            self.state == State::Stopped
        }

        fn step(&mut self, src: &mut BytesMut) -> Result<Option<MinicapEvent>, VideoError> {
            match self.state {
                State::Header => {
                    let Some(header) = decode_header(src)? else {
                        return Ok(None);
                    };
                    debug!(?header, "minicap banner");
                    self.state = State::Streaming;
                    Ok(Some(MinicapEvent::Header(header)))
                }
                State::Streaming => {
                    let Some(frame) = decode_frame(src, self.max_frame_size)? else {
                        return Ok(None);
                    };
                    trace!(len = frame.len(), "minicap frame");
                    Ok(Some(MinicapEvent::Frame(frame)))
                }
                State::Stopped => {
                    src.clear();
                    Ok(None)
                }
            }
        }
    }

    impl Default for MinicapCodec {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Decoder for MinicapCodec {
        type Item = MinicapEvent;
        type Error = VideoError;

        fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            self.step(src).inspect_err(|err| {
                if matches!(err, VideoError::StreamCorruption { .. }) {
                    warn!(%err, "minicap stream corrupted, stopping");
                }
                self.state = State::Stopped;
            })
        }

        fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
            if let Some(event) = self.decode(src)? {
                return Ok(Some(event));
            }
            let needed = match self.state {
                State::Header => header_bytes_needed(src),
                State::Streaming if !src.is_empty() => frame_bytes_needed(src),
                _ => return Ok(None),
            };
            self.state = State::Stopped;
            Err(VideoError::PrematureEof {
                missing: needed - src.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_frame() {
        let mut buf = BytesMut::new();
        encode_frame(&[0xFF, 0xD8, 0x00, 0x00], &mut buf).unwrap();
        assert_eq!(&buf[..4], &[4, 0, 0, 0]);

        let frame = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE)
            .unwrap()
            .unwrap();
        assert_eq!(frame.as_ref(), &[0xFF, 0xD8, 0x00, 0x00]);
        assert!(buf.is_empty());
    }

    #[test]
    fn waits_for_full_body() {
        let mut full = BytesMut::new();
        encode_frame(&[0xFF, 0xD8, 1, 2, 3, 4], &mut full).unwrap();

        for cut in 0..full.len() {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode_frame(&mut partial, DEFAULT_MAX_FRAME_SIZE)
                .unwrap()
                .is_none());
        }
    }

    #[test]
    fn bad_marker_is_corruption_and_not_consumed() {
        let mut buf = BytesMut::new();
        encode_frame(&[0x00, 0x00, 0x00, 0x00], &mut buf).unwrap();

        let err = decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE).unwrap_err();
        assert!(matches!(err, VideoError::StreamCorruption { ref found } if found == &[0, 0]));
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn too_short_for_marker_is_corruption() {
        let mut buf = BytesMut::new();
        encode_frame(&[0xFF], &mut buf).unwrap();
        assert!(matches!(
            decode_frame(&mut buf, DEFAULT_MAX_FRAME_SIZE),
            Err(VideoError::StreamCorruption { .. })
        ));
    }

    #[test]
    fn oversized_length_rejected_before_body() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1024);
        assert!(matches!(
            decode_frame(&mut buf, 16),
            Err(VideoError::FrameTooLarge {
                size: 1024,
                max: 16
            })
        ));
    }

    #[test]
    fn bytes_needed() {
        assert_eq!(frame_bytes_needed(&[]), 4);
        assert_eq!(frame_bytes_needed(&[10, 0]), 4);
        assert_eq!(frame_bytes_needed(&[10, 0, 0, 0, 0xFF]), 14);
    }

    #[cfg(feature = "async")]
    mod framed {
        use futures_util::StreamExt;
        use tokio_util::codec::FramedRead;

        use super::*;
        use crate::minicap::header::FrameHeader;

        fn banner() -> FrameHeader {
            FrameHeader {
                version: 1,
                pid: 100,
                real_width: 1080,
                real_height: 1920,
                virtual_width: 540,
                virtual_height: 960,
                orientation: 1,
                bitflags: 1,
            }
        }

        #[tokio::test]
        async fn yields_header_then_frames() {
            let mut wire = BytesMut::new();
            banner().encode(&mut wire);
            encode_frame(&[0xFF, 0xD8, 1], &mut wire).unwrap();
            encode_frame(&[0xFF, 0xD8, 2], &mut wire).unwrap();

            let bytes = wire.to_vec();
            let mut framed = FramedRead::new(bytes.as_slice(), MinicapCodec::new());

            assert_eq!(
                framed.next().await.unwrap().unwrap(),
                MinicapEvent::Header(banner())
            );
            assert_eq!(
                framed.next().await.unwrap().unwrap(),
                MinicapEvent::Frame(Bytes::from_static(&[0xFF, 0xD8, 1]))
            );
            assert_eq!(
                framed.next().await.unwrap().unwrap(),
                MinicapEvent::Frame(Bytes::from_static(&[0xFF, 0xD8, 2]))
            );
            assert!(framed.next().await.is_none());
        }

        #[tokio::test]
        async fn corruption_stops_the_codec() {
            let mut wire = BytesMut::new();
            banner().encode(&mut wire);
            encode_frame(&[0x00, 0x00], &mut wire).unwrap();
            encode_frame(&[0xFF, 0xD8], &mut wire).unwrap();

            let bytes = wire.to_vec();
            let mut framed = FramedRead::new(bytes.as_slice(), MinicapCodec::new());

            assert!(matches!(
                framed.next().await,
                Some(Ok(MinicapEvent::Header(_)))
            ));
            assert!(matches!(
                framed.next().await,
                Some(Err(VideoError::StreamCorruption { .. }))
            ));
            assert!(framed.decoder().is_stopped());
            assert!(!matches!(
                framed.next().await,
                Some(Ok(MinicapEvent::Frame(_)))
            ));
        }

        #[tokio::test]
        async fn eof_before_banner_is_premature() {
            let bytes = [1u8, 24, 0, 0];
            let mut framed = FramedRead::new(&bytes[..], MinicapCodec::new());
            assert!(matches!(
                framed.next().await,
                Some(Err(VideoError::PrematureEof { missing: 20 }))
            ));
        }

        #[tokio::test]
        async fn eof_mid_frame_is_premature() {
            let mut wire = BytesMut::new();
            banner().encode(&mut wire);
            wire.put_u32_le(10);
            wire.put_slice(&[0xFF, 0xD8, 0, 0]);

            let bytes = wire.to_vec();
            let mut framed = FramedRead::new(bytes.as_slice(), MinicapCodec::new());
            framed.next().await.unwrap().unwrap();
            assert!(matches!(
                framed.next().await,
                Some(Err(VideoError::PrematureEof { missing: 6 }))
            ));
        }
    }
}
