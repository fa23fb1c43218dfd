//! Run the minicap decoder on a tokio task.

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tracing::debug;

use crate::error::{Result, VideoError};
use crate::minicap::codec::{MinicapCodec, MinicapEvent};
use crate::minicap::demuxer::DemuxConfig;
use crate::minicap::header::FrameHeader;

/// One-shot signal carrying the stream banner.
///
/// Written once by the stream task; any number of clones may read it.
#[derive(Debug, Clone)]
pub struct HeaderSignal {
    rx: watch::Receiver<Option<FrameHeader>>,
}

impl HeaderSignal {
    /// The banner, if it has arrived.
    pub fn get(&self) -> Option<FrameHeader> {
        *self.rx.borrow()
    }

    /// Wait for the banner. Fails with `Stopped` if the stream task ends
    /// without ever parsing one.
    pub async fn wait(&mut self) -> Result<FrameHeader> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(header) => (*header).ok_or(VideoError::Stopped),
            Err(_) => Err(VideoError::Stopped),
        }
    }
}

/// A minicap stream being decoded in the background.
#[derive(Debug)]
pub struct MinicapStream {
    /// Resolves once with the banner.
    pub header: HeaderSignal,
    /// Complete JPEG frames, in order.
    pub frames: mpsc::Receiver<Bytes>,
    task: JoinHandle<Result<()>>,
}

impl MinicapStream {
    /// Stop decoding and drop the source.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// Wait for the task to finish and return why it ended.
    ///
    /// Drops the frame receiver first, so a task blocked on a full queue
    /// exits cleanly.
    pub async fn join(self) -> Result<()> {
        let MinicapStream { task, frames, .. } = self;
        drop(frames);
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(VideoError::Stopped),
            Err(err) => Err(VideoError::Io(std::io::Error::other(err))),
        }
    }
}

/// Spawn a task that decodes `io` and publishes the banner and frames.
///
/// The task ends when the source ends, when decoding fails (including
/// [`VideoError::StreamCorruption`]), or when the frame receiver is dropped.
pub fn spawn_stream<R>(io: R, config: DemuxConfig) -> MinicapStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (header_tx, header_rx) = watch::channel(None);
    let (frame_tx, frame_rx) = mpsc::channel(config.frame_queue_depth.max(1));

    let task: JoinHandle<Result<()>> = tokio::spawn(async move {
        let codec = MinicapCodec::with_max_frame_size(config.max_frame_size);
        let mut events = FramedRead::with_capacity(io, codec, config.read_chunk_size);

        while let Some(event) = events.next().await {
            match event? {
                MinicapEvent::Header(header) => {
                    header_tx.send_replace(Some(header));
                }
                MinicapEvent::Frame(frame) => {
                    if frame_tx.send(frame).await.is_err() {
                        debug!("frame receiver dropped, stopping minicap stream");
                        return Ok(());
                    }
                }
            }
        }

        debug!("minicap source ended");
        Ok(())
    });

    MinicapStream {
        header: HeaderSignal { rx: header_rx },
        frames: frame_rx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use tokio::io::AsyncWriteExt;

    use super::*;
    use crate::minicap::codec::encode_frame;

    fn banner() -> FrameHeader {
        FrameHeader {
            version: 1,
            pid: 4242,
            real_width: 720,
            real_height: 1280,
            virtual_width: 360,
            virtual_height: 640,
            orientation: 0,
            bitflags: 0,
        }
    }

    #[tokio::test]
    async fn delivers_header_and_frames() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut stream = spawn_stream(server, DemuxConfig::default());

        let mut wire = BytesMut::new();
        banner().encode(&mut wire);
        encode_frame(&[0xFF, 0xD8, 0xAA], &mut wire).unwrap();
        client.write_all(&wire).await.unwrap();

        let mut signal = stream.header.clone();
        assert_eq!(signal.wait().await.unwrap(), banner());
        assert_eq!(stream.header.get(), Some(banner()));

        let frame = stream.frames.recv().await.unwrap();
        assert_eq!(frame.as_ref(), &[0xFF, 0xD8, 0xAA]);

        drop(client);
        assert!(stream.frames.recv().await.is_none());
        stream.join().await.unwrap();
    }

    #[tokio::test]
    async fn header_wait_fails_when_source_closes_early() {
        let (client, server) = tokio::io::duplex(64);
        let mut stream = spawn_stream(server, DemuxConfig::default());
        drop(client);

        assert!(matches!(stream.header.wait().await, Err(VideoError::Stopped)));
        assert!(matches!(
            stream.join().await,
            Err(VideoError::PrematureEof { missing: 2 })
        ));
    }

    #[tokio::test]
    async fn corruption_ends_the_task() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut stream = spawn_stream(server, DemuxConfig::default());

        let mut wire = BytesMut::new();
        banner().encode(&mut wire);
        encode_frame(&[0xFF, 0xD8, 1], &mut wire).unwrap();
        encode_frame(&[0x00, 0x00, 2], &mut wire).unwrap();
        encode_frame(&[0xFF, 0xD8, 3], &mut wire).unwrap();
        client.write_all(&wire).await.unwrap();

        assert_eq!(
            stream.frames.recv().await.unwrap().as_ref(),
            &[0xFF, 0xD8, 1]
        );
        assert!(stream.frames.recv().await.is_none());
        assert!(matches!(
            stream.join().await,
            Err(VideoError::StreamCorruption { .. })
        ));
    }

    #[tokio::test]
    async fn stop_aborts_the_task() {
        let (_client, server) = tokio::io::duplex(64);
        let stream = spawn_stream(server, DemuxConfig::default());
        stream.stop();
        assert!(matches!(stream.join().await, Err(VideoError::Stopped)));
    }
}
