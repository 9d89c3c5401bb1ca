use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Reader adapter that reports `(read, total)` byte counts after every read
///
/// Bytes, errors and end-of-data from the inner reader pass through untouched.
pub struct ProgressReader<R, F> {
    inner: R,
    total: u64,
    read: u64,
    on_progress: F,
}

impl<R, F> ProgressReader<R, F>
where
    F: FnMut(u64, u64),
{
    pub fn new(inner: R, total: u64, on_progress: F) -> Self {
        Self {
            inner,
            total,
            read: 0,
            on_progress,
        }
    }

    /// Bytes read so far
    #[allow(dead_code)]
    pub fn read(&self) -> u64 {
        self.read
    }
}

impl<R, F> AsyncRead for ProgressReader<R, F>
where
    R: AsyncRead + Unpin,
    F: FnMut(u64, u64) + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();

        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = (buf.filled().len() - before) as u64;
                this.read += n;
                (this.on_progress)(this.read, this.total);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    /// Yields its data in fixed-size chunks, then optionally fails
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        fail_at_end: bool,
    }

    impl AsyncRead for ChunkedReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if this.pos == this.data.len() && this.fail_at_end {
                return Poll::Ready(Err(io::Error::other("broken pipe")));
            }
            let end = (this.pos + this.chunk)
                .min(this.data.len())
                .min(this.pos + buf.remaining());
            buf.put_slice(&this.data[this.pos..end]);
            this.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_progress_reports_running_total() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let inner = ChunkedReader {
            data: data.clone(),
            pos: 0,
            chunk: 64,
            fail_at_end: false,
        };

        let mut seen = Vec::new();
        let mut reader = ProgressReader::new(inner, data.len() as u64, |read, total| {
            seen.push((read, total))
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(reader.read(), 1000);
        drop(reader);

        assert_eq!(out, data);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(seen.iter().all(|&(_, total)| total == 1000));
        assert_eq!(seen.last(), Some(&(1000, 1000)));
        // 16 chunks (15 x 64 + 40) before end of data
        assert!(seen.len() >= 16);
    }

    #[tokio::test]
    async fn test_progress_empty_stream() {
        let mut seen = Vec::new();
        let mut reader = ProgressReader::new(&b""[..], 0, |read, total| seen.push((read, total)));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        drop(reader);

        assert!(out.is_empty());
        assert_eq!(seen, vec![(0, 0)]);
    }

    #[tokio::test]
    async fn test_progress_propagates_errors() {
        let inner = ChunkedReader {
            data: vec![7u8; 10],
            pos: 0,
            chunk: 4,
            fail_at_end: true,
        };

        let mut calls = 0;
        let mut reader = ProgressReader::new(inner, 10, |_, _| calls += 1);

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.to_string(), "broken pipe");
        assert_eq!(reader.read(), 10);
        drop(reader);

        // One callback per successful chunk, none for the failed read
        assert_eq!(calls, 3);
    }
}
