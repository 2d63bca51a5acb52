//! Scripted transport shared by the blocking and tokio tests.

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
};

/// One scripted result of a `read` or `write` call.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Bytes for the next read; whatever does not fit the caller's buffer is kept for the one after.
    Data(Vec<u8>),
    /// The next write takes up to this many bytes.
    Accept(usize),
    /// The next write reports this many bytes no matter how many it was offered.
    Claim(usize),
    Interrupt,
    Eof,
    Fail(io::ErrorKind),
}

/// Transport double that replays a script and records what it saw.
///
/// Once the script is exhausted reads return end-of-stream and writes accept everything.
#[derive(Debug, Default)]
pub(crate) struct Scripted {
    steps: VecDeque<Step>,
    pub(crate) calls: usize,
    pub(crate) written: Vec<u8>,
}

impl Scripted {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn fragments<'a>(fragments: impl IntoIterator<Item = &'a [u8]>) -> Self {
        Self::new(fragments.into_iter().map(|f| Step::Data(f.to_vec())))
    }

    fn next_read(&mut self, room: usize) -> io::Result<Vec<u8>> {
        self.calls += 1;
        match self.steps.pop_front() {
            None | Some(Step::Eof) => Ok(Vec::new()),
            Some(Step::Interrupt) => Err(io::ErrorKind::Interrupted.into()),
            Some(Step::Fail(kind)) => Err(kind.into()),
            Some(Step::Data(mut data)) => {
                if room < data.len() {
                    let rest = data.split_off(room);
                    self.steps.push_front(Step::Data(rest));
                }
                Ok(data)
            }
            Some(step) => panic!("write step {step:?} in a read script"),
        }
    }

    fn next_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.calls += 1;
        match self.steps.pop_front() {
            None => {
                self.written.extend_from_slice(buf);
                Ok(buf.len())
            }
            Some(Step::Accept(count)) => {
                let count = count.min(buf.len());
                self.written.extend_from_slice(&buf[..count]);
                Ok(count)
            }
            Some(Step::Claim(count)) => Ok(count),
            Some(Step::Interrupt) => Err(io::ErrorKind::Interrupted.into()),
            Some(Step::Fail(kind)) => Err(kind.into()),
            Some(step) => panic!("read step {step:?} in a write script"),
        }
    }
}

impl Read for Scripted {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.next_read(buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl Write for Scripted {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.next_write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(feature = "tokio")]
mod tokio_io {
    use {
        super::Scripted,
        std::{
            io,
            pin::Pin,
            task::{Context, Poll},
        },
        tokio::io::{AsyncRead, AsyncWrite, ReadBuf},
    };

    impl AsyncRead for Scripted {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let data = self.get_mut().next_read(buf.remaining())?;
            buf.put_slice(&data);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for Scripted {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(self.get_mut().next_write(buf))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
