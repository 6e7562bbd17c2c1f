use crate::error::BoxError;
use bytes::Bytes;
use futures_util::stream::Stream;
use memchr::memmem::Finder;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A growable byte buffer with a logical head and tail.
///
/// Unread bytes are kept in one contiguous run so the substring scanner
/// always sees a linear view. `advance` moves the head forward; a write that
/// would run past the end of the region first compacts the unread bytes back
/// to offset 0, and grows the region to the next power of two when they no
/// longer fit at all. Bytes only leave through `advance`/`take`.
pub(crate) struct RingBuffer {
    buf: Vec<u8>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> RingBuffer {
        RingBuffer {
            buf: vec![0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The logical view of the unread bytes.
    pub fn peek(&self) -> &[u8] {
        &self.buf[self.head..self.head + self.len]
    }

    pub fn write(&mut self, bytes: &[u8]) {
        let needed = self.len + bytes.len();

        if needed > self.buf.len() {
            let mut grown = vec![0; needed.next_power_of_two()];
            grown[..self.len].copy_from_slice(&self.buf[self.head..self.head + self.len]);
            self.buf = grown;
            self.head = 0;
        } else if self.head + needed > self.buf.len() {
            self.buf.copy_within(self.head..self.head + self.len, 0);
            self.head = 0;
        }

        let tail = self.head + self.len;
        self.buf[tail..tail + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// Position of `needle` within the logical view, searching from `from`.
    pub fn index_of(&self, needle: &Finder<'_>, from: usize) -> Option<usize> {
        if from >= self.len {
            return None;
        }

        needle.find(&self.peek()[from..]).map(|idx| idx + from)
    }

    /// Drops the first `n` logical bytes.
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.len);
        self.head += n;
        self.len -= n;

        if self.len == 0 {
            self.head = 0;
        }
    }

    /// Copies out the first `n` logical bytes, then advances past them.
    pub fn take(&mut self, n: usize) -> Bytes {
        let bytes = Bytes::copy_from_slice(&self.peek()[..n]);
        self.advance(n);
        bytes
    }
}

/// Outcome of pulling on the body stream.
pub(crate) enum Pull {
    /// A chunk landed in the ring buffer.
    Data,
    /// The stream is over; the ring holds whatever is left.
    Eof,
    /// Nothing ready, the waker is registered.
    Pending,
}

/// Adapter draining the body stream into the ring buffer on demand.
pub(crate) struct StreamBuffer<S> {
    pub(crate) eof: bool,
    pub(crate) ring: RingBuffer,
    stream: S,
}

impl<S> StreamBuffer<S> {
    pub fn new(stream: S, initial_buffer_size: usize) -> Self {
        StreamBuffer {
            eof: false,
            ring: RingBuffer::with_capacity(initial_buffer_size),
            stream,
        }
    }

    /// Pulls a single chunk into the ring buffer.
    ///
    /// One chunk at a time keeps residency bounded by the scan window plus
    /// one chunk, no matter how much the source has ready.
    pub fn poll_next_chunk<E>(&mut self, cx: &mut Context) -> Result<Pull, crate::Error>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        if self.eof {
            return Ok(Pull::Eof);
        }

        match Pin::new(&mut self.stream).poll_next(cx) {
            Poll::Ready(Some(Ok(data))) => {
                self.ring.write(&data);
                Ok(Pull::Data)
            }
            Poll::Ready(Some(Err(err))) => Err(crate::Error::StreamReadFailed(Arc::new(err.into()))),
            Poll::Ready(None) => {
                self.eof = true;
                Ok(Pull::Eof)
            }
            Poll::Pending => Ok(Pull::Pending),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_take() {
        let mut ring = RingBuffer::with_capacity(8);
        ring.write(b"abcdef");
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.peek(), b"abcdef");

        let head = ring.take(4);
        assert_eq!(&head[..], b"abcd");
        assert_eq!(ring.peek(), b"ef");
    }

    #[test]
    fn test_growth_doubles_and_preserves_order() {
        let mut ring = RingBuffer::with_capacity(4);
        ring.write(b"abc");
        ring.write(b"defgh");
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.peek(), b"abcdefgh");

        ring.write(b"i");
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.peek(), b"abcdefghi");
    }

    #[test]
    fn test_compaction_reuses_consumed_space() {
        let mut ring = RingBuffer::with_capacity(8);
        ring.write(b"abcdef");
        ring.advance(4);

        // 2 unread + 4 new fit in 8, so the capacity must not change.
        ring.write(b"ghij");
        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.peek(), b"efghij");
    }

    #[test]
    fn test_index_of_from_offset() {
        let mut ring = RingBuffer::with_capacity(16);
        ring.write(b"xx--b--b");

        let needle = Finder::new(b"--b").into_owned();
        assert_eq!(ring.index_of(&needle, 0), Some(2));
        assert_eq!(ring.index_of(&needle, 3), Some(5));
        assert_eq!(ring.index_of(&needle, 6), None);

        ring.advance(3);
        assert_eq!(ring.index_of(&needle, 0), Some(2));
    }

    #[test]
    fn test_take_empty_and_head_reset() {
        let mut ring = RingBuffer::with_capacity(4);
        ring.write(b"ab");
        assert_eq!(&ring.take(0)[..], b"");
        ring.advance(2);
        assert!(ring.is_empty());

        // head snapped back, so a full-capacity write needs no compaction
        ring.write(b"cdef");
        assert_eq!(ring.peek(), b"cdef");
    }
}
