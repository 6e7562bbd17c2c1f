use crate::boundary::Boundary;
use crate::buffer::StreamBuffer;
use crate::config::ParserConfig;
use crate::constants;
use crate::helpers;
use bytes::Bytes;
use http::header::HeaderMap;
use memchr::memmem;

/// Where the parser currently is within the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// Scanning for the opening boundary; bytes before it are discarded.
    Preamble,
    /// Reading a part's header block. The buffer starts at the CRLF that
    /// ended the boundary line, so a zero-header part is a terminator match
    /// at offset 0.
    PartHeaders,
    /// Streaming the current part's payload to its `Field`.
    PartBody,
    /// Discarding an abandoned part's payload.
    SkippingBody,
    /// A boundary was just consumed; the next two bytes pick the successor
    /// state: CRLF means another part, `--` means the closing boundary.
    Delimiter,
    /// Past the closing boundary, draining whatever trails it.
    Epilogue,
    Eof,
    Failed,
}

/// Shared state between the `Multipart` emitter and the `Field` it handed
/// out. All mutation happens synchronously between stream polls.
pub(crate) struct ParserState<S> {
    pub(crate) buffer: StreamBuffer<S>,
    pub(crate) boundary: Boundary,
    pub(crate) config: ParserConfig,
    pub(crate) stage: Stage,
    /// Number of fields emitted so far; a field holding index
    /// `parts_emitted - 1` owns the payload currently in `PartBody`.
    pub(crate) parts_emitted: usize,
    /// Payload bytes delivered for the current part.
    pub(crate) body_bytes: u64,
    /// First parse error; re-raised on every later read.
    pub(crate) error: Option<crate::Error>,
}

impl<S> ParserState<S> {
    pub fn new(stream: S, boundary: Boundary, config: ParserConfig) -> Self {
        ParserState {
            buffer: StreamBuffer::new(stream, config.initial_buffer_size),
            boundary,
            config,
            stage: Stage::Preamble,
            parts_emitted: 0,
            body_bytes: 0,
            error: None,
        }
    }

    /// Records `err` as the terminal state and hands it back for returning.
    pub fn fail(&mut self, err: crate::Error) -> crate::Error {
        self.stage = Stage::Failed;
        self.error = Some(err.clone());
        err
    }

    /// Advances past the opening boundary.
    ///
    /// `Ok(None)` means more data is needed. On success the stage is
    /// `PartHeaders` (boundary followed by CRLF, which stays in the buffer)
    /// or `Epilogue` (immediately-closed body).
    pub fn read_preamble(&mut self) -> crate::Result<Option<()>> {
        let blen = self.boundary.start_len();

        loop {
            match self.buffer.ring.index_of(self.boundary.start(), 0) {
                Some(idx) => {
                    if self.buffer.ring.len() < idx + blen + 2 {
                        if self.buffer.eof {
                            return Err(self.fail(crate::Error::IncompleteStream));
                        }
                        // drop the preamble, keep the candidate boundary
                        self.buffer.ring.advance(idx);
                        return Ok(None);
                    }

                    let view = self.buffer.ring.peek();
                    let suffix = [view[idx + blen], view[idx + blen + 1]];

                    if suffix == constants::CRLF {
                        self.buffer.ring.advance(idx + blen);
                        self.stage = Stage::PartHeaders;
                        log::trace!("opening boundary found, {} preamble bytes dropped", idx);
                        return Ok(Some(()));
                    } else if suffix == constants::BOUNDARY_EXT {
                        self.buffer.ring.advance(idx + blen + 2);
                        self.stage = Stage::Epilogue;
                        log::trace!("body closed without parts");
                        return Ok(Some(()));
                    } else {
                        // a lookalike inside the preamble, keep scanning
                        self.buffer.ring.advance(idx + blen);
                    }
                }
                None => {
                    if self.buffer.eof {
                        return Err(self.fail(crate::Error::IncompleteStream));
                    }

                    // everything but a possible boundary prefix is preamble
                    let len = self.buffer.ring.len();
                    if len >= blen {
                        self.buffer.ring.advance(len - (blen - 1));
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Reads one part's header block, leaving the buffer at the first
    /// payload byte. `Ok(None)` means more data is needed.
    pub fn read_headers(&mut self) -> crate::Result<Option<HeaderMap>> {
        let max = self.config.max_header_size;
        let view = self.buffer.ring.peek();

        match memmem::find(view, &constants::CRLF_CRLF) {
            Some(idx) => {
                // bytes between the boundary line's CRLF and the terminator
                if idx.saturating_sub(constants::CRLF.len()) > max {
                    return Err(self.fail(crate::Error::HeaderSizeExceeded { limit: max }));
                }

                let block = self.buffer.ring.take(idx + constants::CRLF_CRLF.len());
                let header_bytes = if idx == 0 {
                    &[][..]
                } else {
                    &block[constants::CRLF.len()..idx]
                };

                let headers = helpers::parse_header_block(header_bytes);
                log::trace!("part headers complete, {} entries", headers.len());

                self.stage = Stage::PartBody;
                self.body_bytes = 0;
                Ok(Some(headers))
            }
            None => {
                if view.len() > max + constants::CRLF.len() + constants::CRLF_CRLF.len() {
                    return Err(self.fail(crate::Error::HeaderSizeExceeded { limit: max }));
                }
                if self.buffer.eof {
                    return Err(self.fail(crate::Error::IncompleteStream));
                }
                Ok(None)
            }
        }
    }

    /// Delivers the next run of payload bytes for the current part.
    ///
    /// `Ok(Some((true, bytes)))` is the final run: the separator has been
    /// consumed and the stage is `Delimiter`. `Ok(Some((false, bytes)))` is
    /// an intermediate run. `Ok(None)` means more data is needed.
    pub fn read_body(&mut self) -> crate::Result<Option<(bool, Bytes)>> {
        let mid_len = self.boundary.mid_len();

        match self.buffer.ring.index_of(self.boundary.mid(), 0) {
            Some(idx) => {
                self.check_file_size(idx as u64)?;

                let data = self.buffer.ring.take(idx);
                self.buffer.ring.advance(mid_len);
                self.body_bytes += idx as u64;
                self.stage = Stage::Delimiter;
                log::trace!("part body complete, {} bytes", self.body_bytes);
                Ok(Some((true, data)))
            }
            None => {
                if self.buffer.eof {
                    return Err(self.fail(crate::Error::IncompleteStream));
                }

                // the buffer tail may hold a separator prefix, hold it back
                let safe = self.buffer.ring.len().saturating_sub(mid_len - 1);
                if safe == 0 {
                    return Ok(None);
                }

                self.check_file_size(safe as u64)?;
                self.body_bytes += safe as u64;
                Ok(Some((false, self.buffer.ring.take(safe))))
            }
        }
    }

    /// Discards an abandoned part's payload up to and including the
    /// separator. `Ok(None)` means more data is needed.
    pub fn skip_body(&mut self) -> crate::Result<Option<()>> {
        let mid_len = self.boundary.mid_len();

        match self.buffer.ring.index_of(self.boundary.mid(), 0) {
            Some(idx) => {
                self.buffer.ring.advance(idx + mid_len);
                self.stage = Stage::Delimiter;
                log::trace!("abandoned part skipped");
                Ok(Some(()))
            }
            None => {
                if self.buffer.eof {
                    return Err(self.fail(crate::Error::IncompleteStream));
                }

                let safe = self.buffer.ring.len().saturating_sub(mid_len - 1);
                if safe > 0 {
                    self.buffer.ring.advance(safe);
                }
                Ok(None)
            }
        }
    }

    /// Decides between another part and the epilogue after a boundary.
    pub fn read_delimiter(&mut self) -> crate::Result<Option<()>> {
        let view = self.buffer.ring.peek();

        if view.len() < 2 {
            if self.buffer.eof {
                return Err(self.fail(crate::Error::IncompleteStream));
            }
            return Ok(None);
        }

        let suffix = [view[0], view[1]];

        if suffix == constants::CRLF {
            // the CRLF stays put, header scanning starts on it
            self.stage = Stage::PartHeaders;
            Ok(Some(()))
        } else if suffix == constants::BOUNDARY_EXT {
            self.buffer.ring.advance(2);
            self.stage = Stage::Epilogue;
            Ok(Some(()))
        } else {
            Err(self.fail(crate::Error::InvalidBoundarySuffix))
        }
    }

    /// Discards trailing bytes until the stream ends. `Ok(None)` means the
    /// stream is still producing.
    pub fn drain_epilogue(&mut self) -> crate::Result<Option<()>> {
        if !self.buffer.ring.is_empty() {
            let len = self.buffer.ring.len();
            self.buffer.ring.advance(len);
        }

        if self.buffer.eof {
            self.stage = Stage::Eof;
            log::trace!("epilogue drained, parse complete");
            Ok(Some(()))
        } else {
            Ok(None)
        }
    }

    fn check_file_size(&mut self, incoming: u64) -> crate::Result<()> {
        let limit = self.config.max_file_size;
        if self.body_bytes + incoming > limit {
            return Err(self.fail(crate::Error::FileSizeExceeded { limit }));
        }
        Ok(())
    }
}
