use crate::boundary::Boundary;
use crate::buffer::Pull;
use crate::config::ParserConfig;
use crate::error::BoxError;
use crate::state::{ParserState, Stage};
use crate::Field;
use bytes::Bytes;
use futures_util::stream::{Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// Represents the implementation of `multipart/form-data` formatted data.
///
/// This will parse the source stream into [`Field`] instances via
/// [`next_field`](Multipart::next_field). Fields are emitted lazily and in
/// body order; requesting the next field discards whatever is left of the
/// previous one, because all fields share one buffer over the source stream.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use bytes::Bytes;
/// use futures_util::stream;
/// use formstream::Multipart;
///
/// # async fn run() -> formstream::Result<()> {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let stream = stream::iter([Result::<Bytes, Infallible>::Ok(Bytes::from(data))]);
/// let mut multipart = Multipart::new(stream, "X-BOUNDARY");
///
/// while let Some(field) = multipart.next_field().await? {
///     println!("Field: {:?}", field.text().await?)
/// }
/// # Ok(())
/// # }
/// ```
pub struct Multipart<S> {
    state: Arc<Mutex<ParserState<S>>>,
}

impl<S> Multipart<S> {
    /// Constructs a new `Multipart` from a chunk stream and the boundary
    /// extracted from the request's `Content-Type`, with default limits.
    pub fn new<B: Into<String>>(stream: S, boundary: B) -> Multipart<S> {
        Multipart::with_config(stream, boundary, ParserConfig::default())
    }

    /// Constructs a new `Multipart` with explicit limits.
    pub fn with_config<B: Into<String>>(
        stream: S,
        boundary: B,
        config: ParserConfig,
    ) -> Multipart<S> {
        let boundary = Boundary::new(&boundary.into());

        Multipart {
            state: Arc::new(Mutex::new(ParserState::new(stream, boundary, config))),
        }
    }

    /// Constructs a new `Multipart` straight from a request, resolving the
    /// boundary from its `Content-Type` header.
    ///
    /// Resolver failures ([`Error::InvalidContentType`](crate::Error::InvalidContentType),
    /// [`Error::MissingBoundary`](crate::Error::MissingBoundary)) are not
    /// returned here; they surface on the first
    /// [`next_field`](Multipart::next_field) call and every one after it.
    pub fn from_request(req: http::Request<S>) -> Multipart<S> {
        Multipart::from_request_with_config(req, ParserConfig::default())
    }

    /// [`from_request`](Multipart::from_request) with explicit limits.
    pub fn from_request_with_config(req: http::Request<S>, config: ParserConfig) -> Multipart<S> {
        let (parts, body) = req.into_parts();

        let boundary = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .ok_or(crate::Error::InvalidContentType)
            .and_then(crate::parse_boundary);

        match boundary {
            Ok(boundary) => Multipart::with_config(body, boundary, config),
            Err(err) => Multipart::failed(body, err, config),
        }
    }

    /// A parser that re-raises `err` on every read; the stream is parked
    /// untouched.
    fn failed(stream: S, err: crate::Error, config: ParserConfig) -> Multipart<S> {
        let mut state = ParserState::new(stream, Boundary::new(""), config);
        state.fail(err);

        Multipart {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Yields the next [`Field`] if available.
    ///
    /// Any unread data of the previous field is discarded first; its content
    /// view is dead afterwards.
    pub async fn next_field<E>(&mut self) -> crate::Result<Option<Field<S>>>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        self.try_next().await
    }
}

impl<S, E> Stream for Multipart<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    type Item = crate::Result<Field<S>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        let mut state = match this.state.lock() {
            Ok(guard) => guard,
            Err(err) => {
                return Poll::Ready(Some(Err(crate::Error::LockFailure(err.to_string()))));
            }
        };

        if let Some(err) = state.error.clone() {
            return Poll::Ready(Some(Err(err)));
        }

        // an unread previous part is abandoned once the next one is requested
        if state.stage == Stage::PartBody {
            state.stage = Stage::SkippingBody;
        }

        loop {
            // each pass either advances the state machine or pulls one chunk
            let progressed = match state.stage {
                Stage::Preamble => match state.read_preamble() {
                    Ok(step) => step.is_some(),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Stage::PartBody | Stage::SkippingBody => match state.skip_body() {
                    Ok(step) => step.is_some(),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Stage::Delimiter => match state.read_delimiter() {
                    Ok(step) => step.is_some(),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Stage::PartHeaders => match state.read_headers() {
                    Ok(Some(headers)) => {
                        let idx = state.parts_emitted;
                        state.parts_emitted += 1;

                        drop(state);

                        let field = Field::new(Arc::clone(&this.state), headers, idx);
                        return Poll::Ready(Some(Ok(field)));
                    }
                    Ok(None) => false,
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Stage::Epilogue => match state.drain_epilogue() {
                    Ok(step) => step.is_some(),
                    Err(err) => return Poll::Ready(Some(Err(err))),
                },
                Stage::Eof => return Poll::Ready(None),
                Stage::Failed => {
                    let err = state
                        .error
                        .clone()
                        .unwrap_or(crate::Error::IncompleteStream);
                    return Poll::Ready(Some(Err(err)));
                }
            };

            if !progressed {
                match state.buffer.poll_next_chunk(cx) {
                    Ok(Pull::Data) | Ok(Pull::Eof) => {}
                    Ok(Pull::Pending) => return Poll::Pending,
                    Err(err) => return Poll::Ready(Some(Err(state.fail(err)))),
                }
            }
        }
    }
}
