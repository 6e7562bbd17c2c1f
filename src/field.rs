use crate::buffer::Pull;
use crate::content_disposition::ContentDisposition;
use crate::error::BoxError;
use crate::state::{ParserState, Stage};
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use futures_util::stream::{Stream, TryStreamExt};
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// A single part of a `multipart/form-data` body: its headers plus a lazy
/// view over its payload.
///
/// The payload is read either chunk by chunk through the [`Stream`] impl /
/// [`chunk`](Field::chunk), or in one piece through [`bytes`](Field::bytes) /
/// [`text`](Field::text). All parts share the parser's buffer, so the view is
/// single-pass: once the next field is requested from the
/// [`Multipart`](crate::Multipart), an unread field is skipped and its reads
/// fail with [`Error::FieldAbandoned`](crate::Error::FieldAbandoned).
pub struct Field<S> {
    state: Arc<Mutex<ParserState<S>>>,
    headers: http::HeaderMap,
    done: bool,
    meta: FieldMeta,
}

struct FieldMeta {
    name: Option<String>,
    file_name: Option<String>,
    file_name_ext: Option<String>,
    content_type: Option<mime::Mime>,
    idx: usize,
}

impl<S> std::fmt::Debug for Field<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("headers", &self.headers)
            .field("done", &self.done)
            .field("name", &self.meta.name)
            .field("file_name", &self.meta.file_name)
            .field("content_type", &self.meta.content_type)
            .field("idx", &self.meta.idx)
            .finish()
    }
}

impl<S> Field<S> {
    pub(crate) fn new(
        state: Arc<Mutex<ParserState<S>>>,
        headers: http::HeaderMap,
        idx: usize,
    ) -> Self {
        let content_disposition = ContentDisposition::parse(&headers);
        let content_type = Self::parse_content_type(&headers);

        Field {
            state,
            headers,
            done: false,
            meta: FieldMeta {
                name: content_disposition.field_name,
                file_name: content_disposition.file_name,
                file_name_ext: content_disposition.file_name_ext,
                content_type,
                idx,
            },
        }
    }

    fn parse_content_type(headers: &http::HeaderMap) -> Option<mime::Mime> {
        headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok())
    }

    /// The `name` parameter of the part's `Content-Disposition` header.
    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    /// The `filename` parameter of the part's `Content-Disposition` header.
    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name.as_deref()
    }

    /// The `filename*` parameter, percent-decoded per RFC 5987.
    pub fn file_name_ext(&self) -> Option<&str> {
        self.meta.file_name_ext.as_deref()
    }

    /// The media type of the part's own `Content-Type` header, if any.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.meta.content_type.as_ref()
    }

    /// All headers of this part. Lookup is case-insensitive and repeated
    /// names keep every value.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Zero-based position of this part within the body.
    pub fn index(&self) -> usize {
        self.meta.idx
    }

    /// Reads the whole payload into one buffer.
    pub async fn bytes<E>(mut self) -> crate::Result<Bytes>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        let mut buf = BytesMut::new();

        while let Some(bytes) = self.chunk().await? {
            buf.extend_from_slice(&bytes);
        }

        Ok(buf.freeze())
    }

    /// Yields the next run of payload bytes, `None` once the part ends.
    pub async fn chunk<E>(&mut self) -> crate::Result<Option<Bytes>>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        self.try_next().await
    }

    /// Reads the whole payload and decodes it as UTF-8.
    pub async fn text<E>(self) -> crate::Result<String>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        self.text_with_charset("utf-8").await
    }

    /// Reads the whole payload and decodes it with the charset from the
    /// part's `Content-Type`, falling back to `default_encoding`.
    pub async fn text_with_charset<E>(self, default_encoding: &str) -> crate::Result<String>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        let encoding_name = self
            .content_type()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .map(|charset| charset.as_str().to_owned())
            .unwrap_or_else(|| default_encoding.to_owned());

        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);

        let bytes = self.bytes().await?;

        match encoding.decode(&bytes).0 {
            Cow::Owned(text) => Ok(text),
            Cow::Borrowed(text) => Ok(String::from(text)),
        }
    }

    /// Reads the whole payload and deserializes it as JSON.
    #[cfg(feature = "json")]
    pub async fn json<T, E>(self) -> crate::Result<T>
    where
        T: DeserializeOwned,
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Into<BoxError>,
    {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| crate::Error::DecodeJson(Arc::new(err.into())))
    }
}

impl<S, E> Stream for Field<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<BoxError>,
{
    type Item = crate::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        let mut state = match this.state.lock() {
            Ok(guard) => guard,
            Err(err) => {
                return Poll::Ready(Some(Err(crate::Error::LockFailure(err.to_string()))));
            }
        };

        if let Some(err) = state.error.clone() {
            return Poll::Ready(Some(Err(err)));
        }

        // the emitter moved on, this view is dead
        if this.meta.idx + 1 != state.parts_emitted || state.stage != Stage::PartBody {
            return Poll::Ready(Some(Err(crate::Error::FieldAbandoned)));
        }

        loop {
            match state.read_body() {
                Ok(Some((true, data))) => {
                    drop(state);
                    this.done = true;

                    return if data.is_empty() {
                        Poll::Ready(None)
                    } else {
                        Poll::Ready(Some(Ok(data)))
                    };
                }
                Ok(Some((false, data))) => return Poll::Ready(Some(Ok(data))),
                Ok(None) => match state.buffer.poll_next_chunk(cx) {
                    Ok(Pull::Data) | Ok(Pull::Eof) => continue,
                    Ok(Pull::Pending) => return Poll::Pending,
                    Err(err) => return Poll::Ready(Some(Err(state.fail(err)))),
                },
                Err(err) => return Poll::Ready(Some(Err(err))),
            }
        }
    }
}

impl<S> Drop for Field<S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }

        match self.state.lock() {
            Ok(mut state) => {
                if state.stage == Stage::PartBody && self.meta.idx + 1 == state.parts_emitted {
                    state.stage = Stage::SkippingBody;
                }
            }
            Err(err) => {
                log::error!("couldn't lock the multipart state to discard a field: {}", err);
            }
        }
    }
}
