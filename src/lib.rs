//! An async streaming parser for `multipart/form-data` request bodies.
//!
//! It accepts a [`Stream`](https://docs.rs/futures-util/0.3/futures_util/stream/trait.Stream.html)
//! of [`Bytes`](https://docs.rs/bytes/1/bytes/struct.Bytes.html) as a source,
//! so that it can be plugged into any async Rust environment e.g. any async
//! server. Each part is handed out as soon as its bytes have arrived; a large
//! upload can be consumed chunk by chunk with flat memory.
//!
//! # Examples
//!
//! ```
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use futures_util::stream;
//! // Import the parser types.
//! use formstream::Multipart;
//!
//! # async fn run() -> formstream::Result<()> {
//! // Generate a byte stream and the boundary from somewhere e.g. server request body.
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
//! let stream = stream::iter([Result::<Bytes, Infallible>::Ok(Bytes::from(data))]);
//!
//! // Create a `Multipart` instance from that byte stream and the boundary.
//! let mut multipart = Multipart::new(stream, "X-BOUNDARY");
//!
//! // Iterate over the fields, use `next_field()` to get the next field.
//! while let Some(mut field) = multipart.next_field().await? {
//!     // Get the field name.
//!     let name = field.name();
//!     // Get the field's filename if provided in "Content-Disposition" header.
//!     let file_name = field.file_name();
//!
//!     println!("Name: {:?}, FileName: {:?}", name, file_name);
//!
//!     // Process the field data chunks e.g. store them in a file.
//!     while let Some(field_chunk) = field.chunk().await? {
//!         // Do something with field chunk.
//!         println!("Chunk: {:?}", field_chunk);
//!     }
//! }
//!
//! # Ok(())
//! # }
//! ```
//!
//! The boundary is declared in the request's `Content-Type` header; either
//! extract it with [`parse_boundary`] and use [`Multipart::new`], or hand the
//! whole request to [`Multipart::from_request`].

pub use bytes;

pub use config::ParserConfig;
pub use error::Error;
pub use field::Field;
pub use multipart::Multipart;

mod boundary;
mod buffer;
mod config;
mod constants;
mod content_disposition;
mod error;
mod field;
mod helpers;
mod multipart;
mod state;

/// A Result type often returned from methods that can have `formstream` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// # Examples
///
/// ```
/// # fn run(){
/// let content_type = "multipart/form-data; boundary=ABCDEFG";
///
/// assert_eq!(formstream::parse_boundary(content_type), Ok("ABCDEFG".to_owned()));
/// # }
/// # run();
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(|_| Error::InvalidContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::InvalidContentType);
    }

    m.get_param(mime::BOUNDARY)
        .map(|boundary| boundary.as_str().to_owned())
        .filter(|boundary| !boundary.is_empty())
        .ok_or(Error::MissingBoundary)
}
