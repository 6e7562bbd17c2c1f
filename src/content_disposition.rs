use crate::helpers::trim_ows;
use encoding_rs::{Encoding, UTF_8};
use http::header::{self, HeaderMap};

pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
    pub(crate) file_name_ext: Option<String>,
}

impl ContentDisposition {
    /// Reads `name`, `filename` and `filename*` out of the part's
    /// `Content-Disposition` header.
    ///
    /// The value is walked one `;`-separated parameter at a time; a `;`
    /// inside a double-quoted value does not split. Unquoted values are
    /// accepted for older clients. A parameter that fails to decode is
    /// absent, never an error.
    pub fn parse(headers: &HeaderMap) -> ContentDisposition {
        let mut disposition = ContentDisposition {
            field_name: None,
            file_name: None,
            file_name_ext: None,
        };

        let mut rest = match headers.get(header::CONTENT_DISPOSITION) {
            Some(value) => value.as_bytes(),
            None => return disposition,
        };

        while !rest.is_empty() {
            let param = next_param(&mut rest);

            // the leading segment is the disposition type and carries no `=`
            let (key, value) = match split_param(param) {
                Some(pair) => pair,
                None => continue,
            };

            if key.eq_ignore_ascii_case(b"name") && disposition.field_name.is_none() {
                disposition.field_name = String::from_utf8(value.to_vec()).ok();
            } else if key.eq_ignore_ascii_case(b"filename") && disposition.file_name.is_none() {
                disposition.file_name = String::from_utf8(value.to_vec()).ok();
            } else if key.eq_ignore_ascii_case(b"filename*") && disposition.file_name_ext.is_none()
            {
                disposition.file_name_ext = decode_ext_value(value);
            }
        }

        disposition
    }
}

/// Takes the next `;`-separated parameter off the front of `rest`.
fn next_param<'a>(rest: &mut &'a [u8]) -> &'a [u8] {
    let mut quoted = false;

    for (idx, &byte) in rest.iter().enumerate() {
        match byte {
            b'"' => quoted = !quoted,
            b';' if !quoted => {
                let param = &rest[..idx];
                *rest = &rest[idx + 1..];
                return param;
            }
            _ => {}
        }
    }

    let param = *rest;
    *rest = &[];
    param
}

/// Splits one parameter into key and value, dropping surrounding whitespace
/// and value quotes. `None` when the segment carries no `=`.
fn split_param(param: &[u8]) -> Option<(&[u8], &[u8])> {
    let eq = param.iter().position(|&byte| byte == b'=')?;

    let key = trim_ows(&param[..eq]);
    let value = match trim_ows(&param[eq + 1..]) {
        [b'"', inner @ .., b'"'] => inner,
        bare => bare,
    };

    Some((key, value))
}

/// Decodes an RFC 5987 ext-value: `charset'language'percent-encoded`.
///
/// The charset goes through `encoding_rs`; anything it doesn't know falls
/// back to UTF-8. Returns `None` when the tick structure is missing.
fn decode_ext_value(raw: &[u8]) -> Option<String> {
    let mut segments = raw.splitn(3, |&b| b == b'\'');
    let charset = segments.next()?;
    let _language = segments.next()?;
    let value = segments.next()?;

    let mut decoded = Vec::with_capacity(value.len());
    let mut rest = value;

    while let Some(&byte) = rest.first() {
        if byte == b'%' && rest.len() >= 3 {
            if let (Some(hi), Some(lo)) = (hex_digit(rest[1]), hex_digit(rest[2])) {
                decoded.push(hi << 4 | lo);
                rest = &rest[3..];
                continue;
            }
        }
        decoded.push(byte);
        rest = &rest[1..];
    }

    let encoding = Encoding::for_label(charset).unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(&decoded);
    Some(text.into_owned())
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
