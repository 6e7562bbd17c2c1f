use crate::constants;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use memchr::{memchr, memmem};

/// Parses a part's header block into a header map.
///
/// Lines are CRLF-terminated and split at the first `:`. Lines without a
/// colon, and lines whose name or value doesn't decode, are dropped rather
/// than rejected; some clients emit garbage between real headers. Repeated
/// names accumulate, lookup is case-insensitive.
pub(crate) fn parse_header_block(block: &[u8]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut start = 0;

    let mut append_line = |line: &[u8]| {
        if line.is_empty() {
            return;
        }

        let colon = match memchr(b':', line) {
            Some(idx) => idx,
            None => return,
        };

        let name = match HeaderName::from_bytes(&line[..colon]) {
            Ok(name) => name,
            Err(_) => return,
        };

        let value = match HeaderValue::from_bytes(trim_ows(&line[colon + 1..])) {
            Ok(value) => value,
            Err(_) => return,
        };

        headers.append(name, value);
    };

    for idx in memmem::find_iter(block, &constants::CRLF) {
        append_line(&block[start..idx]);
        start = idx + constants::CRLF.len();
    }
    append_line(&block[start..]);

    headers
}

/// Strips optional whitespace (SP / HTAB) from both ends of a header value.
pub(crate) fn trim_ows(mut value: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn test_parse_header_block() {
        let block = b"Content-Disposition: form-data; name=\"file\"\r\nContent-Type: text/plain";
        let headers = parse_header_block(block);

        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "form-data; name=\"file\""
        );
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let headers = parse_header_block(b"CONTENT-TYPE: text/plain");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_lines_without_colon_are_dropped() {
        let block = b"Invalid-Header\r\nContent-Type: text/plain\r\ngarbage line";
        let headers = parse_header_block(block);

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_repeated_names_accumulate() {
        let block = b"X-Tag: one\r\nX-Tag: two";
        let headers = parse_header_block(block);

        let values: Vec<_> = headers.get_all("x-tag").iter().collect();
        assert_eq!(values, ["one", "two"]);
    }

    #[test]
    fn test_value_whitespace_is_trimmed() {
        let headers = parse_header_block(b"X-Pad: \t padded \t");
        assert_eq!(headers.get("x-pad").unwrap(), "padded");
    }

    #[test]
    fn test_empty_block() {
        assert!(parse_header_block(b"").is_empty());
    }
}
