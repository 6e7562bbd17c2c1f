pub(crate) const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
pub(crate) const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;
pub(crate) const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub(crate) const BOUNDARY_EXT: [u8; 2] = *b"--";
pub(crate) const CRLF: [u8; 2] = *b"\r\n";
pub(crate) const CRLF_CRLF: [u8; 4] = *b"\r\n\r\n";
