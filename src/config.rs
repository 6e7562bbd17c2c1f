use crate::constants;

/// Tuning knobs for the parser, applied per [`Multipart`](crate::Multipart) instance.
///
/// The limits guard against hostile or broken clients running the server out
/// of memory. Defaults: 16 KiB starting buffer, 8 KiB per header block,
/// 10 MiB per part body.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub(crate) initial_buffer_size: usize,
    pub(crate) max_header_size: usize,
    pub(crate) max_file_size: u64,
}

impl ParserConfig {
    /// Creates a configuration with the default limits.
    pub fn new() -> ParserConfig {
        ParserConfig::default()
    }

    /// Sets the starting capacity of the internal buffer.
    ///
    /// The buffer grows on demand, so this only tunes how soon reallocation
    /// kicks in. Any value down to 1 byte parses correctly.
    pub fn initial_buffer_size(mut self, size: usize) -> ParserConfig {
        self.initial_buffer_size = size;
        self
    }

    /// Sets the maximum size of a single part's header block.
    pub fn max_header_size(mut self, limit: usize) -> ParserConfig {
        self.max_header_size = limit;
        self
    }

    /// Sets the maximum size of a single part's body.
    pub fn max_file_size(mut self, limit: u64) -> ParserConfig {
        self.max_file_size = limit;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            initial_buffer_size: constants::DEFAULT_BUFFER_SIZE,
            max_header_size: constants::DEFAULT_MAX_HEADER_SIZE,
            max_file_size: constants::DEFAULT_MAX_FILE_SIZE,
        }
    }
}
