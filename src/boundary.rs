use crate::constants;
use memchr::memmem::Finder;

/// The boundary declared in `Content-Type`, with the two derived separator
/// forms and their precomputed finders.
///
/// `--boundary` opens the body, `\r\n--boundary` separates parts. The skip
/// tables depend only on the boundary, so they are built once per parse.
pub(crate) struct Boundary {
    start_finder: Finder<'static>,
    mid_finder: Finder<'static>,
}

impl Boundary {
    pub fn new(boundary: &str) -> Boundary {
        let mut start = Vec::with_capacity(constants::BOUNDARY_EXT.len() + boundary.len());
        start.extend_from_slice(&constants::BOUNDARY_EXT);
        start.extend_from_slice(boundary.as_bytes());

        let mut mid = Vec::with_capacity(constants::CRLF.len() + start.len());
        mid.extend_from_slice(&constants::CRLF);
        mid.extend_from_slice(&start);

        Boundary {
            start_finder: Finder::new(&start).into_owned(),
            mid_finder: Finder::new(&mid).into_owned(),
        }
    }

    /// Finder for `--boundary`, the opening form.
    pub fn start(&self) -> &Finder<'static> {
        &self.start_finder
    }

    /// Finder for `\r\n--boundary`, the part separator.
    pub fn mid(&self) -> &Finder<'static> {
        &self.mid_finder
    }

    pub fn start_len(&self) -> usize {
        self.start_finder.needle().len()
    }

    pub fn mid_len(&self) -> usize {
        self.mid_finder.needle().len()
    }
}
