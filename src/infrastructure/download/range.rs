//! Single `Range: bytes=...` header support

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range; send the whole file
    Full,
    Partial(ByteRange),
    Unsatisfiable,
}

/// Interpret a Range header for a file of `size` bytes.
///
/// Malformed headers and multi-range requests fall back to [`RangeRequest::Full`].
pub fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };

    if spec.contains(',') {
        return RangeRequest::Full;
    }

    let Some((start, end)) = spec.trim().split_once('-') else {
        return RangeRequest::Full;
    };

    match (start.trim(), end.trim()) {
        ("", "") => RangeRequest::Full,
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => RangeRequest::Unsatisfiable,
            Ok(_) if size == 0 => RangeRequest::Unsatisfiable,
            Ok(n) => RangeRequest::Partial(ByteRange {
                start: size.saturating_sub(n),
                end: size - 1,
            }),
            Err(_) => RangeRequest::Full,
        },
        (start, "") => match start.parse::<u64>() {
            Ok(start) if start >= size => RangeRequest::Unsatisfiable,
            Ok(start) => RangeRequest::Partial(ByteRange {
                start,
                end: size - 1,
            }),
            Err(_) => RangeRequest::Full,
        },
        (start, end) => match (start.parse::<u64>(), end.parse::<u64>()) {
            (Ok(start), Ok(end)) if start > end => RangeRequest::Full,
            (Ok(start), Ok(_)) if start >= size => RangeRequest::Unsatisfiable,
            (Ok(start), Ok(end)) => RangeRequest::Partial(ByteRange {
                start,
                end: end.min(size - 1),
            }),
            _ => RangeRequest::Full,
        },
    }
}
