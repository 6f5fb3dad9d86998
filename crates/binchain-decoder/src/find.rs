//! Forward pattern search shared by both parser modes.
//!
//! `find` consumes bytes until the next `pattern.len()` bytes equal the
//! pattern. Every start offset is tried in turn, so a mismatch at one
//! offset moves on to the next instead of giving up. The scan is
//! resumable: stream mode remembers where it stopped and only examines new
//! start offsets once more data arrives.

/// Outcome of one scan over the bytes currently available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan {
    /// The pattern starts at this offset.
    Found(usize),
    /// No match yet. Offsets before `resume_at` are ruled out; scan again
    /// from there once more bytes are available.
    NeedMore { resume_at: usize },
    /// The match would have to start beyond the scan limit.
    GaveUp { scanned: usize },
}

/// Search `haystack` for `pattern`, trying start offsets from `from`.
///
/// `limit` caps the start offset of an acceptable match, i.e. the number
/// of bytes that may be skipped. An empty pattern matches at `from`.
#[must_use]
pub fn scan(haystack: &[u8], pattern: &[u8], from: usize, limit: Option<usize>) -> Scan {
    let plen = pattern.len();
    let mut start = from;

    while start + plen <= haystack.len() {
        if limit.is_some_and(|limit| start > limit) {
            return Scan::GaveUp { scanned: start };
        }
        if &haystack[start..start + plen] == pattern {
            return Scan::Found(start);
        }
        start += 1;
    }

    let resume_at = from.max((haystack.len() + 1).saturating_sub(plen));
    if limit.is_some_and(|limit| resume_at > limit) {
        return Scan::GaveUp { scanned: resume_at };
    }
    Scan::NeedMore { resume_at }
}
