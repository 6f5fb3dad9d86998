/// Configuration shared by [`BufferParser`](crate::BufferParser) and
/// [`StreamParser`](crate::StreamParser).
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                          │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ event           │ data-event name the stream parser listens for    │
/// │ find_scan_limit │ bytes `find` may skip before giving up           │
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    /// Name of the data event carrying chunks. Events with any other name
    /// are ignored. Buffer mode does not use it.
    pub event: String,

    /// Maximum number of bytes `find` may skip before the start of a
    /// match. `None` scans without bound.
    pub find_scan_limit: Option<usize>,
}

/// Default event name for data chunks.
pub const DEFAULT_EVENT: &str = "data";

/// Default `find` scan limit: 1 MiB.
pub const DEFAULT_FIND_SCAN_LIMIT: usize = 1024 * 1024;

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            event: DEFAULT_EVENT.to_string(),
            find_scan_limit: Some(DEFAULT_FIND_SCAN_LIMIT),
        }
    }
}

impl ParserConfig {
    /// Default configuration listening on `event`.
    #[must_use]
    pub fn with_event(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn find_scan_limit(mut self, limit: Option<usize>) -> Self {
        self.find_scan_limit = limit;
        self
    }
}
