/// Rows per page for client-side paginated lists.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound accepted for any page size.
pub const MAX_PAGE_SIZE: usize = 200;

/// Timeout for ordinary API requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for analytics requests.
pub const DEFAULT_ANALYTICS_TIMEOUT_SECS: u64 = 15;

/// Default window for the attendance moving average.
pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 3;

/// Events sharing a start hour are offset by this many columns per stack index.
pub const STACK_OFFSET: usize = 2;
