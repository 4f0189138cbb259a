// Session constants (No magic values)
use std::time::Duration;

/// Default polling interval for the refresh loop (5s)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Lower bound for the polling interval (250ms)
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of re-applies after a conditional write loses a race
pub const DEFAULT_CAS_RETRIES: u32 = 3;
