//! Exit codes of the `offsync` binary.
//! Codes 1, 3 and 4 line up with `SyncError::exit_code`.

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1; // Bad flags, config or deployment file
pub const INTERNAL_ERROR: i32 = 2; // Anything not classified below
pub const NETWORK_ERROR: i32 = 3; // Origin unreachable, or answered a non-2xx where success was required
pub const STATE_ERROR: i32 = 4; // Storage failure or activation wiped the caches
pub const INCOMPLETE: i32 = 5; // Fill left resources missing
