//! Process-wide limits and pacing for the upload and visualizer flows.

use std::time::Duration;

/// Largest file the upload flow will encode.
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
pub const PROGRESS_INTERVAL_MS: u64 = 100;
pub const PROGRESS_STEP: u8 = 10;
pub const REDIRECT_DELAY_MS: u64 = 600;
pub const PROGRESS_COMPLETE: u8 = 100;

/// Payload handed to the completion callback when an upload fails.
pub const UPLOAD_ERROR_SENTINEL: &str = "error";
pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";

pub fn progress_interval() -> Duration {
    Duration::from_millis(PROGRESS_INTERVAL_MS)
}

pub fn redirect_delay() -> Duration {
    Duration::from_millis(REDIRECT_DELAY_MS)
}

/// Number of progress ticks needed to go from 0 to 100.
pub fn progress_ticks_to_complete() -> u32 {
    u32::from(PROGRESS_COMPLETE).div_ceil(u32::from(PROGRESS_STEP))
}

/// Applies one progress tick, clamping at 100.
pub fn next_progress(current: u8) -> u8 {
    current
        .saturating_add(PROGRESS_STEP)
        .min(PROGRESS_COMPLETE)
}
