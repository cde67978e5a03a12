// src/constants.rs
//
// Central location for the tool's tunables and fixed names.

/// Worker-pool size used when the operator does not pass --threads.
pub const DEFAULT_THREADS: usize = 8;

/// Default lower bound for synthetic file sizes (human-readable form).
pub const DEFAULT_MIN_SIZE: &str = "1K";

/// Default upper bound for synthetic file sizes (human-readable form).
pub const DEFAULT_MAX_SIZE: &str = "1M";

/// When --entropy-size is not given, the backing buffer is this many times
/// the maximum file size.
pub const DEFAULT_ENTROPY_FACTOR: u64 = 100;

/// Length of a generated entropy seed.
pub const ENTROPY_SEED_LENGTH: usize = 12;

/// Alphabet an entropy seed is drawn from (lowercase hex).
pub const ENTROPY_SEED_CHARACTERS: &[u8] = b"0123456789abcdef";

/// Name of the transient entropy buffer file under the OS temp directory.
pub const ENTROPY_FILE_NAME: &str = "sxload-entropy";

/// Prefix for filenames of newly uploaded objects; the rest is a UUID.
pub const UPLOAD_FILENAME_PREFIX: &str = "sxload-";

/// A replay session gets this many times the recorded thread count, so a
/// busy scheduler does not turn timing-sensitive dispatch into the
/// bottleneck. Unconditional for now; could become a replay CLI option.
pub const REPLAY_THREAD_MULTIPLIER: usize = 2;

/// strftime pattern for the timestamp embedded in session file names.
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";
