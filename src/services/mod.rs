pub mod decay;
pub mod gaps;
pub mod learning_path;
pub mod psychometric;
pub mod remediation;
pub mod review;
pub mod zpd;

/// Mastery at or above which a concept counts as known.
pub const MASTERY_THRESHOLD: f64 = 80.0;
pub const PARTIAL_THRESHOLD: f64 = 40.0;
pub const FORGOTTEN_THRESHOLD: f64 = 60.0;
pub const CRITICAL_RETENTION: f64 = 40.0;
