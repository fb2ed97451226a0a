//! Coarse bucket label for the requested window length
//!
//! Informational only: the bucket never gates or alters classification.

use serde::Serialize;
use std::fmt;

/// Half-open duration buckets: `[0,40)`, `[40,60)`, `[60,80)`, `[80,100)`, `[100,∞)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "&'static str")]
pub enum DurationBucket {
    UpTo40,
    UpTo60,
    UpTo80,
    UpTo100,
    ExceedsRange,
}

impl DurationBucket {
    /// Bucket for `duration_seconds`. Negative durations land in the first
    /// bucket; NaN lands in the last.
    pub fn from_seconds(duration_seconds: f64) -> Self {
        if duration_seconds < 40.0 {
            DurationBucket::UpTo40
        } else if duration_seconds < 60.0 {
            DurationBucket::UpTo60
        } else if duration_seconds < 80.0 {
            DurationBucket::UpTo80
        } else if duration_seconds < 100.0 {
            DurationBucket::UpTo100
        } else {
            DurationBucket::ExceedsRange
        }
    }

    /// Bucket for the window `[start, end)`
    pub fn from_window(start_seconds: f64, end_seconds: f64) -> Self {
        Self::from_seconds(end_seconds - start_seconds)
    }

    pub fn message(&self) -> &'static str {
        match self {
            DurationBucket::UpTo40 => "40secs",
            DurationBucket::UpTo60 => "60secs",
            DurationBucket::UpTo80 => "80secs",
            DurationBucket::UpTo100 => "100secs",
            DurationBucket::ExceedsRange => "exceeds allowed range",
        }
    }
}

impl From<DurationBucket> for &'static str {
    fn from(bucket: DurationBucket) -> Self {
        bucket.message()
    }
}

impl fmt::Display for DurationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(DurationBucket::from_seconds(39.9).message(), "40secs");
        assert_eq!(DurationBucket::from_seconds(40.0).message(), "60secs");
        assert_eq!(DurationBucket::from_seconds(59.999).message(), "60secs");
        assert_eq!(DurationBucket::from_seconds(60.0).message(), "80secs");
        assert_eq!(DurationBucket::from_seconds(80.0).message(), "100secs");
        assert_eq!(DurationBucket::from_seconds(99.999).message(), "100secs");
        assert_eq!(
            DurationBucket::from_seconds(100.0).message(),
            "exceeds allowed range"
        );
    }

    #[test]
    fn test_zero_and_negative_fall_in_first_bucket() {
        assert_eq!(DurationBucket::from_seconds(0.0), DurationBucket::UpTo40);
        assert_eq!(DurationBucket::from_seconds(-5.0), DurationBucket::UpTo40);
    }

    #[test]
    fn test_nan_exceeds_range() {
        assert_eq!(DurationBucket::from_seconds(f64::NAN), DurationBucket::ExceedsRange);
    }

    #[test]
    fn test_from_window_uses_difference() {
        assert_eq!(DurationBucket::from_window(30.0, 75.0), DurationBucket::UpTo60);
    }

    #[test]
    fn test_serializes_as_message() {
        let json = serde_json::to_string(&DurationBucket::UpTo80).unwrap();
        assert_eq!(json, "\"80secs\"");
    }
}
