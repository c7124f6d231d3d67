//! Rate specifications.
//!
//! A [`Rate`] defines how many requests are allowed over what time window.
//! Rates are usually written as strings such as `"10/minute"` and parsed at
//! route-registration time, so a malformed spec fails startup rather than a
//! live request.
//!
//! # Examples
//!
//! ```ignore
//! use reqgate::Rate;
//! use std::time::Duration;
//!
//! // 100 requests per minute
//! let rate = Rate::per_minute(100);
//!
//! // Parsed from configuration; abbreviations are accepted
//! let rate: Rate = "10/minute".parse()?;
//! let rate: Rate = "5/s".parse()?;
//!
//! // Custom: 50 requests per 30 seconds
//! let rate = Rate::new(50, Duration::from_secs(30));
//! ```

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A request quota: `count` requests per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    /// Maximum number of requests in the window.
    count: u64,

    /// Time window duration.
    window: Duration,
}

impl Rate {
    /// Create a new rate with the given count and window.
    ///
    /// # Panics
    ///
    /// Panics if `count` is 0 or `window` is zero duration.
    pub fn new(count: u64, window: Duration) -> Self {
        assert!(count > 0, "count must be greater than 0");
        assert!(!window.is_zero(), "window must be non-zero");

        Self { count, window }
    }

    /// Create a rate allowing `n` requests per second.
    pub fn per_second(n: u64) -> Self {
        Self::new(n, Duration::from_secs(1))
    }

    /// Create a rate allowing `n` requests per minute.
    pub fn per_minute(n: u64) -> Self {
        Self::new(n, Duration::from_secs(60))
    }

    /// Create a rate allowing `n` requests per hour.
    pub fn per_hour(n: u64) -> Self {
        Self::new(n, Duration::from_secs(3600))
    }

    /// Create a rate allowing `n` requests per day.
    pub fn per_day(n: u64) -> Self {
        Self::new(n, Duration::from_secs(86400))
    }

    /// Try to create a new rate, returning an error if invalid.
    pub fn try_new(count: u64, window: Duration) -> Result<Self, ConfigError> {
        if count == 0 {
            return Err(ConfigError::InvalidLimit("count must be greater than 0".into()));
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidLimit("window must be non-zero".into()));
        }
        Ok(Self { count, window })
    }

    /// Get the maximum requests allowed per window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Get the window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Refill rate for token-based buckets (tokens per second).
    pub fn refill_rate(&self) -> f64 {
        self.count as f64 / self.window.as_secs_f64()
    }
}

impl Default for Rate {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

/// Window seconds for a period token, or `None` for unknown periods.
fn period_seconds(period: &str) -> Option<u64> {
    match period {
        "s" | "sec" | "second" => Some(1),
        "m" | "min" | "minute" => Some(60),
        "h" | "hr" | "hour" => Some(3600),
        "d" | "day" => Some(86400),
        _ => None,
    }
}

impl FromStr for Rate {
    type Err = ConfigError;

    /// Parse a `"count/period"` spec such as `"10/minute"` or `"5/s"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(2, '/');
        let (Some(count_part), Some(period_part)) = (parts.next(), parts.next()) else {
            return Err(ConfigError::InvalidRate(s.to_string()));
        };

        let count: u64 = count_part
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidRate(s.to_string()))?;
        if count == 0 {
            return Err(ConfigError::InvalidRate(s.to_string()));
        }

        let period = period_part.trim().to_ascii_lowercase();
        let secs = period_seconds(&period)
            .ok_or_else(|| ConfigError::UnknownPeriod(period.clone()))?;

        Ok(Self {
            count,
            window: Duration::from_secs(secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_constructors() {
        let rate = Rate::per_second(10);
        assert_eq!(rate.count(), 10);
        assert_eq!(rate.window(), Duration::from_secs(1));
        assert!((rate.refill_rate() - 10.0).abs() < 0.001);

        let rate = Rate::per_minute(60);
        assert_eq!(rate.window(), Duration::from_secs(60));
        assert!((rate.refill_rate() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_standard_periods() {
        let rate: Rate = "10/minute".parse().unwrap();
        assert_eq!(rate.count(), 10);
        assert_eq!(rate.window(), Duration::from_secs(60));

        let rate: Rate = "3/hour".parse().unwrap();
        assert_eq!(rate.count(), 3);
        assert_eq!(rate.window(), Duration::from_secs(3600));

        let rate: Rate = "100/second".parse().unwrap();
        assert_eq!(rate.window(), Duration::from_secs(1));

        let rate: Rate = "2/day".parse().unwrap();
        assert_eq!(rate.window(), Duration::from_secs(86400));
    }

    #[test]
    fn test_parse_abbreviations() {
        assert_eq!(
            "5/s".parse::<Rate>().unwrap().window(),
            Duration::from_secs(1)
        );
        assert_eq!(
            "10/min".parse::<Rate>().unwrap().window(),
            Duration::from_secs(60)
        );
        assert_eq!(
            "100/hr".parse::<Rate>().unwrap().window(),
            Duration::from_secs(3600)
        );
        assert_eq!(
            "2/d".parse::<Rate>().unwrap().window(),
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_case() {
        let rate: Rate = " 10 / Minute ".parse().unwrap();
        assert_eq!(rate.count(), 10);
        assert_eq!(rate.window(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "bogus".parse::<Rate>(),
            Err(ConfigError::InvalidRate(_))
        ));
        assert!(matches!(
            "ten/minute".parse::<Rate>(),
            Err(ConfigError::InvalidRate(_))
        ));
        assert!(matches!(
            "0/minute".parse::<Rate>(),
            Err(ConfigError::InvalidRate(_))
        ));
        assert!(matches!(
            "10/fortnight".parse::<Rate>(),
            Err(ConfigError::UnknownPeriod(_))
        ));
    }

    #[test]
    fn test_try_new_validation() {
        assert!(Rate::try_new(0, Duration::from_secs(60)).is_err());
        assert!(Rate::try_new(10, Duration::ZERO).is_err());
        assert!(Rate::try_new(10, Duration::from_secs(60)).is_ok());
    }

    #[test]
    #[should_panic]
    fn test_zero_count_panics() {
        Rate::new(0, Duration::from_secs(60));
    }
}
