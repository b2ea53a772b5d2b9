use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time interval [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TemporalWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TemporalWindow { start, end }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }
}

/// How a point's time window is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Window centered on the point timestamp.
    WindowedPerPoint { half_width_days: i64 },
    /// One campaign interval shared by every point; timestamps are ignored.
    FixedCampaign,
}

/// Resolves the window associated with a point timestamp.
#[derive(Debug, Clone, Copy)]
pub struct WindowResolver {
    aggregation: Aggregation,
    campaign: TemporalWindow,
}

impl WindowResolver {
    pub fn new(aggregation: Aggregation, campaign: TemporalWindow) -> Self {
        WindowResolver {
            aggregation,
            campaign,
        }
    }

    pub fn resolve(&self, timestamp: DateTime<Utc>) -> TemporalWindow {
        match self.aggregation {
            Aggregation::WindowedPerPoint { half_width_days } => {
                let half = Duration::days(half_width_days);
                TemporalWindow::new(timestamp - half, timestamp + half)
            }
            Aggregation::FixedCampaign => self.campaign,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn campaign() -> TemporalWindow {
        TemporalWindow::new(
            Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 10, 31, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_per_point_window_is_centered_half_open() {
        let resolver = WindowResolver::new(
            Aggregation::WindowedPerPoint { half_width_days: 15 },
            campaign(),
        );
        let t = Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap();
        let window = resolver.resolve(t);
        assert_eq!(window.start, Utc.with_ymd_and_hms(2022, 6, 25, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2022, 7, 25, 0, 0, 0).unwrap());
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_campaign_mode_ignores_timestamp() {
        let resolver = WindowResolver::new(Aggregation::FixedCampaign, campaign());
        let a = resolver.resolve(Utc.with_ymd_and_hms(2022, 7, 10, 0, 0, 0).unwrap());
        let b = resolver.resolve(Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(a, campaign());
        assert_eq!(a, b);
    }
}
