//! Overlay configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::DetectionRegion;

/// Shortest accepted continuous detection period
pub const MIN_PERIOD_MS: u64 = 30;
/// Longest accepted continuous detection period
pub const MAX_PERIOD_MS: u64 = 200;

/// Overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Continuous detection period (milliseconds, clamped to 30-200)
    pub period_ms: u64,

    /// Smallest width/height the detection region may shrink to
    pub min_region_size: f32,

    /// Side length of the region's corner handles
    pub handle_size: f32,

    /// Region placed when the region filter is first enabled
    pub default_region: DetectionRegion,

    /// Send the source-space region to the backend as a crop hint
    pub forward_region: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            min_region_size: 50.0,
            handle_size: 12.0,
            default_region: DetectionRegion::new(50.0, 50.0, 400.0, 300.0),
            forward_region: false,
        }
    }
}

impl OverlayConfig {
    /// Clamp a requested period to the accepted range
    pub fn clamp_period(period: Duration) -> Duration {
        let ms = (period.as_millis() as u64).clamp(MIN_PERIOD_MS, MAX_PERIOD_MS);
        Duration::from_millis(ms)
    }

    /// Configured period, clamped
    pub fn period(&self) -> Duration {
        Self::clamp_period(Duration::from_millis(self.period_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_clamped() {
        let fast = OverlayConfig {
            period_ms: 5,
            ..Default::default()
        };
        assert_eq!(fast.period(), Duration::from_millis(30));

        let slow = OverlayConfig {
            period_ms: 1000,
            ..Default::default()
        };
        assert_eq!(slow.period(), Duration::from_millis(200));
        assert_eq!(OverlayConfig::default().period(), Duration::from_millis(100));
    }
}
