//! Day-night cycle.
//!
//! Time is normalized to `[0, 1)` over one day: 0 midnight, 0.25 dawn,
//! 0.5 noon, 0.75 dusk. Everything else derives from it.

use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::sky;

/// Sky color configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyColors {
    pub night: Vec3,
    pub day: Vec3,
    pub sunset: Vec3,
}

impl Default for SkyColors {
    fn default() -> Self {
        Self {
            night: sky::NIGHT_COLOR,
            day: sky::DAY_COLOR,
            sunset: sky::SUNSET_COLOR,
        }
    }
}

pub struct DayNight {
    /// Normalized time of day in `[0, 1)`
    time: f32,
    day_length: f32,
    colors: SkyColors,
}

impl DayNight {
    pub fn new() -> Self {
        Self {
            time: sky::START_TIME,
            day_length: sky::DAY_LENGTH_SECONDS,
            colors: SkyColors::default(),
        }
    }

    pub fn with_day_length(day_length: f32) -> Self {
        Self {
            day_length,
            ..Self::new()
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time.rem_euclid(1.0);
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt / self.day_length;
        if self.time >= 1.0 {
            self.time -= 1.0;
        }
    }

    /// 0 at night, peaking at 1 at noon
    pub fn sun_intensity(&self) -> f32 {
        (self.time * TAU - TAU * 0.25).sin().max(0.0)
    }

    /// Sun direction for lighting, world space
    pub fn sun_dir(&self) -> Vec3 {
        let angle = self.time * TAU;
        Vec3::new(angle.cos(), angle.sin(), 0.3).normalize()
    }

    /// Sky clear color: night/day lerp with a sunrise/sunset tint at the
    /// transitions
    pub fn sky_color(&self) -> Vec3 {
        let t = self.sun_intensity();
        let edgeness = 1.0 - (t - 0.5).abs() * 2.0;
        let base = self.colors.night + (self.colors.day - self.colors.night) * t;
        base + self.colors.sunset * (edgeness * edgeness * 0.3 * t)
    }
}

impl Default for DayNight {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_wraps_at_one() {
        let mut cycle = DayNight::with_day_length(10.0);
        cycle.set_time(0.95);
        cycle.update(1.0); // +0.1 day
        assert!(cycle.time() < 0.1);
        assert!(cycle.time() >= 0.0);
    }

    #[test]
    fn sun_peaks_at_noon_and_sleeps_at_midnight() {
        let mut cycle = DayNight::new();
        cycle.set_time(0.5);
        assert!((cycle.sun_intensity() - 1.0).abs() < 1e-5);
        cycle.set_time(0.0);
        assert_eq!(cycle.sun_intensity(), 0.0);
        cycle.set_time(0.875);
        assert_eq!(cycle.sun_intensity(), 0.0, "clamped below the horizon");
    }

    #[test]
    fn sky_lerps_between_night_and_day() {
        let mut cycle = DayNight::new();
        cycle.set_time(0.0);
        let night = cycle.sky_color();
        assert!((night - sky::NIGHT_COLOR).length() < 1e-5);
        cycle.set_time(0.5);
        let noon = cycle.sky_color();
        assert!(noon.z > night.z, "noon sky is brighter");
    }

    #[test]
    fn sun_dir_is_normalized() {
        let mut cycle = DayNight::new();
        for i in 0..16 {
            cycle.set_time(i as f32 / 16.0);
            assert!((cycle.sun_dir().length() - 1.0).abs() < 1e-5);
        }
    }
}
