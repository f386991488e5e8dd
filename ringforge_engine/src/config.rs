/// Engine configuration

use crate::error::{Error, Result};

/// Upper bound for frames in flight supported by the frame rings
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;

/// Engine configuration
///
/// Shared by every component of a `GpuContext`: all frame rings, the
/// resource binder and the render graph key their per-frame state off
/// the same `frames_in_flight`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of frames the CPU may submit before waiting on the oldest (F)
    pub frames_in_flight: usize,
    /// Poll invalid render passes every N frames (1 = every frame)
    pub validity_check_interval: u32,
    /// Application name (used in log lines)
    pub app_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            validity_check_interval: 1,
            app_name: "Ringforge Application".to_string(),
        }
    }
}

impl Config {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if `frames_in_flight` is outside
    /// `1..=MAX_FRAMES_IN_FLIGHT` or `validity_check_interval` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(Error::InitializationFailed(format!(
                "frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT, self.frames_in_flight
            )));
        }
        if self.validity_check_interval == 0 {
            return Err(Error::InitializationFailed(
                "validity_check_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder-style setter for frames in flight
    pub fn with_frames_in_flight(mut self, frames_in_flight: usize) -> Self {
        self.frames_in_flight = frames_in_flight;
        self
    }

    /// Builder-style setter for the validity poll interval
    pub fn with_validity_check_interval(mut self, interval: u32) -> Self {
        self.validity_check_interval = interval;
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
