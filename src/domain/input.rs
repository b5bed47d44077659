/// Horizontal input channels and per-tick selection.
///
/// Exactly one channel drives the player, chosen by configuration:
///   - `Touch`:  on-screen controller scalar (mouse in a terminal)
///   - `Action`: structured action value (gamepad stick); may fail
///   - `Legacy`: polled keyboard axis with smoothing
///
/// The channel is read once per tick. An `Action` failure falls back to
/// the legacy axis for that tick only.

use log::debug;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputChannel {
    Touch,
    Action,
    #[default]
    Legacy,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum InputError {
    #[error("no action input device available")]
    Unavailable,
    #[error("action input device disconnected")]
    Disconnected,
}

/// Everything the channels produced this frame. Only the selected
/// channel's value is used.
#[derive(Clone, Copy, Debug)]
pub struct AxisReadings {
    pub touch: f32,
    pub action: Result<f32, InputError>,
    pub legacy: f32,
}

impl Default for AxisReadings {
    fn default() -> Self {
        AxisReadings { touch: 0.0, action: Err(InputError::Unavailable), legacy: 0.0 }
    }
}

/// Pick the horizontal value for this tick.
pub fn resolve_horizontal(channel: InputChannel, readings: &AxisReadings) -> f32 {
    let raw = match channel {
        InputChannel::Touch => readings.touch,
        InputChannel::Action => match readings.action {
            Ok(v) => v,
            Err(e) => {
                debug!("input: {e}, using legacy axis this tick");
                readings.legacy
            }
        },
        InputChannel::Legacy => readings.legacy,
    };
    if raw.is_finite() { raw.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Smoothed digital axis: ramps toward the held direction at
/// `sensitivity` units per second, snaps through zero on reversal,
/// and falls back to rest at the same rate on release.
#[derive(Clone, Copy, Debug)]
pub struct LegacyAxis {
    value: f32,
    pub sensitivity: f32,
}

impl LegacyAxis {
    pub fn new(sensitivity: f32) -> Self {
        LegacyAxis { value: 0.0, sensitivity }
    }

    /// `target` is -1, 0 or 1 from the held keys.
    pub fn step(&mut self, target: f32, dt: f32) -> f32 {
        let delta = self.sensitivity * dt;
        if target != 0.0 && self.value != 0.0 && target.signum() != self.value.signum() {
            self.value = 0.0;
        }
        if self.value < target {
            self.value = (self.value + delta).min(target);
        } else if self.value > target {
            self.value = (self.value - delta).max(target);
        }
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_failure_falls_back_to_legacy() {
        let readings = AxisReadings {
            touch: 1.0,
            action: Err(InputError::Disconnected),
            legacy: -0.5,
        };
        assert_eq!(resolve_horizontal(InputChannel::Action, &readings), -0.5);
    }

    #[test]
    fn selected_channel_wins() {
        let readings = AxisReadings { touch: 1.0, action: Ok(0.25), legacy: -1.0 };
        assert_eq!(resolve_horizontal(InputChannel::Touch, &readings), 1.0);
        assert_eq!(resolve_horizontal(InputChannel::Action, &readings), 0.25);
        assert_eq!(resolve_horizontal(InputChannel::Legacy, &readings), -1.0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let readings = AxisReadings { touch: 4.0, action: Ok(f32::NAN), legacy: -3.0 };
        assert_eq!(resolve_horizontal(InputChannel::Touch, &readings), 1.0);
        assert_eq!(resolve_horizontal(InputChannel::Action, &readings), 0.0);
        assert_eq!(resolve_horizontal(InputChannel::Legacy, &readings), -1.0);
    }

    #[test]
    fn legacy_axis_ramps_and_settles() {
        let mut axis = LegacyAxis::new(5.0);
        assert!((axis.step(1.0, 0.1) - 0.5).abs() < 1e-5);
        assert!((axis.step(1.0, 0.1) - 1.0).abs() < 1e-5);
        assert!((axis.step(1.0, 0.1) - 1.0).abs() < 1e-5);
        assert!((axis.step(0.0, 0.1) - 0.5).abs() < 1e-5);
        assert!(axis.step(0.0, 0.1).abs() < 1e-5);
    }

    #[test]
    fn legacy_axis_snaps_on_reversal() {
        let mut axis = LegacyAxis::new(5.0);
        axis.step(1.0, 0.2);
        assert!((axis.step(-1.0, 0.1) + 0.5).abs() < 1e-5);
    }
}
