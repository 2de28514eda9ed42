//! Axis mapping from raw device channels to semantic navigation channels.
//!
//! SpaceMouse axes as reported by the device (right handed):
//!
//! ```text
//! 0: - left / + right          3: - pitch down / + pitch up
//! 1: - backwards / + forward   4: - roll right / + roll left
//! 2: - up / + down             5: - yaw right / + yaw left
//! ```
//!
//! After mapping the channels read `Tx, Ty, Tz, Rx, Ry, Rz`.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Number of analog channels of a 6DOF device
pub const AXIS_COUNT: usize = 6;

/// Permutation used when the two horizontal device axes are swapped
pub const SWAP_YZ_PERMUTATION: [usize; AXIS_COUNT] = [0, 2, 1, 3, 5, 4];

/// Identity permutation
pub const IDENTITY_PERMUTATION: [usize; AXIS_COUNT] = [0, 1, 2, 3, 4, 5];

/// Six analog values, one per channel, without dead-zone applied
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AxisSample(pub [f64; AXIS_COUNT]);

impl AxisSample {
    /// Neutral sample used whenever no device is present
    pub const ZERO: Self = Self([0.0; AXIS_COUNT]);

    pub fn new(values: [f64; AXIS_COUNT]) -> Self {
        Self(values)
    }

    pub fn get(&self, channel: usize) -> f64 {
        self.0.get(channel).copied().unwrap_or(0.0)
    }

    /// Translation channels `(Tx, Ty, Tz)`
    pub fn translation(&self) -> DVec3 {
        DVec3::new(self.0[0], self.0[1], self.0[2])
    }

    /// Rotation channels `(Rx, Ry, Rz)`
    pub fn rotation(&self) -> DVec3 {
        DVec3::new(self.0[3], self.0[4], self.0[5])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    fn magnitude(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Returns the channel with the largest absolute value.
    ///
    /// `max_angle_deg` is the largest angle the sample may deviate from the
    /// winning channel's axis (in the six dimensional channel space). 90° or
    /// more accepts any winner.
    pub fn dominant(&self, max_angle_deg: f64) -> Option<usize> {
        let (channel, value) = self
            .0
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.abs()))
            .fold((0, 0.0_f64), |best, cur| if cur.1 > best.1 { cur } else { best });

        if value <= 0.0 {
            return None;
        }

        if max_angle_deg < 90.0 {
            let cos = value / self.magnitude();
            if cos < max_angle_deg.to_radians().cos() {
                return None;
            }
        }

        Some(channel)
    }

    /// Keeps only the dominant channel, zeroing every other one
    pub fn dominant_only(&self, max_angle_deg: f64) -> Self {
        match self.dominant(max_angle_deg) {
            Some(channel) => {
                let mut values = [0.0; AXIS_COUNT];
                values[channel] = self.0[channel];
                Self(values)
            }
            None => Self::ZERO,
        }
    }
}

/// Hardware axis table for generic joysticks that are not factory calibrated
/// like a SpaceMouse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericPreMap {
    /// Raw hardware axis index feeding each of the six device channels
    pub axes: [usize; AXIS_COUNT],
    /// Per channel inversion
    pub invert: [bool; AXIS_COUNT],
}

impl Default for GenericPreMap {
    fn default() -> Self {
        Self {
            axes: IDENTITY_PERMUTATION,
            invert: [false; AXIS_COUNT],
        }
    }
}

/// Raw-to-semantic axis mapping, immutable once built
#[derive(Clone, Debug, PartialEq)]
pub struct AxisMapping {
    permutation: [usize; AXIS_COUNT],
    signs: [f64; AXIS_COUNT],
    pre_map: Option<GenericPreMap>,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self::from_options(false, true, None)
    }
}

impl AxisMapping {
    pub fn new(
        permutation: [usize; AXIS_COUNT],
        signs: [f64; AXIS_COUNT],
        pre_map: Option<GenericPreMap>,
    ) -> Self {
        Self {
            permutation,
            signs,
            pre_map,
        }
    }

    /// Builds the mapping from the user facing options.
    ///
    /// Fly mode inverts every channel. With the horizontal axes swapped the
    /// vertical channel keeps its sign in fly mode.
    pub fn from_options(fly_mode: bool, swap_yz: bool, pre_map: Option<GenericPreMap>) -> Self {
        let mut signs = if fly_mode {
            [-1.0; AXIS_COUNT]
        } else {
            [1.0; AXIS_COUNT]
        };

        let permutation = if swap_yz {
            if fly_mode {
                signs[1] = -signs[1];
            }
            SWAP_YZ_PERMUTATION
        } else {
            IDENTITY_PERMUTATION
        };

        Self::new(permutation, signs, pre_map)
    }

    /// Maps a raw sample into semantic channels. Non-finite raw values read as 0.
    pub fn map(&self, raw: &[f64]) -> AxisSample {
        let read = |index: usize| -> f64 {
            raw.get(index)
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
        };

        let stage: [f64; AXIS_COUNT] = match &self.pre_map {
            Some(pre) => std::array::from_fn(|i| {
                let value = read(pre.axes[i]);
                if pre.invert[i] {
                    -value
                } else {
                    value
                }
            }),
            None => std::array::from_fn(read),
        };

        AxisSample(std::array::from_fn(|i| {
            stage.get(self.permutation[i]).copied().unwrap_or(0.0) * self.signs[i]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping_swaps_horizontal_axes() {
        let mapping = AxisMapping::default();
        let mapped = mapping.map(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(mapped, AxisSample([0.1, 0.3, 0.2, 0.4, 0.6, 0.5]));
    }

    #[test]
    fn test_identity_mapping() {
        let mapping = AxisMapping::from_options(false, false, None);
        let raw = [0.1, -0.2, 0.3, -0.4, 0.5, -0.6];
        assert_eq!(mapping.map(&raw), AxisSample(raw));
    }

    #[test]
    fn test_fly_mode_inverts_all_but_vertical_when_swapped() {
        let mapping = AxisMapping::from_options(true, true, None);
        let mapped = mapping.map(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mapped, AxisSample([-1.0, 1.0, -1.0, -1.0, -1.0, -1.0]));

        let unswapped = AxisMapping::from_options(true, false, None);
        assert_eq!(
            unswapped.map(&[1.0; AXIS_COUNT]),
            AxisSample([-1.0; AXIS_COUNT])
        );
    }

    #[test]
    fn test_generic_pre_map_runs_before_permutation() {
        let pre = GenericPreMap {
            axes: [5, 4, 3, 2, 1, 0],
            invert: [true, false, false, false, false, false],
        };
        let mapping = AxisMapping::from_options(false, false, Some(pre));
        let mapped = mapping.map(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(mapped, AxisSample([-0.5, 0.4, 0.3, 0.2, 0.1, 0.0]));
    }

    #[test]
    fn test_missing_and_non_finite_channels_read_zero() {
        let mapping = AxisMapping::from_options(false, false, None);
        let mapped = mapping.map(&[f64::NAN, 0.5]);
        assert_eq!(mapped, AxisSample([0.0, 0.5, 0.0, 0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_dominant_axis() {
        let sample = AxisSample([0.1, -0.7, 0.2, 0.0, 0.3, 0.0]);
        assert_eq!(sample.dominant(90.0), Some(1));
        assert_eq!(AxisSample::ZERO.dominant(90.0), None);
    }

    #[test]
    fn test_dominant_axis_angle_tolerance() {
        // Two equal channels sit 45° away from either axis
        let diagonal = AxisSample([0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(diagonal.dominant(30.0), None);
        assert!(diagonal.dominant(50.0).is_some());

        let clear = AxisSample([0.9, 0.05, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(clear.dominant(10.0), Some(0));
        assert_eq!(
            clear.dominant_only(10.0),
            AxisSample([0.9, 0.0, 0.0, 0.0, 0.0, 0.0])
        );
    }
}
