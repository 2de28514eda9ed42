//! Discrete, snapped transforms of the selection.
//!
//! Each tick the single dominant channel is picked with on/off hysteresis.
//! A newly dominant channel fires at once and then waits `first_repeat_ms`,
//! a held channel repeats every `next_repeat_ms`. Translations snap to the
//! grid along the world axis that best matches the pushed direction, rotations
//! turn the whole selection about its shared centroid.

use std::f64::consts::PI;

use glam::{DMat4, DQuat, DVec3};
use tracing::debug;

use super::axis::AxisSample;
use crate::host::{EditScope, Transformable};

/// Grid size used when the host reports no snap
pub const DEFAULT_SNAP: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct NudgeSettings {
    /// Magnitude a channel needs to become dominant
    pub threshold_on: f64,
    /// Magnitude a dominant channel needs to stay dominant
    pub threshold_off: f64,
    pub first_repeat_ms: f64,
    /// `0` disables repeats while a channel is held
    pub next_repeat_ms: f64,
    /// Rotation increment in radians
    pub angle: f64,
    pub default_snap: f64,
    pub dominant_axis_angle_deg: f64,
}

impl Default for NudgeSettings {
    fn default() -> Self {
        Self {
            threshold_on: 0.3,
            threshold_off: 0.2,
            first_repeat_ms: 250.0,
            next_repeat_ms: 75.0,
            angle: PI / 8.0,
            default_snap: DEFAULT_SNAP,
            dominant_axis_angle_deg: 90.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NudgeState {
    pub last_axis: Option<usize>,
    pub next_move_at: f64,
    /// An edit scope is open in the host
    pub recording: bool,
}

impl Default for NudgeState {
    fn default() -> Self {
        Self {
            last_axis: None,
            next_move_at: f64::NEG_INFINITY,
            recording: false,
        }
    }
}

/// One discrete move of the selection
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NudgeTransform {
    Translate { offset: DVec3 },
    Rotate { axis: DVec3, angle: f64, center: DVec3 },
}

impl NudgeTransform {
    pub fn matrix(&self) -> DMat4 {
        match *self {
            NudgeTransform::Translate { offset } => DMat4::from_translation(offset),
            NudgeTransform::Rotate {
                axis,
                angle,
                center,
            } => {
                DMat4::from_translation(center)
                    * DMat4::from_axis_angle(axis, angle)
                    * DMat4::from_translation(-center)
            }
        }
    }
}

/// Mean of the selection's bounding sphere centers
pub fn selection_centroid(selection: &[&mut dyn Transformable]) -> DVec3 {
    if selection.is_empty() {
        return DVec3::ZERO;
    }
    let sum: DVec3 = selection
        .iter()
        .map(|object| object.bounding_sphere().center)
        .sum();
    sum / selection.len() as f64
}

#[derive(Debug)]
pub struct NudgeEngine {
    settings: NudgeSettings,
    state: NudgeState,
}

impl NudgeEngine {
    pub fn new(settings: NudgeSettings) -> Self {
        Self {
            settings,
            state: NudgeState::default(),
        }
    }

    pub fn settings(&self) -> &NudgeSettings {
        &self.settings
    }

    pub fn state(&self) -> &NudgeState {
        &self.state
    }

    /// Drops dominance and closes an open edit scope
    pub fn reset(&mut self, scope: &mut dyn EditScope) {
        if self.state.recording {
            debug!("Closing nudge edit scope");
            scope.end_scope();
            self.state.recording = false;
        }
        self.state.last_axis = None;
    }

    /// Runs one tick; returns the transform applied to `selection`, if any
    pub fn tick(
        &mut self,
        axes: &AxisSample,
        now_ms: f64,
        orientation: DQuat,
        selection: &mut [&mut dyn Transformable],
        snap: f64,
        fine: bool,
        scope: &mut dyn EditScope,
    ) -> Option<NudgeTransform> {
        let Some(axis) = self.select_axis(axes) else {
            self.reset(scope);
            return None;
        };

        if self.state.last_axis == Some(axis) {
            if self.settings.next_repeat_ms <= 0.0 || now_ms < self.state.next_move_at {
                return None;
            }
            self.state.next_move_at = now_ms + self.settings.next_repeat_ms;
        } else {
            debug!("Axis {} became dominant ({:.3})", axis, axes.get(axis));
            self.state.next_move_at = now_ms + self.settings.first_repeat_ms;
            self.state.last_axis = Some(axis);
        }

        if selection.is_empty() {
            return None;
        }

        let (snap, angle) = self.step_sizes(snap, fine);
        let sign = axes.get(axis).signum();
        let transform = if axis < 3 {
            translation(axis, sign, snap, orientation)
        } else {
            rotation(axis - 3, sign, angle, orientation, selection_centroid(selection))
        };

        if !self.state.recording {
            debug!("Opening nudge edit scope");
            scope.begin_scope();
            self.state.recording = true;
        }

        let matrix = transform.matrix();
        for object in selection.iter_mut() {
            object.apply_transform(&matrix);
        }
        debug!("Nudged {} object(s): {:?}", selection.len(), transform);
        Some(transform)
    }

    fn select_axis(&self, axes: &AxisSample) -> Option<usize> {
        let last = self.state.last_axis;

        if let Some(candidate) = axes.dominant(self.settings.dominant_axis_angle_deg) {
            let threshold = if last == Some(candidate) {
                self.settings.threshold_off
            } else {
                self.settings.threshold_on
            };
            if axes.get(candidate).abs() >= threshold {
                return Some(candidate);
            }
        }

        // A newcomer below the on-threshold does not unseat the current axis
        last.filter(|&axis| axes.get(axis).abs() >= self.settings.threshold_off)
    }

    fn step_sizes(&self, snap: f64, fine: bool) -> (f64, f64) {
        let snap = if snap.is_finite() && snap > 0.0 {
            snap
        } else {
            self.settings.default_snap
        };
        if fine {
            (snap / 10.0, self.settings.angle / 10.0)
        } else {
            (snap, self.settings.angle)
        }
    }
}

/// Snaps a translation channel to a single world axis.
///
/// The two in-plane channels move along world X or Y, whichever the pushed
/// camera-local direction lines up with best. The depth channel moves along
/// world Z and flips while the camera looks downward, so pushing forward
/// always moves away from the viewer.
fn translation(axis: usize, sign: f64, snap: f64, orientation: DQuat) -> NudgeTransform {
    let offset = if axis == 2 {
        let look = orientation * DVec3::Z;
        let sign = if look.z < 0.0 { -sign } else { sign };
        DVec3::Z * (sign * snap)
    } else {
        let local = if axis == 0 {
            DVec3::X * sign
        } else {
            DVec3::Y * sign
        };
        let test = orientation * local;
        if test.x.abs() < test.y.abs() {
            DVec3::Y * (-test.y.signum() * snap)
        } else {
            DVec3::X * (-test.x.signum() * snap)
        }
    };
    NudgeTransform::Translate { offset }
}

/// Rotation about world axis `k` (0 = X, 1 = Y, 2 = Z), signed relative to
/// the camera: the direction flips when the world axis projects negatively
/// onto the camera's matching local axis.
fn rotation(k: usize, sign: f64, angle: f64, orientation: DQuat, center: DVec3) -> NudgeTransform {
    let world = match k {
        0 => DVec3::X,
        1 => DVec3::Y,
        _ => DVec3::Z,
    };
    let test = orientation * world;
    let sign = if test[k] < 0.0 { -sign } else { sign };

    NudgeTransform::Rotate {
        axis: world,
        angle: -sign * angle,
        center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BoundingSphere;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    #[derive(Debug, Clone)]
    struct Block {
        center: DVec3,
        moves: usize,
    }

    impl Block {
        fn at(center: DVec3) -> Self {
            Self { center, moves: 0 }
        }
    }

    impl Transformable for Block {
        fn apply_transform(&mut self, matrix: &DMat4) {
            self.center = matrix.transform_point3(self.center);
            self.moves += 1;
        }

        fn bounding_sphere(&self) -> BoundingSphere {
            BoundingSphere {
                center: self.center,
                radius: 1.0,
            }
        }
    }

    #[derive(Debug, Default)]
    struct Scopes {
        begun: usize,
        ended: usize,
    }

    impl EditScope for Scopes {
        fn begin_scope(&mut self) {
            self.begun += 1;
        }

        fn end_scope(&mut self) {
            self.ended += 1;
        }
    }

    fn axis(channel: usize, value: f64) -> AxisSample {
        let mut values = [0.0; 6];
        values[channel] = value;
        AxisSample(values)
    }

    fn nudge(
        engine: &mut NudgeEngine,
        sample: AxisSample,
        now: f64,
        blocks: &mut [Block],
        fine: bool,
        scopes: &mut Scopes,
    ) -> Option<NudgeTransform> {
        let mut selection: Vec<&mut dyn Transformable> = blocks
            .iter_mut()
            .map(|b| b as &mut dyn Transformable)
            .collect();
        engine.tick(&sample, now, DQuat::IDENTITY, &mut selection, 0.1, fine, scopes)
    }

    #[test]
    fn test_zero_axes_do_nothing() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        assert_eq!(nudge(&mut engine, AxisSample::ZERO, 0.0, &mut blocks, false, &mut scopes), None);
        assert_eq!(*engine.state(), NudgeState::default());
        assert_eq!(scopes.begun, 0);
        assert_eq!(blocks[0].moves, 0);
    }

    #[test]
    fn test_translation_snaps_to_grid() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO), Block::at(DVec3::new(5.0, 5.0, 5.0))];
        let mut scopes = Scopes::default();

        let transform = nudge(&mut engine, axis(0, 0.5), 1000.0, &mut blocks, false, &mut scopes);
        let Some(NudgeTransform::Translate { offset }) = transform else {
            panic!("expected a translation, got {transform:?}");
        };
        assert!((offset.length() - 0.1).abs() < 1e-12);
        assert_eq!(offset.y, 0.0);
        assert_eq!(offset.z, 0.0);
        assert!(blocks.iter().all(|b| b.moves == 1));
        assert!((blocks[1].center - DVec3::new(5.0, 5.0, 5.0) - offset).length() < 1e-12);
        assert_eq!(engine.state().next_move_at, 1250.0);
        assert_eq!(engine.state().last_axis, Some(0));
        assert_eq!(scopes.begun, 1);
    }

    #[test]
    fn test_fine_modifier_divides_snap() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        nudge(&mut engine, axis(0, 0.5), 0.0, &mut blocks, true, &mut scopes);
        assert!((blocks[0].center.length() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_fine_modifier_divides_angle() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        let transform = nudge(&mut engine, axis(4, 0.5), 0.0, &mut blocks, true, &mut scopes);
        let Some(NudgeTransform::Rotate { angle, .. }) = transform else {
            panic!("expected a rotation, got {transform:?}");
        };
        assert!((angle.abs() - PI / 80.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_snap_uses_default() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut block = Block::at(DVec3::ZERO);
        let mut selection: Vec<&mut dyn Transformable> = vec![&mut block as &mut dyn Transformable];
        let mut scopes = Scopes::default();

        engine.tick(&axis(1, 0.9), 0.0, DQuat::IDENTITY, &mut selection, 0.0, false, &mut scopes);
        drop(selection);
        assert!((block.center.length() - DEFAULT_SNAP).abs() < 1e-12);
    }

    #[test]
    fn test_repeat_schedule() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        let mut fired = Vec::new();
        for tick in 0..100 {
            let now = tick as f64 * 10.0;
            if nudge(&mut engine, axis(2, 0.8), now, &mut blocks, false, &mut scopes).is_some() {
                fired.push(now);
            }
        }

        assert_eq!(fired[0], 0.0);
        assert_eq!(fired[1], 250.0);
        for pair in fired[1..].windows(2) {
            assert!(pair[1] - pair[0] >= 75.0);
        }
        assert_eq!(scopes.begun, 1);
        assert_eq!(scopes.ended, 0);
    }

    #[test]
    fn test_zero_repeat_delay_fires_once() {
        let mut engine = NudgeEngine::new(NudgeSettings {
            next_repeat_ms: 0.0,
            ..Default::default()
        });
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        let fires = (0..100)
            .filter(|tick| {
                nudge(&mut engine, axis(1, 0.8), *tick as f64 * 33.0, &mut blocks, false, &mut scopes)
                    .is_some()
            })
            .count();
        assert_eq!(fires, 1);
    }

    #[test]
    fn test_losing_dominance_closes_scope() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        nudge(&mut engine, axis(0, 0.5), 0.0, &mut blocks, false, &mut scopes);
        assert!(engine.state().recording);

        assert_eq!(nudge(&mut engine, axis(0, 0.1), 33.0, &mut blocks, false, &mut scopes), None);
        assert_eq!(engine.state().last_axis, None);
        assert!(!engine.state().recording);
        assert_eq!(scopes.ended, 1);
    }

    #[test]
    fn test_hysteresis() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::ZERO)];
        let mut scopes = Scopes::default();

        // Not strong enough to start
        nudge(&mut engine, axis(0, 0.25), 0.0, &mut blocks, false, &mut scopes);
        assert_eq!(engine.state().last_axis, None);

        nudge(&mut engine, axis(0, 0.35), 10.0, &mut blocks, false, &mut scopes);
        assert_eq!(engine.state().last_axis, Some(0));

        // Between off and on keeps it dominant
        nudge(&mut engine, axis(0, 0.25), 20.0, &mut blocks, false, &mut scopes);
        assert_eq!(engine.state().last_axis, Some(0));

        // A weaker newcomer cannot take over
        let mut mixed = AxisSample([0.22, 0.0, 0.0, 0.0, 0.28, 0.0]);
        nudge(&mut engine, mixed, 30.0, &mut blocks, false, &mut scopes);
        assert_eq!(engine.state().last_axis, Some(0));

        mixed.0[0] = 0.1;
        nudge(&mut engine, mixed, 40.0, &mut blocks, false, &mut scopes);
        assert_eq!(engine.state().last_axis, None);
    }

    #[test]
    fn test_empty_selection_still_tracks_timing() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut scopes = Scopes::default();

        assert_eq!(nudge(&mut engine, axis(3, 0.9), 100.0, &mut [], false, &mut scopes), None);
        assert_eq!(engine.state().last_axis, Some(3));
        assert_eq!(engine.state().next_move_at, 350.0);
        assert!(!engine.state().recording);
        assert_eq!(scopes.begun, 0);
    }

    #[test]
    fn test_depth_flips_when_looking_down() {
        let level = translation(2, 1.0, 0.1, DQuat::IDENTITY);
        assert_eq!(level, NudgeTransform::Translate { offset: DVec3::new(0.0, 0.0, 0.1) });

        // Forward tilted to point below the horizon
        let down = DQuat::from_rotation_x(2.0);
        assert!((down * DVec3::Z).z < 0.0);
        let NudgeTransform::Translate { offset } = translation(2, 1.0, 0.1, down) else {
            unreachable!()
        };
        assert!((offset.z + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_in_plane_axis_follows_camera_heading() {
        // Quarter turn about Z: local X lines up with world Y
        let turned = DQuat::from_rotation_z(FRAC_PI_2);
        let NudgeTransform::Translate { offset } = translation(0, 1.0, 0.1, turned) else {
            unreachable!()
        };
        assert!(offset.x.abs() < 1e-12);
        assert!((offset.y + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_pivots_on_selection_centroid() {
        let mut engine = NudgeEngine::new(NudgeSettings::default());
        let mut blocks = vec![Block::at(DVec3::new(2.0, 0.0, 0.0)), Block::at(DVec3::new(4.0, 2.0, 0.0))];
        let mut scopes = Scopes::default();

        match nudge(&mut engine, axis(5, 0.9), 0.0, &mut blocks, false, &mut scopes) {
            Some(NudgeTransform::Rotate { center, axis, .. }) => {
                assert_eq!(center, DVec3::new(3.0, 1.0, 0.0));
                assert_eq!(axis, DVec3::Z);
            }
            other => panic!("expected a rotation, got {other:?}"),
        }
    }

    #[test]
    fn test_rotation_sign_follows_camera() {
        let facing = rotation(2, 1.0, 0.5, DQuat::IDENTITY, DVec3::ZERO);
        let flipped = rotation(2, 1.0, 0.5, DQuat::from_rotation_x(PI), DVec3::ZERO);
        match (facing, flipped) {
            (
                NudgeTransform::Rotate { axis: a, angle: x, .. },
                NudgeTransform::Rotate { axis: b, angle: y, .. },
            ) => {
                assert_eq!(a, DVec3::Z);
                assert_eq!(b, DVec3::Z);
                assert!((x + 0.5).abs() < 1e-12);
                assert!((y - 0.5).abs() < 1e-12);
            }
            other => panic!("unexpected transforms {other:?}"),
        }
    }

    fn arb_point() -> impl Strategy<Value = DVec3> {
        (-100.0..100.0f64, -100.0..100.0f64, -100.0..100.0f64)
            .prop_map(|(x, y, z)| DVec3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn group_rotation_preserves_centroid(
            centers in prop::collection::vec(arb_point(), 1..8),
            channel in 3usize..6,
            value in prop_oneof![-1.0..-0.3f64, 0.3..1.0f64],
            angle_deg in 0.1..180.0f64,
            yaw in -3.0..3.0f64,
        ) {
            let mut engine = NudgeEngine::new(NudgeSettings {
                angle: angle_deg.to_radians(),
                ..Default::default()
            });
            let mut blocks: Vec<Block> = centers.iter().copied().map(Block::at).collect();
            let mut scopes = Scopes::default();

            let before = {
                let selection: Vec<&mut dyn Transformable> =
                    blocks.iter_mut().map(|b| b as &mut dyn Transformable).collect();
                selection_centroid(&selection)
            };

            let mut selection: Vec<&mut dyn Transformable> =
                blocks.iter_mut().map(|b| b as &mut dyn Transformable).collect();
            let transform = engine.tick(
                &axis(channel, value),
                0.0,
                DQuat::from_rotation_z(yaw),
                &mut selection,
                0.1,
                false,
                &mut scopes,
            );
            let is_rotation = matches!(transform, Some(NudgeTransform::Rotate { .. }));
            prop_assert!(is_rotation);

            let after = selection_centroid(&selection);
            prop_assert!(before.distance(after) < 1e-9, "{:?} != {:?}", before, after);
        }

        #[test]
        fn weak_samples_clear_dominance(
            prior in 0usize..6,
            values in prop::array::uniform6(-0.199..0.199f64),
        ) {
            let mut engine = NudgeEngine::new(NudgeSettings::default());
            let mut blocks = vec![Block::at(DVec3::ZERO)];
            let mut scopes = Scopes::default();

            nudge(&mut engine, axis(prior, 0.9), 0.0, &mut blocks, false, &mut scopes);
            prop_assert_eq!(engine.state().last_axis, Some(prior));

            let result = nudge(&mut engine, AxisSample(values), 500.0, &mut blocks, false, &mut scopes);
            prop_assert_eq!(result, None);
            prop_assert_eq!(engine.state().last_axis, None);
            prop_assert!(!engine.state().recording);
        }

        #[test]
        fn newcomer_needs_on_threshold(
            prior in 0usize..6,
            offset in 1usize..6,
            held in 0.2..1.0f64,
            newcomer in 0.0..0.299f64,
        ) {
            let mut engine = NudgeEngine::new(NudgeSettings::default());
            let mut blocks = vec![Block::at(DVec3::ZERO)];
            let mut scopes = Scopes::default();
            nudge(&mut engine, axis(prior, 0.9), 0.0, &mut blocks, false, &mut scopes);

            let other = (prior + offset) % 6;
            let mut values = [0.0; 6];
            values[prior] = held;
            values[other] = newcomer;
            nudge(&mut engine, AxisSample(values), 10.0, &mut blocks, false, &mut scopes);
            prop_assert_eq!(engine.state().last_axis, Some(prior));
        }
    }
}
