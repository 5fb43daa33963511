/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Tracked keys and the per-poll eviction policy.
//!
//! [`TrackingState::apply_poll`] is a pure function of the previous state,
//! the detections of one frame and the poll time. Calling it again with the
//! same input changes nothing and emits no events.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::binder::{SceneTransform, TransformBinder};
use crate::config::{CreationPolicy, TrackerConfig};
use crate::detection::Detection;
use crate::error::TrackerError;
use crate::events::TrackingEvent;
use crate::geometry::MarkerId;
use crate::riddles::{Riddle, RiddleBook};

/// `Hidden -> Visible -> Targeted -> Collected`. Any state but `Collected`
/// drops back to `Hidden` once the marker goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Hidden,
    Visible,
    Targeted,
    Collected,
}

impl KeyState {
    pub fn is_visible(self) -> bool {
        matches!(self, KeyState::Visible | KeyState::Targeted)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedKey {
    marker_id: MarkerId,
    riddle_id: u32,
    state: KeyState,
    last_seen_ms: Option<u64>,
    transform: Option<SceneTransform>,
}

impl TrackedKey {
    fn new(marker_id: MarkerId, riddle_id: u32) -> Self {
        Self {
            marker_id,
            riddle_id,
            state: KeyState::Hidden,
            last_seen_ms: None,
            transform: None,
        }
    }

    pub fn marker_id(&self) -> MarkerId {
        self.marker_id
    }

    pub fn riddle_id(&self) -> u32 {
        self.riddle_id
    }

    pub fn state(&self) -> KeyState {
        self.state
    }

    pub fn last_seen_ms(&self) -> Option<u64> {
        self.last_seen_ms
    }

    /// Last bound transform. Kept while hidden so a reappearing key starts
    /// from where it was.
    pub fn transform(&self) -> Option<&SceneTransform> {
        self.transform.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    pub fn is_collected(&self) -> bool {
        self.state == KeyState::Collected
    }

    fn seen_within(&self, now_ms: u64, stale_threshold_ms: u64) -> bool {
        self.last_seen_ms
            .is_some_and(|seen| now_ms.saturating_sub(seen) < stale_threshold_ms)
    }
}

/// Result of answering a riddle.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Clone)]
pub struct TrackingState {
    keys: BTreeMap<MarkerId, TrackedKey>,
    binder: TransformBinder,
    riddles: RiddleBook,
    policy: CreationPolicy,
    stale_threshold_ms: u64,
    targeting_distance: f64,
    targeted: Option<MarkerId>,
}

impl TrackingState {
    /// Keys listed in the config are created up front, hidden.
    pub fn new(config: &TrackerConfig, riddles: RiddleBook) -> Self {
        let mut keys = BTreeMap::new();
        for spec in &config.keys {
            keys.entry(spec.marker_id)
                .or_insert_with(|| TrackedKey::new(spec.marker_id, spec.riddle_id));
        }
        Self {
            keys,
            binder: TransformBinder::new(config),
            riddles,
            policy: config.creation_policy,
            stale_threshold_ms: config.stale_threshold_ms,
            targeting_distance: config.targeting_distance,
            targeted: None,
        }
    }

    /// Fold one frame's detections into the state.
    pub fn apply_poll(
        &mut self,
        detections: &[Detection],
        frame_width: u32,
        frame_height: u32,
        now_ms: u64,
    ) -> Vec<TrackingEvent> {
        let before: BTreeMap<MarkerId, KeyState> =
            self.keys.iter().map(|(id, key)| (*id, key.state)).collect();

        let mut seen = BTreeSet::new();
        for detection in detections {
            let id = detection.observation.id;
            if !seen.insert(id) {
                trace!(marker = id, "duplicate marker in frame, keeping the first");
                continue;
            }
            if !self.keys.contains_key(&id) {
                match self.policy {
                    CreationPolicy::Strict => {
                        trace!(marker = id, "ignoring unexpected marker");
                        continue;
                    }
                    CreationPolicy::Lazy => {
                        let riddle_id = self.riddles.id_for_position(self.keys.len());
                        info!(marker = id, riddle = riddle_id, "creating key on first sight");
                        self.keys.insert(id, TrackedKey::new(id, riddle_id));
                    }
                }
            }
            let Some(key) = self.keys.get_mut(&id) else {
                continue;
            };
            if key.is_collected() {
                continue;
            }
            key.last_seen_ms = Some(key.last_seen_ms.map_or(now_ms, |t| t.max(now_ms)));
            key.transform = Some(self.binder.bind(detection, frame_width, frame_height));
        }

        for key in self.keys.values_mut() {
            if key.is_collected() {
                continue;
            }
            key.state = if key.seen_within(now_ms, self.stale_threshold_ms) {
                KeyState::Visible
            } else {
                KeyState::Hidden
            };
        }

        self.targeted = self
            .keys
            .values()
            .filter(|key| key.state == KeyState::Visible)
            .filter_map(|key| key.transform.map(|t| (key.marker_id, t.distance())))
            .filter(|(_, distance)| *distance < self.targeting_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id);
        if let Some(key) = self.targeted.and_then(|id| self.keys.get_mut(&id)) {
            key.state = KeyState::Targeted;
        }

        let mut events = Vec::new();
        for key in self.keys.values() {
            let old = before.get(&key.marker_id).copied().unwrap_or(KeyState::Hidden);
            match (old.is_visible(), key.state.is_visible()) {
                (false, true) => events.push(TrackingEvent::KeyShown {
                    marker_id: key.marker_id,
                }),
                (true, false) => events.push(TrackingEvent::KeyHidden {
                    marker_id: key.marker_id,
                }),
                _ => {}
            }
            if key.state == KeyState::Targeted && old != KeyState::Targeted {
                events.push(TrackingEvent::KeyTargeted {
                    marker_id: key.marker_id,
                    distance: key.transform.map_or(0.0, |t| t.distance()),
                });
            }
        }
        if !events.is_empty() {
            debug!(now_ms, "poll changed state: {events:?}");
        }
        events
    }

    /// The riddle guarding the targeted key.
    pub fn open_riddle(&self) -> Option<(MarkerId, &Riddle)> {
        let key = self.keys.get(&self.targeted?)?;
        Some((key.marker_id, self.riddles.get(key.riddle_id)?))
    }

    /// Answer the riddle of a targeted key. A correct answer collects it; a
    /// wrong one leaves everything as it was.
    pub fn answer(&mut self, marker_id: MarkerId, index: usize) -> Result<AnswerOutcome, TrackerError> {
        let key = self
            .keys
            .get(&marker_id)
            .ok_or(TrackerError::UnknownKey(marker_id))?;
        if key.state != KeyState::Targeted {
            return Err(TrackerError::NotTargeted(marker_id));
        }
        let riddle = self
            .riddles
            .get(key.riddle_id)
            .ok_or(TrackerError::UnknownRiddle(key.riddle_id))?;
        if !riddle.is_correct(index)? {
            debug!(marker = marker_id, index, "wrong answer");
            return Ok(AnswerOutcome {
                correct: false,
                events: Vec::new(),
            });
        }

        if let Some(key) = self.keys.get_mut(&marker_id) {
            key.state = KeyState::Collected;
        }
        self.targeted = None;
        info!(
            marker = marker_id,
            "key collected ({}/{})",
            self.collected_count(),
            self.total()
        );
        let mut events = vec![TrackingEvent::KeyCollected { marker_id }];
        if self.all_collected() {
            events.push(TrackingEvent::AllCollected);
        }
        Ok(AnswerOutcome {
            correct: true,
            events,
        })
    }

    pub fn key(&self, marker_id: MarkerId) -> Option<&TrackedKey> {
        self.keys.get(&marker_id)
    }

    /// Keys in marker id order.
    pub fn keys(&self) -> impl Iterator<Item = &TrackedKey> {
        self.keys.values()
    }

    pub fn targeted(&self) -> Option<MarkerId> {
        self.targeted
    }

    pub fn collected_count(&self) -> usize {
        self.keys.values().filter(|k| k.is_collected()).count()
    }

    pub fn total(&self) -> usize {
        self.keys.len()
    }

    pub fn all_collected(&self) -> bool {
        !self.keys.is_empty() && self.collected_count() == self.keys.len()
    }

    pub fn stale_threshold_ms(&self) -> u64 {
        self.stale_threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeySpec;
    use crate::geometry::MarkerObservation;
    use crate::pose::{PoseEstimate, PoseSolution};
    use nalgebra::{Matrix3, Vector3};

    const W: u32 = 640;
    const H: u32 = 480;

    fn detection(id: MarkerId, x_mm: f64, z_mm: f64) -> Detection {
        let observation = MarkerObservation::new(
            id,
            [[160.0, 80.0], [480.0, 80.0], [480.0, 400.0], [160.0, 400.0]],
        );
        let solution = PoseSolution {
            rotation: Matrix3::identity(),
            translation: Vector3::new(x_mm, 0.0, z_mm),
            error: 0.0,
        };
        Detection {
            bounds: observation.bounds(),
            observation,
            pose: Some(PoseEstimate::from_candidates(solution.clone(), solution)),
        }
    }

    fn state() -> TrackingState {
        TrackingState::new(&TrackerConfig::default(), RiddleBook::default())
    }

    #[test]
    fn configured_keys_start_hidden() {
        let state = state();
        assert_eq!(state.total(), 3);
        assert!(state.keys().all(|k| k.state() == KeyState::Hidden));
        assert_eq!(state.key(63).unwrap().riddle_id(), 2);
    }

    #[test]
    fn centered_marker_42_becomes_visible() {
        let mut state = state();
        let events = state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 0);
        let key = state.key(42).unwrap();
        assert!(key.is_visible());
        assert_eq!(key.transform().unwrap().scale, 3.0);
        assert_eq!(key.last_seen_ms(), Some(0));
        assert!(events.contains(&TrackingEvent::KeyShown { marker_id: 42 }));
    }

    #[test]
    fn repeated_poll_is_idempotent() {
        let mut state = state();
        let frame = [detection(42, 20.0, 150.0), detection(63, -40.0, 300.0)];
        state.apply_poll(&frame, W, H, 100);
        let keys: Vec<TrackedKey> = state.keys().cloned().collect();
        let targeted = state.targeted();

        let events = state.apply_poll(&frame, W, H, 100);
        assert!(events.is_empty());
        assert_eq!(state.keys().cloned().collect::<Vec<_>>(), keys);
        assert_eq!(state.targeted(), targeted);
    }

    #[test]
    fn absent_marker_hides_after_threshold_and_stays_hidden() {
        let mut state = state();
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 1_000);
        assert!(state.apply_poll(&[], W, H, 1_499).is_empty());
        assert!(state.key(42).unwrap().is_visible());

        let events = state.apply_poll(&[], W, H, 1_500);
        assert_eq!(events, vec![TrackingEvent::KeyHidden { marker_id: 42 }]);
        assert_eq!(state.targeted(), None);
        for now in [1_600, 5_000, 60_000] {
            state.apply_poll(&[], W, H, now);
            assert!(!state.key(42).unwrap().is_visible());
        }

        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 61_000);
        assert!(state.key(42).unwrap().is_visible());
    }

    #[test]
    fn last_seen_never_moves_backwards() {
        let mut state = state();
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 800);
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 700);
        assert_eq!(state.key(42).unwrap().last_seen_ms(), Some(800));
    }

    #[test]
    fn strict_policy_ignores_unknown_marker() {
        let mut state = state();
        let events = state.apply_poll(&[detection(7, 0.0, 100.0)], W, H, 0);
        assert!(events.is_empty());
        assert!(state.key(7).is_none());
        assert_eq!(state.total(), 3);
    }

    #[test]
    fn lazy_policy_creates_unknown_marker() {
        let config = TrackerConfig {
            creation_policy: CreationPolicy::Lazy,
            ..Default::default()
        };
        let mut state = TrackingState::new(&config, RiddleBook::default());
        state.apply_poll(&[detection(7, 0.0, 100.0)], W, H, 0);
        assert!(state.key(7).unwrap().is_visible());
        // fourth key wraps around to the first riddle
        assert_eq!(state.key(7).unwrap().riddle_id(), 1);

        state.apply_poll(&[detection(7, 0.0, 100.0)], W, H, 100);
        assert_eq!(state.total(), 4);
        assert!(state.key(7).unwrap().is_visible());
    }

    #[test]
    fn nearest_key_in_range_is_targeted() {
        let mut state = state();
        // 42 at ~1.56, 63 at 1.0, 91 at ~3.04 scene units
        let frame = [
            detection(42, 120.0, 100.0),
            detection(63, 0.0, 100.0),
            detection(91, 300.0, 50.0),
        ];
        let events = state.apply_poll(&frame, W, H, 0);
        assert_eq!(state.targeted(), Some(63));
        assert_eq!(state.key(42).unwrap().state(), KeyState::Visible);
        assert_eq!(state.key(63).unwrap().state(), KeyState::Targeted);
        assert_eq!(state.key(91).unwrap().state(), KeyState::Visible);
        assert!(events.contains(&TrackingEvent::KeyTargeted {
            marker_id: 63,
            distance: 1.0
        }));

        // 63 goes stale, 42 takes over
        state.apply_poll(&frame[..1], W, H, 400);
        state.apply_poll(&frame[..1], W, H, 600);
        assert_eq!(state.targeted(), Some(42));
    }

    #[test]
    fn riddle_flow_collects_targeted_key() {
        let mut state = state();
        assert!(state.open_riddle().is_none());
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 0);

        let (id, riddle) = state.open_riddle().unwrap();
        assert_eq!((id, riddle.id), (42, 1));

        let wrong = state.answer(42, 1).unwrap();
        assert!(!wrong.correct && wrong.events.is_empty());
        assert_eq!(state.key(42).unwrap().state(), KeyState::Targeted);

        let right = state.answer(42, 0).unwrap();
        assert!(right.correct);
        assert_eq!(right.events, vec![TrackingEvent::KeyCollected { marker_id: 42 }]);
        assert_eq!(state.collected_count(), 1);
        assert!(!state.all_collected());
    }

    #[test]
    fn collected_is_absorbing() {
        let mut state = state();
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 0);
        state.answer(42, 0).unwrap();

        for now in [100, 700, 2_000] {
            let events = state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, now);
            assert!(events.is_empty());
            let key = state.key(42).unwrap();
            assert_eq!(key.state(), KeyState::Collected);
            assert!(!key.is_visible());
        }
        assert_eq!(state.key(42).unwrap().last_seen_ms(), Some(0));
    }

    #[test]
    fn answering_requires_a_targeted_key() {
        let mut state = state();
        assert!(matches!(state.answer(5, 0), Err(TrackerError::UnknownKey(5))));
        assert!(matches!(state.answer(42, 0), Err(TrackerError::NotTargeted(42))));
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 0);
        assert!(matches!(
            state.answer(42, 9),
            Err(TrackerError::UnknownAnswer { .. })
        ));
    }

    #[test]
    fn collecting_every_key_reports_completion() {
        let config = TrackerConfig {
            keys: KeySpec::pair(&[42, 63], &[1, 3]),
            ..Default::default()
        };
        let mut state = TrackingState::new(&config, RiddleBook::default());
        state.apply_poll(&[detection(42, 0.0, 100.0)], W, H, 0);
        state.answer(42, 0).unwrap();
        state.apply_poll(&[detection(63, 0.0, 100.0)], W, H, 100);
        let outcome = state.answer(63, 0).unwrap();
        assert_eq!(
            outcome.events,
            vec![
                TrackingEvent::KeyCollected { marker_id: 63 },
                TrackingEvent::AllCollected
            ]
        );
        assert!(state.all_collected());
    }

    #[test]
    fn no_keys_is_never_complete() {
        let config = TrackerConfig {
            keys: Vec::new(),
            ..Default::default()
        };
        assert!(!TrackingState::new(&config, RiddleBook::default()).all_collected());
    }

    #[test]
    fn duplicate_ids_in_one_frame_keep_the_first() {
        let mut state = state();
        state.apply_poll(
            &[detection(42, 0.0, 100.0), detection(42, 0.0, 200.0)],
            W,
            H,
            0,
        );
        assert_eq!(state.key(42).unwrap().transform().unwrap().position.z, -1.0);
    }
}
