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

//! End-of-replay summary of what the tracker believes and what the renderer
//! was told.

use std::fmt;

use keyhunt_tracker::{KeyState, MarkerId, Recording, TrackingEvent, TrackingState};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventTally {
    pub shown: usize,
    pub hidden: usize,
    pub targeted: usize,
    pub collected: usize,
    pub tick_failures: usize,
    pub all_collected: bool,
}

impl EventTally {
    pub fn record(&mut self, event: &TrackingEvent) {
        match event {
            TrackingEvent::KeyShown { .. } => self.shown += 1,
            TrackingEvent::KeyHidden { .. } => self.hidden += 1,
            TrackingEvent::KeyTargeted { .. } => self.targeted += 1,
            TrackingEvent::KeyCollected { .. } => self.collected += 1,
            TrackingEvent::AllCollected => self.all_collected = true,
            TrackingEvent::TickFailed { .. } => self.tick_failures += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyReport {
    pub marker_id: MarkerId,
    pub riddle_id: u32,
    pub state: KeyState,
    pub last_seen_ms: Option<u64>,
    /// Visibility as last pushed to the render backend.
    pub rendered: bool,
    pub position: Option<[f64; 3]>,
    pub scale: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session: String,
    pub elapsed_ms: u64,
    pub frames: usize,
    pub collected: usize,
    pub total: usize,
    pub keys: Vec<KeyReport>,
    pub events: EventTally,
}

impl SessionReport {
    pub fn build(
        session: &str,
        elapsed_ms: u64,
        frames: usize,
        state: &TrackingState,
        recording: &Recording,
        events: EventTally,
    ) -> Self {
        let mut keys: Vec<KeyReport> = state
            .keys()
            .map(|key| {
                let transform = recording.transforms.get(&key.marker_id());
                KeyReport {
                    marker_id: key.marker_id(),
                    riddle_id: key.riddle_id(),
                    state: key.state(),
                    last_seen_ms: key.last_seen_ms(),
                    rendered: recording.is_visible(key.marker_id()),
                    position: transform.map(|t| [t.position.x, t.position.y, t.position.z]),
                    scale: transform.map(|t| t.total_scale()),
                }
            })
            .collect();
        keys.sort_by_key(|k| k.marker_id);

        Self {
            session: session.to_string(),
            elapsed_ms,
            frames,
            collected: state.collected_count(),
            total: state.total(),
            keys,
            events,
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "session {}: {} frames in {} ms, {}/{} keys collected",
            self.session, self.frames, self.elapsed_ms, self.collected, self.total
        )?;
        writeln!(
            f,
            "  {:<8}{:<8}{:<11}{:<11}{:<10}{:<28}scale",
            "marker", "riddle", "state", "last seen", "rendered", "position"
        )?;
        for key in &self.keys {
            let state = format!("{:?}", key.state).to_lowercase();
            let last_seen = key
                .last_seen_ms
                .map(|ms| format!("{ms} ms"))
                .unwrap_or_else(|| "never".to_string());
            let rendered = if key.rendered { "yes" } else { "no" };
            let position = key
                .position
                .map(|[x, y, z]| format!("({x:.3}, {y:.3}, {z:.3})"))
                .unwrap_or_else(|| "-".to_string());
            let scale = key
                .scale
                .map(|s| format!("{s:.3}"))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "  {:<8}{:<8}{:<11}{:<11}{:<10}{:<28}{}",
                key.marker_id, key.riddle_id, state, last_seen, rendered, position, scale
            )?;
        }
        write!(
            f,
            "events: {} shown, {} hidden, {} targeted, {} collected, {} failed ticks",
            self.events.shown,
            self.events.hidden,
            self.events.targeted,
            self.events.collected,
            self.events.tick_failures
        )?;
        if self.events.all_collected {
            write!(f, ", all keys collected")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyhunt_tracker::{RiddleBook, TrackerConfig};

    #[test]
    fn tally_counts_each_kind() {
        let mut tally = EventTally::default();
        for event in [
            TrackingEvent::KeyShown { marker_id: 42 },
            TrackingEvent::KeyShown { marker_id: 63 },
            TrackingEvent::KeyHidden { marker_id: 63 },
            TrackingEvent::KeyTargeted { marker_id: 42, distance: 1.0 },
            TrackingEvent::TickFailed { reason: "glitch".to_string() },
        ] {
            tally.record(&event);
        }
        assert_eq!(
            tally,
            EventTally {
                shown: 2,
                hidden: 1,
                targeted: 1,
                collected: 0,
                tick_failures: 1,
                all_collected: false,
            }
        );
    }

    #[test]
    fn report_lists_configured_keys_in_marker_order() {
        let state = TrackingState::new(&TrackerConfig::default(), RiddleBook::default());
        let mut recording = Recording::default();
        recording.visible.insert(63, false);

        let report = SessionReport::build("replay", 1200, 12, &state, &recording, EventTally::default());

        let ids: Vec<MarkerId> = report.keys.iter().map(|k| k.marker_id).collect();
        assert_eq!(ids, vec![42, 63, 91]);
        assert_eq!(report.total, 3);
        assert_eq!(report.collected, 0);
        assert!(report.keys.iter().all(|k| k.state == KeyState::Hidden && !k.rendered));
        assert_eq!(report.keys[1].riddle_id, 2);

        let text = report.to_string();
        assert!(text.starts_with("session replay: 12 frames in 1200 ms, 0/3 keys collected"));
        assert!(text.contains("never"));
        assert!(text.ends_with("0 failed ticks"));
    }

    #[test]
    fn report_serializes_state_in_lowercase() {
        let state = TrackingState::new(&TrackerConfig::default(), RiddleBook::default());
        let report = SessionReport::build(
            "replay",
            0,
            0,
            &state,
            &Recording::default(),
            EventTally::default(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["keys"][0]["state"], "hidden");
        assert_eq!(json["keys"][0]["last_seen_ms"], serde_json::Value::Null);
    }
}
