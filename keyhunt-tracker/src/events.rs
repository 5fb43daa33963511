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

use serde::Serialize;

use crate::geometry::MarkerId;

/// Published on a session's event channel as the tracking state changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    KeyShown { marker_id: MarkerId },
    KeyHidden { marker_id: MarkerId },
    KeyTargeted { marker_id: MarkerId, distance: f64 },
    KeyCollected { marker_id: MarkerId },
    AllCollected,
    /// A detection tick was abandoned. Tracking state is unchanged.
    TickFailed { reason: String },
}

impl TrackingEvent {
    pub fn marker_id(&self) -> Option<MarkerId> {
        match self {
            TrackingEvent::KeyShown { marker_id }
            | TrackingEvent::KeyHidden { marker_id }
            | TrackingEvent::KeyTargeted { marker_id, .. }
            | TrackingEvent::KeyCollected { marker_id } => Some(*marker_id),
            TrackingEvent::AllCollected | TrackingEvent::TickFailed { .. } => None,
        }
    }
}
