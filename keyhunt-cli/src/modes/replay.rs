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


use std::time::Duration;

use anyhow::{bail, Context};
use keyhunt_tracker::{
    KeyModel, KeySpec, RecordingBackend, RiddleBook, SessionParts, TracingBackend, TrackerConfig,
    TrackingEvent, TrackingSession,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cli_args::Replay;
use crate::consumers::report::{EventTally, SessionReport};
use crate::consumers::ReplayBackend;
use crate::producers::replay::{list_frames, ReplayScript};

const SESSION_ID: &str = "replay";

/// Tracker config from the optional file, with command line overrides applied.
pub fn build_config(opt: &Replay) -> anyhow::Result<TrackerConfig> {
    let mut config = match &opt.config {
        Some(path) => TrackerConfig::from_json_file(path)
            .with_context(|| format!("loading tracker config {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    if let Some(markers) = &opt.markers {
        config.keys = KeySpec::pair(markers, &[]);
    }
    if let Some(policy) = opt.policy {
        config.creation_policy = policy.into();
    }
    if let Some(orientation) = opt.orientation {
        config.orientation = orientation.into();
    }
    if let Some(poll_ms) = opt.poll_ms {
        config.poll_interval_ms = poll_ms;
    }
    config.validate()?;
    Ok(config)
}

/// Run the script through a live tracking session and report where every key
/// ended up.
pub async fn replay(opt: Replay) -> anyhow::Result<SessionReport> {
    let config = build_config(&opt)?;
    let script = ReplayScript::from_file(&opt.script)?;
    if script.is_empty() {
        bail!("script {} has no frames", opt.script.display());
    }
    let frame_count = script.len();
    let images = opt.frames.as_ref().map(list_frames).transpose()?;
    let riddles = opt
        .riddles
        .as_ref()
        .map(RiddleBook::load_or_default)
        .unwrap_or_default();

    let recording = RecordingBackend::new();
    let tracing_backend = opt.trace_render.then(|| {
        let model = match &opt.model {
            Some(path) => KeyModel::load(&[path]),
            None => KeyModel::load_default(),
        };
        TracingBackend::new(SESSION_ID, model)
    });

    let (source, detector, progress) = script.into_parts(images);
    let mut session = TrackingSession::start(
        SESSION_ID,
        &config,
        SessionParts {
            source: Box::new(source),
            detector: Box::new(detector),
            estimator: None,
            backend: Box::new(ReplayBackend::new(recording.clone(), tracing_backend)),
            riddles,
        },
    )?;
    info!(
        "replaying {frame_count} frames every {} ms",
        config.poll_interval_ms
    );

    let mut events = session.subscribe();
    let mut tally = EventTally::default();
    let linger = Duration::from_millis(
        config.poll_interval_ms + config.render_interval_ms + opt.hold_ms,
    );
    let mut check = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let mut ended_at: Option<Instant> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => on_event(&session, &opt, &mut tally, &event),
                Err(e) => {
                    warn!("event stream: {e}");
                    if events.is_closed() {
                        break;
                    }
                }
            },
            _ = check.tick() => {
                if progress.is_finished() {
                    let ended = *ended_at.get_or_insert_with(Instant::now);
                    if ended.elapsed() >= linger {
                        break;
                    }
                }
            }
        }
    }
    while let Ok(event) = events.try_recv() {
        on_event(&session, &opt, &mut tally, &event);
    }

    let snapshot = recording.snapshot();
    let report = session.with_state(|state| {
        SessionReport::build(
            SESSION_ID,
            session.elapsed_ms(),
            progress.frames_read(),
            state,
            &snapshot,
            tally,
        )
    });
    session.shutdown();
    Ok(report)
}

fn on_event(
    session: &TrackingSession,
    opt: &Replay,
    tally: &mut EventTally,
    event: &TrackingEvent,
) {
    debug!(?event, "tracking event");
    tally.record(event);
    match event {
        TrackingEvent::KeyTargeted { marker_id, distance } => {
            info!("key {marker_id} targeted at {distance:.2}");
            if opt.collect {
                if let Some((marker_id, riddle)) = session.open_riddle() {
                    match riddle.answers.iter().position(|a| a.correct) {
                        Some(index) => {
                            info!("answering riddle {} for key {marker_id}", riddle.id);
                            if let Err(e) = session.answer(marker_id, index) {
                                warn!("could not answer for key {marker_id}: {e}");
                            }
                        }
                        None => warn!("riddle {} has no correct answer", riddle.id),
                    }
                }
            }
        }
        TrackingEvent::KeyCollected { marker_id } => info!("key {marker_id} collected"),
        TrackingEvent::AllCollected => info!("all keys collected"),
        TrackingEvent::TickFailed { reason } => warn!("tick failed: {reason}"),
        TrackingEvent::KeyShown { .. } | TrackingEvent::KeyHidden { .. } => {}
    }
}
