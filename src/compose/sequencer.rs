// Generation Sequencer
// Owns the plan, the generated tracks and the transcript; runs one backend request at a time

use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;

use super::conversation::{ConversationEntry, ConversationLog};
use crate::backend::{BackendError, GenerationBackend, PlanRequest, TrackRequest};
use crate::export::suggested_file_name;
use crate::plan::{accept_plan, carry_forward, validate_track, InstrumentStatus, Plan, Track};
use crate::score::{assemble, DEFAULT_TITLE};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Read-only view of the composition handed to presentation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSnapshot {
    pub plan: Option<Plan>,
    pub tracks: Vec<Track>,
    pub entries: Vec<ConversationEntry>,
    pub busy: bool,
}

impl CompositionSnapshot {
    /// Assembled score for this snapshot; empty until a track exists
    pub fn document(&self) -> String {
        self.plan
            .as_ref()
            .map(|plan| assemble(&plan.song_info, &self.tracks))
            .unwrap_or_default()
    }

    /// Instruments still waiting for a track
    pub fn remaining(&self) -> usize {
        self.plan
            .as_ref()
            .map(|plan| plan.instrumentation.len().saturating_sub(self.tracks.len()))
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
struct Composition {
    plan: Option<Plan>,
    tracks: Vec<Track>,
    log: ConversationLog,
}

/// Sequences plan and track generation against a backend
///
/// Invariants held between calls:
/// - `tracks.len() <= plan.instrumentation.len()`
/// - `instrumentation[i]` is `generated` exactly for `i < tracks.len()`
/// - at most one instrument is `generating`, and only while a track request
///   for `instrumentation[tracks.len()]` is in flight
pub struct Sequencer<B> {
    backend: B,
    state: Mutex<Composition>,
    busy: AtomicBool,
    request_timeout: Option<Duration>,
    updates: watch::Sender<CompositionSnapshot>,
}

impl<B: GenerationBackend> Sequencer<B> {
    pub fn new(backend: B) -> Self {
        let (updates, _) = watch::channel(CompositionSnapshot::default());
        Sequencer {
            backend,
            state: Mutex::new(Composition::default()),
            busy: AtomicBool::new(false),
            request_timeout: None,
            updates,
        }
    }

    /// Fail backend requests that take longer than `timeout`
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True while a plan or track request is outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> CompositionSnapshot {
        let state = self.lock();
        self.snapshot_of(&state)
    }

    /// Receive a new snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<CompositionSnapshot> {
        self.updates.subscribe()
    }

    pub fn plan(&self) -> Option<Plan> {
        self.lock().plan.clone()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.lock().tracks.clone()
    }

    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.lock().log.read_all().to_vec()
    }

    /// Current score document (empty until the first track exists)
    pub fn score_document(&self) -> String {
        let state = self.lock();
        state
            .plan
            .as_ref()
            .map(|plan| assemble(&plan.song_info, &state.tracks))
            .unwrap_or_default()
    }

    /// Export file name for the current song
    pub fn suggested_file_name(&self) -> String {
        let state = self.lock();
        let title = state
            .plan
            .as_ref()
            .map(|plan| plan.song_info.title.as_str())
            .unwrap_or(DEFAULT_TITLE);
        suggested_file_name(title)
    }

    /// Create the plan from a prompt, or revise the current one
    ///
    /// Returns `Ok(None)` without recording anything when another request is
    /// in flight. On failure the previous plan and tracks are left as they
    /// were and an error reply is added to the transcript.
    pub async fn submit_prompt(&self, text: &str) -> Result<Option<Plan>, SequencerError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SequencerError::EmptyPrompt);
        }
        let Some(_flight) = InFlight::begin(self) else {
            log::debug!("Prompt ignored: a request is already in flight");
            return Ok(None);
        };

        let request = {
            let mut state = self.lock();
            state.log.append(ConversationEntry::user(text));
            let request = match &state.plan {
                None => PlanRequest::create(text),
                Some(plan) => PlanRequest::revise(text, plan.clone(), state.tracks.clone()),
            };
            self.publish_from(&state);
            request
        };
        let revising = request.is_revision();

        let result = self
            .call(self.backend.generate_plan(request))
            .await
            .and_then(|plan| accept_plan(plan).map_err(BackendError::from));

        let mut state = self.lock();
        match result {
            Ok(mut plan) => {
                let kept = carry_forward(&mut plan, &state.tracks);
                let discarded = state.tracks.len() - kept;
                state.tracks.truncate(kept);

                if revising {
                    log::info!(
                        "Plan revised: '{}', {} instruments, {} tracks kept, {} discarded",
                        plan.song_info.title,
                        plan.instrumentation.len(),
                        kept,
                        discarded
                    );
                } else {
                    log::info!(
                        "Plan accepted: '{}', {} instruments, {} bars",
                        plan.song_info.title,
                        plan.instrumentation.len(),
                        plan.total_bars()
                    );
                }

                state.log.append(ConversationEntry::assistant_plan(plan.clone()));
                state.plan = Some(plan.clone());
                Ok(Some(plan))
            }
            Err(e) => {
                log::error!("Plan request failed: {}", e);
                state
                    .log
                    .append(ConversationEntry::assistant(format!("Failed to generate plan: {}", e)));
                Err(e.into())
            }
        }
    }

    /// Generate the track for the next pending instrument
    ///
    /// Returns `Ok(None)` when there is no plan, every instrument already has
    /// a track, or another request is in flight. A failed request puts the
    /// instrument back to `pending` so it can be retried.
    pub async fn generate_next_track(&self) -> Result<Option<Track>, SequencerError> {
        let Some(mut flight) = InFlight::begin(self) else {
            log::debug!("Track request ignored: a request is already in flight");
            return Ok(None);
        };

        let (index, target, request) = {
            let mut guard = self.lock();
            let state = &mut *guard;
            let Some(plan) = state.plan.as_mut() else {
                return Ok(None);
            };
            let index = state.tracks.len();
            let Some(instrument) = plan.instrumentation.get_mut(index) else {
                return Ok(None);
            };

            instrument.status = InstrumentStatus::Generating;
            let target = instrument.clone();
            flight.track(index);

            state.log.append(ConversationEntry::assistant(format!(
                "Generating track for **{}**...",
                target.instrument_name
            )));
            let request = TrackRequest {
                plan: plan.clone(),
                existing_tracks: state.tracks.clone(),
                instrument_to_generate: target.clone(),
            };
            self.publish_from(state);
            (index, target, request)
        };
        log::info!("Requesting track #{} for '{}'", index, target.instrument_name);

        let result = self
            .call(self.backend.generate_track(request))
            .await
            .and_then(|track| {
                validate_track(&track)
                    .map(|_| track)
                    .map_err(BackendError::InvalidTrack)
            });

        let mut guard = self.lock();
        let state = &mut *guard;
        let instrument = state
            .plan
            .as_mut()
            .and_then(|plan| plan.instrumentation.get_mut(index));

        match result {
            Ok(mut track) => {
                if track.instrument_name != target.instrument_name {
                    log::warn!(
                        "Backend returned '{}' for '{}'; storing it as '{}'",
                        track.instrument_name,
                        target.instrument_name,
                        target.instrument_name
                    );
                    track.instrument_name = target.instrument_name.clone();
                }
                if let Some(instrument) = instrument {
                    instrument.status = InstrumentStatus::Generated;
                }
                flight.settle();
                let progress = state
                    .plan
                    .as_ref()
                    .map(|plan| {
                        (
                            plan.count_with_status(InstrumentStatus::Generated),
                            plan.instrumentation.len(),
                        )
                    })
                    .unwrap_or_default();

                state.tracks.push(track.clone());
                state.log.append(ConversationEntry::assistant(format!(
                    "Successfully generated track for **{}**.",
                    track.instrument_name
                )));
                log::info!(
                    "Stored track #{} for '{}' ({}/{} generated)",
                    index,
                    track.instrument_name,
                    progress.0,
                    progress.1
                );
                Ok(Some(track))
            }
            Err(e) => {
                if let Some(instrument) = instrument {
                    instrument.status = InstrumentStatus::Pending;
                }
                flight.settle();

                log::error!(
                    "Track request for '{}' failed, status rolled back: {}",
                    target.instrument_name,
                    e
                );
                state.log.append(ConversationEntry::assistant(format!(
                    "Failed to generate track for **{}**: {}",
                    target.instrument_name, e
                )));
                Err(e.into())
            }
        }
    }

    async fn call<T, F>(&self, request: F) -> Result<T, BackendError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| BackendError::Timeout(limit))?,
            None => request.await,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Composition> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn snapshot_of(&self, state: &Composition) -> CompositionSnapshot {
        CompositionSnapshot {
            plan: state.plan.clone(),
            tracks: state.tracks.clone(),
            entries: state.log.read_all().to_vec(),
            busy: self.is_busy(),
        }
    }

    fn publish_from(&self, state: &Composition) {
        self.updates.send_replace(self.snapshot_of(state));
    }
}

/// Holds the busy flag for the duration of one request
///
/// Dropping it clears the flag and, if a track request was still
/// unresolved, puts that instrument back to `pending`. This also covers a
/// request future that is dropped before completing.
struct InFlight<'a, B: GenerationBackend> {
    sequencer: &'a Sequencer<B>,
    target: Option<usize>,
}

impl<'a, B: GenerationBackend> InFlight<'a, B> {
    fn begin(sequencer: &'a Sequencer<B>) -> Option<Self> {
        sequencer
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                sequencer,
                target: None,
            })
    }

    fn track(&mut self, index: usize) {
        self.target = Some(index);
    }

    fn settle(&mut self) {
        self.target = None;
    }
}

impl<B: GenerationBackend> Drop for InFlight<'_, B> {
    fn drop(&mut self) {
        let mut state = self.sequencer.lock();
        if let Some(index) = self.target.take() {
            let abandoned = state
                .plan
                .as_mut()
                .and_then(|plan| plan.instrumentation.get_mut(index))
                .filter(|instrument| instrument.status == InstrumentStatus::Generating);
            if let Some(instrument) = abandoned {
                log::warn!(
                    "Track request for '{}' abandoned, status rolled back",
                    instrument.instrument_name
                );
                instrument.status = InstrumentStatus::Pending;
            }
        }
        self.sequencer.busy.store(false, Ordering::Release);
        self.sequencer.publish_from(&state);
    }
}
