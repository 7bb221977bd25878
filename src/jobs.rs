//! Background render jobs with an append-only event stream per job.
//!
//! `submit` returns at once with a [`JobId`]; the render runs on a spawned task and
//! records its progress as [`JobEvent`]s. A subscriber first receives every event
//! recorded so far, then live events until `Complete` or `Error`. Dropping a subscriber
//! does not cancel the job.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::errors::{ErrorReport, Phase};
use crate::export::{Exporter, RenderStep, RenderedArtifact};
use crate::models::deck::{DeckRequest, ExportFormat};
use crate::persistence::{spawn_persist, ArtifactStore, PersistRecord};

const EVENT_BUFFER: usize = 64;
/// Finished jobs kept for replay and artifact retrieval before the oldest is evicted.
pub const DEFAULT_RETAINED_JOBS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        JobId(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry of a job's event stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobEvent {
    Queued,
    Progress { step: RenderStep, percent: u8 },
    #[serde(rename_all = "camelCase")]
    Complete { filename: String, bytes_len: usize },
    Error { phase: Phase, message: String },
}

impl JobEvent {
    /// `Complete` and `Error` end a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobEvent::Complete { .. } | JobEvent::Error { .. })
    }
}

struct JobState {
    events: Vec<JobEvent>,
    sender: broadcast::Sender<JobEvent>,
    artifact: Option<RenderedArtifact>,
}

struct Jobs {
    states: HashMap<JobId, JobState>,
    // Terminal jobs, oldest first.
    finished: VecDeque<JobId>,
    retain: usize,
}

impl Jobs {
    fn remove(&mut self, id: JobId) -> Option<JobState> {
        self.finished.retain(|finished| *finished != id);
        self.states.remove(&id)
    }

    fn evict_over_limit(&mut self) {
        while self.finished.len() > self.retain {
            if let Some(oldest) = self.finished.pop_front() {
                debug!("Job {}: evicted", oldest);
                self.states.remove(&oldest);
            }
        }
    }
}

struct JobTable {
    jobs: Mutex<Jobs>,
}

impl JobTable {
    fn new(retain: usize) -> Self {
        JobTable {
            jobs: Mutex::new(Jobs {
                states: HashMap::new(),
                finished: VecDeque::new(),
                retain,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Jobs> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create(&self, id: JobId) {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        self.lock().states.insert(
            id,
            JobState {
                events: Vec::new(),
                sender,
                artifact: None,
            },
        );
    }

    fn record(&self, id: JobId, event: JobEvent) {
        let mut jobs = self.lock();
        let Some(job) = jobs.states.get_mut(&id) else {
            return;
        };
        debug!("Job {}: {:?}", id, event);
        let terminal = event.is_terminal();
        job.events.push(event.clone());
        // No live subscribers is fine; the event is kept for replay.
        let _ = job.sender.send(event);
        if terminal {
            jobs.finished.push_back(id);
            jobs.evict_over_limit();
        }
    }

    fn finish(&self, id: JobId, artifact: RenderedArtifact) {
        let event = JobEvent::Complete {
            filename: artifact.filename.clone(),
            bytes_len: artifact.bytes.len(),
        };
        if let Some(job) = self.lock().states.get_mut(&id) {
            job.artifact = Some(artifact);
        }
        self.record(id, event);
    }
}

/// Replays recorded events, then follows live ones until a terminal event.
pub struct JobStream {
    replay: VecDeque<JobEvent>,
    receiver: broadcast::Receiver<JobEvent>,
    done: bool,
}

impl JobStream {
    /// The next event, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<JobEvent> {
        if self.done {
            return None;
        }
        let event = match self.replay.pop_front() {
            Some(event) => event,
            None => loop {
                match self.receiver.recv().await {
                    Ok(event) => break event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Job subscriber lagged; {} event(s) skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.done = true;
                        return None;
                    }
                }
            },
        };
        self.done = event.is_terminal();
        Some(event)
    }

    /// Drains the stream into a vector.
    pub async fn collect(mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Runs renders in the background and keeps their event streams and artifacts.
#[derive(Clone)]
pub struct JobRegistry {
    exporter: Arc<Exporter>,
    store: Option<Arc<dyn ArtifactStore>>,
    table: Arc<JobTable>,
}

impl JobRegistry {
    pub fn new(exporter: Exporter) -> Self {
        JobRegistry {
            exporter: Arc::new(exporter),
            store: None,
            table: Arc::new(JobTable::new(DEFAULT_RETAINED_JOBS)),
        }
    }

    /// Keeps at most `retain` finished jobs; older ones are evicted together with their
    /// artifacts. Call before submitting work.
    pub fn with_retention(mut self, retain: usize) -> Self {
        self.table = Arc::new(JobTable::new(retain));
        self
    }

    /// Also persists every completed artifact to `store`.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Starts rendering `request` and returns its id immediately.
    pub fn submit(&self, request: DeckRequest, format: ExportFormat) -> JobId {
        self.spawn(request, format).0
    }

    /// Like [`submit`](Self::submit), also returning the task handle.
    pub fn spawn(&self, request: DeckRequest, format: ExportFormat) -> (JobId, JoinHandle<()>) {
        let id = JobId::new();
        self.table.create(id);
        self.table.record(id, JobEvent::Queued);
        info!("Job {}: queued {} render of '{}'", id, format, request.topic);

        let exporter = Arc::clone(&self.exporter);
        let store = self.store.clone();
        let table = Arc::clone(&self.table);
        let handle = tokio::spawn(async move {
            let progress_table = Arc::clone(&table);
            let result = exporter
                .render_with_progress(&request, format, move |step| {
                    progress_table.record(
                        id,
                        JobEvent::Progress {
                            step,
                            percent: step.percent(),
                        },
                    )
                })
                .await;
            match result {
                Ok(artifact) => {
                    if let Some(store) = store {
                        spawn_persist(store, PersistRecord::new(&request, &artifact));
                    }
                    info!("Job {}: finished {}", id, artifact.filename);
                    table.finish(id, artifact);
                }
                Err(e) => {
                    warn!("Job {}: failed: {}", id, e);
                    let report = ErrorReport::from(&e);
                    table.record(
                        id,
                        JobEvent::Error {
                            phase: report.phase,
                            message: report.message,
                        },
                    );
                }
            }
        });
        (id, handle)
    }

    /// Subscribes to a job's events, starting from the first one. `None` for unknown ids.
    pub fn subscribe(&self, id: JobId) -> Option<JobStream> {
        let jobs = self.table.lock();
        let job = jobs.states.get(&id)?;
        // Replay and receiver are taken under one lock so no event is lost or repeated.
        Some(JobStream {
            replay: job.events.iter().cloned().collect(),
            receiver: job.sender.subscribe(),
            done: false,
        })
    }

    /// The most recent event of a job.
    pub fn status(&self, id: JobId) -> Option<JobEvent> {
        self.table.lock().states.get(&id)?.events.last().cloned()
    }

    /// The finished artifact of a completed job.
    pub fn artifact(&self, id: JobId) -> Option<RenderedArtifact> {
        self.table.lock().states.get(&id)?.artifact.clone()
    }

    /// Removes a completed job and hands over its artifact. Later lookups of `id` find
    /// nothing. Jobs still running or failed are left in place.
    pub fn take_artifact(&self, id: JobId) -> Option<RenderedArtifact> {
        let mut jobs = self.table.lock();
        jobs.states.get(&id)?.artifact.as_ref()?;
        jobs.remove(id)?.artifact
    }

    /// Drops a finished job, failed or not. Returns whether anything was removed.
    pub fn forget(&self, id: JobId) -> bool {
        let mut jobs = self.table.lock();
        let finished = jobs
            .states
            .get(&id)
            .and_then(|job| job.events.last())
            .is_some_and(JobEvent::is_terminal);
        finished && jobs.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::models::slide::Slide;

    fn registry() -> JobRegistry {
        JobRegistry::new(Exporter::new(RenderConfig {
            fetch_images: false,
            ..Default::default()
        }))
    }

    fn request() -> DeckRequest {
        DeckRequest::new("Background", vec![Slide::new("One", vec!["- first".into()])])
    }

    #[tokio::test]
    async fn late_subscribers_replay_the_whole_stream() {
        let registry = registry();
        let (id, handle) = registry.spawn(request(), ExportFormat::VectorPdf);
        handle.await.unwrap();

        let events = registry.subscribe(id).unwrap().collect().await;
        assert_eq!(events.first(), Some(&JobEvent::Queued));
        assert!(matches!(events.last(), Some(JobEvent::Complete { .. })));
        let progress = events
            .iter()
            .filter(|e| matches!(e, JobEvent::Progress { .. }))
            .count();
        assert_eq!(progress, 5);

        let artifact = registry.artifact(id).unwrap();
        assert_eq!(artifact.filename, "Background.pdf");
        assert_eq!(
            registry.status(id),
            Some(JobEvent::Complete {
                filename: "Background.pdf".to_string(),
                bytes_len: artifact.bytes.len(),
            })
        );
    }

    #[tokio::test]
    async fn live_subscribers_see_the_terminal_event() {
        let registry = registry();
        let id = registry.submit(request(), ExportFormat::EditableDocument);
        let events = registry.subscribe(id).unwrap().collect().await;
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn failures_end_the_stream_with_a_phase() {
        let registry = registry();
        let (id, handle) = registry.spawn(DeckRequest::new("", vec![]), ExportFormat::VectorPdf);
        handle.await.unwrap();
        let events = registry.subscribe(id).unwrap().collect().await;
        match events.last() {
            Some(JobEvent::Error { phase, .. }) => assert_eq!(*phase, Phase::OutlineParsing),
            other => panic!("unexpected last event: {:?}", other),
        }
        assert!(registry.artifact(id).is_none());
    }

    #[tokio::test]
    async fn dropping_a_subscriber_does_not_cancel_the_job() {
        let registry = registry();
        let (id, handle) = registry.spawn(request(), ExportFormat::VectorPdf);
        drop(registry.subscribe(id));
        handle.await.unwrap();
        assert!(registry.artifact(id).is_some());
    }

    #[tokio::test]
    async fn taking_the_artifact_releases_the_job() {
        let registry = registry();
        let (id, handle) = registry.spawn(request(), ExportFormat::VectorPdf);
        handle.await.unwrap();

        let artifact = registry.take_artifact(id).unwrap();
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert!(registry.take_artifact(id).is_none());
        assert!(registry.artifact(id).is_none());
        assert!(registry.status(id).is_none());
        assert!(registry.subscribe(id).is_none());
    }

    #[tokio::test]
    async fn failed_jobs_are_kept_until_forgotten() {
        let registry = registry();
        let (id, handle) = registry.spawn(DeckRequest::new("", vec![]), ExportFormat::VectorPdf);
        handle.await.unwrap();

        assert!(registry.take_artifact(id).is_none());
        assert!(registry.subscribe(id).is_some());
        assert!(registry.forget(id));
        assert!(registry.subscribe(id).is_none());
        assert!(!registry.forget(id));
    }

    #[tokio::test]
    async fn oldest_finished_jobs_are_evicted_past_the_limit() {
        let registry = registry().with_retention(2);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let (id, handle) = registry.spawn(request(), ExportFormat::EditableDocument);
            handle.await.unwrap();
            ids.push(id);
        }

        assert!(registry.subscribe(ids[0]).is_none());
        assert!(registry.artifact(ids[0]).is_none());
        assert!(registry.artifact(ids[1]).is_some());
        assert!(registry.artifact(ids[2]).is_some());
    }

    #[test]
    fn unknown_jobs_have_no_stream() {
        let registry = registry();
        assert!(registry.subscribe(JobId::new()).is_none());
        assert!(registry.status(JobId::new()).is_none());
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = JobEvent::Complete {
            filename: "a.pdf".to_string(),
            bytes_len: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["bytesLen"], 10);
    }
}
