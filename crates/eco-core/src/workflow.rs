use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::backend::WasteBackend;
use crate::capture::{CaptureArtifact, CaptureSource};
use crate::detection::Detection;
use crate::error::{Result, WorkflowError};
use crate::media::GeneratedMedia;
use crate::policy::WorkflowPolicy;
use crate::stage::{Operation, Stage};
use crate::suggestion::SuggestionSet;

/// Read-only view of the workflow handed to presentation code.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    /// Changes on every fresh capture and on reset.
    pub run_id: Uuid,
    pub stage: Stage,
    pub detection: Option<Detection>,
    pub suggestions: Option<SuggestionSet>,
    pub media: Option<GeneratedMedia>,
    pub last_error: Option<WorkflowError>,
    pub in_flight: Option<Operation>,
}

impl WorkflowSnapshot {
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn busy_message(&self) -> Option<&str> {
        self.in_flight.as_ref().map(Operation::busy_message)
    }

    pub fn error_message(&self) -> Option<String> {
        self.last_error.as_ref().map(ToString::to_string)
    }

    pub fn active_step(&self) -> usize {
        self.stage.step_index()
    }

    /// Whether the user may start `operation` right now.
    pub fn can(&self, operation: Operation) -> bool {
        !self.is_busy() && operation.allowed_from(self.stage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    id: u64,
    epoch: u64,
    operation: Operation,
}

#[derive(Debug)]
struct WorkflowState {
    run_id: Uuid,
    stage: Stage,
    detection: Option<Detection>,
    suggestions: Option<SuggestionSet>,
    media: Option<GeneratedMedia>,
    last_error: Option<WorkflowError>,
    in_flight: Option<Ticket>,
    /// Bumped by reset; results from an older epoch are discarded.
    epoch: u64,
    issued: u64,
}

impl WorkflowState {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: Stage::Idle,
            detection: None,
            suggestions: None,
            media: None,
            last_error: None,
            in_flight: None,
            epoch: 0,
            issued: 0,
        }
    }

    fn clear_results(&mut self) {
        self.detection = None;
        self.suggestions = None;
        self.media = None;
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            run_id: self.run_id,
            stage: self.stage,
            detection: self.detection.clone(),
            suggestions: self.suggestions.clone(),
            media: self.media.clone(),
            last_error: self.last_error.clone(),
            in_flight: self.in_flight.map(|ticket| ticket.operation),
        }
    }
}

/// Drives one capture → detect → suggest → generate run.
///
/// Only one capture or network call runs at a time; a second one is rejected
/// with [`WorkflowError::OperationInProgress`]. Each transition either commits
/// its result and advances, or records the error and leaves the stage alone.
pub struct WorkflowController {
    backend: Arc<dyn WasteBackend>,
    capture: Arc<dyn CaptureSource>,
    policy: WorkflowPolicy,
    state: Mutex<WorkflowState>,
    updates: watch::Sender<WorkflowSnapshot>,
}

impl WorkflowController {
    pub fn new(
        backend: Arc<dyn WasteBackend>,
        capture: Arc<dyn CaptureSource>,
        policy: WorkflowPolicy,
    ) -> Self {
        let state = WorkflowState::new();
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            backend,
            capture,
            policy,
            state: Mutex::new(state),
            updates,
        }
    }

    pub fn policy(&self) -> WorkflowPolicy {
        self.policy
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.lock().snapshot()
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.updates.subscribe()
    }

    /// Acquires one image from the capture source. A fresh capture always
    /// invalidates the detection, suggestions and media of the previous one.
    pub async fn capture(&self) -> Result<CaptureArtifact> {
        let ticket = self.begin(Operation::Capture)?;

        let outcome = self.capture.acquire().await.map_err(|e| match e {
            WorkflowError::CaptureUnavailable(_) => e,
            other => WorkflowError::CaptureUnavailable(other.to_string()),
        });

        self.finish(ticket, outcome, |state, artifact| {
            state.run_id = Uuid::new_v4();
            state.stage = Stage::Captured;
            state.clear_results();
            debug!(run_id = %state.run_id, size = artifact.len(), mime = artifact.mime_type(), "captured image");
        })
    }

    /// Uploads the captured image. On success the capture source is released.
    pub async fn detect(&self, artifact: &CaptureArtifact) -> Result<Detection> {
        let ticket = self.begin(Operation::Detect)?;

        let outcome = match self.backend.detect(artifact).await {
            Ok(response) => Detection::try_from(response),
            Err(e) => Err(WorkflowError::DetectionFailed(e.to_string())),
        };

        let detection = self.finish(ticket, outcome, |state, detection| {
            state.stage = Stage::Detected;
            state.detection = Some(detection.clone());
            state.suggestions = None;
            state.media = None;
            info!(
                run_id = %state.run_id,
                label = %detection.label,
                confidence = detection.confidence,
                "object detected"
            );
        })?;

        self.capture.release().await;
        Ok(detection)
    }

    /// Requests reuse ideas for `label` and normalises them per the policy.
    pub async fn suggest(&self, label: &str) -> Result<SuggestionSet> {
        let ticket = self.begin(Operation::Suggest)?;

        let outcome = self.request_suggestions(label).await;

        self.finish(ticket, outcome, |state, suggestions| {
            state.stage = Stage::Suggested;
            state.suggestions = Some(suggestions.clone());
            state.media = None;
            info!(run_id = %state.run_id, count = suggestions.len(), "suggestions received");
        })
    }

    async fn request_suggestions(&self, label: &str) -> Result<SuggestionSet> {
        let label = label.trim();
        if label.is_empty() {
            return Err(WorkflowError::SuggestionFailed("No object detected.".into()));
        }

        let payload = self
            .backend
            .suggest(label)
            .await
            .map_err(|e| WorkflowError::SuggestionFailed(e.to_string()))?;

        SuggestionSet::normalize(payload, self.policy.suggestions)
    }

    /// Replaces the suggestions with user-edited steps. Validation is
    /// deferred to [`WorkflowController::generate`]. Refused while any request
    /// is outstanding.
    pub fn edit_suggestions(&self, items: Vec<String>) -> Result<()> {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            debug!(requested = %Operation::EditSuggestions, "rejecting edit during request");
            return Err(WorkflowError::OperationInProgress);
        }
        if !Operation::EditSuggestions.allowed_from(state.stage) {
            return Err(WorkflowError::InvalidTransition {
                operation: Operation::EditSuggestions,
                stage: state.stage,
            });
        }

        state.suggestions = Some(SuggestionSet::edited(items));
        self.publish(&state);
        Ok(())
    }

    /// Same as [`WorkflowController::edit_suggestions`] for a multi-line text box.
    pub fn edit_suggestions_text(&self, text: &str) -> Result<()> {
        let items = SuggestionSet::from_text(text).items().to_vec();
        self.edit_suggestions(items)
    }

    /// Requests an instructional video for `steps`. Every call supersedes the
    /// previously generated media.
    pub async fn generate(&self, steps: &[String]) -> Result<GeneratedMedia> {
        if steps.iter().all(|step| step.trim().is_empty()) {
            self.reject(WorkflowError::EmptySteps);
            return Err(WorkflowError::EmptySteps);
        }

        let ticket = self.begin(Operation::Generate)?;

        let outcome = match self.policy.suggestions.prepare_steps(steps) {
            Ok(steps) => self.request_media(steps).await,
            Err(e) => Err(e),
        };

        self.finish(ticket, outcome, |state, media| {
            state.stage = Stage::VideoReady;
            state.media = Some(media.clone());
            info!(run_id = %state.run_id, video = media.video.as_str(), "video ready");
        })
    }

    async fn request_media(&self, steps: Vec<String>) -> Result<GeneratedMedia> {
        let response = self
            .backend
            .generate_video(&steps)
            .await
            .map_err(|e| WorkflowError::GenerationFailed(e.to_string()))?;

        GeneratedMedia::from_response(response, steps)
    }

    /// Generates from whatever suggestions (possibly edited) are current.
    pub async fn generate_from_suggestions(&self) -> Result<GeneratedMedia> {
        let steps = self
            .snapshot()
            .suggestions
            .map(|set| set.items().to_vec())
            .unwrap_or_default();
        self.generate(&steps).await
    }

    /// Runs detection and whatever stages the policy chains after it.
    /// Returns the stage reached.
    pub async fn detect_and_advance(&self, artifact: &CaptureArtifact) -> Result<Stage> {
        let detection = self.detect(artifact).await?;
        if !self.policy.advance.chains_suggest() {
            return Ok(Stage::Detected);
        }

        let suggestions = self.suggest(&detection.label).await?;
        if !self.policy.advance.chains_generate() {
            return Ok(Stage::Suggested);
        }

        self.generate(suggestions.items()).await?;
        Ok(Stage::VideoReady)
    }

    /// Captures an image, then continues as [`WorkflowController::detect_and_advance`].
    pub async fn capture_and_advance(&self) -> Result<Stage> {
        let artifact = self.capture().await?;
        self.detect_and_advance(&artifact).await
    }

    /// Back to `Idle`, dropping every result at once. A request still in
    /// flight is not aborted, but its result will be discarded.
    pub fn reset(&self) {
        let mut state = self.lock();
        if let Some(abandoned) = state.in_flight.take() {
            debug!(operation = %abandoned.operation, "reset while a request is outstanding");
        }

        state.epoch += 1;
        state.run_id = Uuid::new_v4();
        state.stage = Stage::Idle;
        state.clear_results();
        state.last_error = None;

        info!(run_id = %state.run_id, "workflow reset");
        self.publish(&state);
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &WorkflowState) {
        self.updates.send_replace(state.snapshot());
    }

    /// Claims the in-flight slot for `operation`.
    fn begin(&self, operation: Operation) -> Result<Ticket> {
        let mut state = self.lock();

        if let Some(active) = state.in_flight {
            debug!(requested = %operation, active = %active.operation, "rejecting concurrent operation");
            return Err(WorkflowError::OperationInProgress);
        }

        if !operation.allowed_from(state.stage) {
            return Err(WorkflowError::InvalidTransition {
                operation,
                stage: state.stage,
            });
        }

        state.issued += 1;
        let ticket = Ticket {
            id: state.issued,
            epoch: state.epoch,
            operation,
        };
        state.in_flight = Some(ticket);
        state.last_error = None;

        self.publish(&state);
        Ok(ticket)
    }

    /// Commits or records the outcome of the operation behind `ticket`,
    /// unless a reset happened while it was outstanding.
    fn finish<T>(
        &self,
        ticket: Ticket,
        outcome: Result<T>,
        commit: impl FnOnce(&mut WorkflowState, &T),
    ) -> Result<T> {
        let mut state = self.lock();

        if state.epoch != ticket.epoch {
            debug!(operation = %ticket.operation, "discarding result that arrived after reset");
            return Err(WorkflowError::Superseded);
        }

        if state.in_flight.map(|t| t.id) == Some(ticket.id) {
            state.in_flight = None;
        }

        let result = match outcome {
            Ok(value) => {
                commit(&mut state, &value);
                state.last_error = None;
                Ok(value)
            }
            Err(error) => {
                warn!(run_id = %state.run_id, operation = %ticket.operation, "{error}");
                state.last_error = Some(error.clone());
                Err(error)
            }
        };

        self.publish(&state);
        result
    }

    /// Records a failure that was caught before any request went out.
    fn reject(&self, error: WorkflowError) {
        let mut state = self.lock();
        if state.in_flight.is_some() {
            return;
        }
        warn!(run_id = %state.run_id, "{error}");
        state.last_error = Some(error);
        self.publish(&state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::oneshot;
    use crate::detection::DetectResponse;
    use crate::error::BackendError;
    use crate::media::VideoResponse;
    use crate::suggestion::SuggestPayload;

    type Reply<T> = std::result::Result<T, BackendError>;

    enum Scripted<T> {
        Ready(Reply<T>),
        Pending(oneshot::Receiver<Reply<T>>),
    }

    async fn play<T>(next: Option<Scripted<T>>) -> Reply<T> {
        match next {
            Some(Scripted::Ready(reply)) => reply,
            Some(Scripted::Pending(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(BackendError::Transport("reply dropped".into()))),
            None => Err(BackendError::Transport("no reply scripted".into())),
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        detect: Mutex<VecDeque<Scripted<DetectResponse>>>,
        suggest: Mutex<VecDeque<Scripted<SuggestPayload>>>,
        generate: Mutex<VecDeque<Scripted<VideoResponse>>>,
        generate_calls: AtomicUsize,
        generated_steps: Mutex<Vec<Vec<String>>>,
    }

    impl FakeBackend {
        fn detect_ready(self, reply: Reply<DetectResponse>) -> Self {
            self.detect.lock().unwrap().push_back(Scripted::Ready(reply));
            self
        }

        fn detect_pending(self) -> (Self, oneshot::Sender<Reply<DetectResponse>>) {
            let (tx, rx) = oneshot::channel();
            self.detect.lock().unwrap().push_back(Scripted::Pending(rx));
            (self, tx)
        }

        fn suggest_ready(self, value: serde_json::Value) -> Self {
            let payload = SuggestPayload::from_value(value).unwrap();
            self.suggest.lock().unwrap().push_back(Scripted::Ready(Ok(payload)));
            self
        }

        fn suggest_pending(self) -> (Self, oneshot::Sender<Reply<SuggestPayload>>) {
            let (tx, rx) = oneshot::channel();
            self.suggest.lock().unwrap().push_back(Scripted::Pending(rx));
            (self, tx)
        }

        fn generate_ready(self, reply: Reply<VideoResponse>) -> Self {
            self.generate.lock().unwrap().push_back(Scripted::Ready(reply));
            self
        }

        fn generate_pending(self) -> (Self, oneshot::Sender<Reply<VideoResponse>>) {
            let (tx, rx) = oneshot::channel();
            self.generate.lock().unwrap().push_back(Scripted::Pending(rx));
            (self, tx)
        }
    }

    #[async_trait]
    impl WasteBackend for FakeBackend {
        async fn detect(&self, _artifact: &CaptureArtifact) -> Reply<DetectResponse> {
            let next = self.detect.lock().unwrap().pop_front();
            play(next).await
        }

        async fn suggest(&self, _object: &str) -> Reply<SuggestPayload> {
            let next = self.suggest.lock().unwrap().pop_front();
            play(next).await
        }

        async fn generate_video(&self, steps: &[String]) -> Reply<VideoResponse> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.generated_steps.lock().unwrap().push(steps.to_vec());
            let next = self.generate.lock().unwrap().pop_front();
            play(next).await
        }
    }

    struct FakeCapture {
        available: bool,
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    impl FakeCapture {
        fn new(available: bool) -> Self {
            Self {
                available,
                acquired: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CaptureSource for FakeCapture {
        async fn acquire(&self) -> Result<CaptureArtifact> {
            if !self.available {
                return Err(WorkflowError::CaptureUnavailable("camera permission denied".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            CaptureArtifact::from_image_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0], "capture.jpg")
        }

        async fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn detected(label: &str) -> Reply<DetectResponse> {
        Ok(DetectResponse {
            label: Some(label.into()),
            confidence: Some(0.92),
            bbox: None,
        })
    }

    fn video(name: &str, audio: Option<&str>) -> Reply<VideoResponse> {
        Ok(VideoResponse {
            video: Some(name.into()),
            audio: audio.map(str::to_string),
        })
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    struct Harness {
        controller: Arc<WorkflowController>,
        backend: Arc<FakeBackend>,
        capture: Arc<FakeCapture>,
    }

    fn harness(backend: FakeBackend, policy: WorkflowPolicy) -> Harness {
        let backend = Arc::new(backend);
        let capture = Arc::new(FakeCapture::new(true));
        let controller = Arc::new(WorkflowController::new(backend.clone(), capture.clone(), policy));
        Harness { controller, backend, capture }
    }

    async fn wait_until_busy(controller: &WorkflowController) {
        let mut updates = controller.subscribe();
        updates.wait_for(|snapshot| snapshot.is_busy()).await.unwrap();
    }

    #[tokio::test]
    async fn test_manual_flow_walks_every_stage() {
        let backend = FakeBackend::default()
            .detect_ready(detected("plastic bottle"))
            .suggest_ready(json!({ "suggestions": ["Planter", "Bird feeder", "Pen holder", "Lamp"] }))
            .generate_ready(video("output_final.mp4", Some("narration.mp3")));
        let h = harness(backend, WorkflowPolicy::stepper());
        let c = &h.controller;

        let artifact = c.capture().await.unwrap();
        assert_eq!(c.snapshot().stage, Stage::Captured);

        let detection = c.detect(&artifact).await.unwrap();
        assert_eq!(detection.label, "plastic bottle");
        assert_eq!(c.snapshot().stage, Stage::Detected);
        assert_eq!(h.capture.released.load(Ordering::SeqCst), 1);

        let suggestions = c.suggest(&detection.label).await.unwrap();
        assert_eq!(suggestions.items(), ["Planter", "Bird feeder", "Pen holder"]);

        c.edit_suggestions_text("Planter\n\nBird feeder").unwrap();
        let media = c.generate_from_suggestions().await.unwrap();
        assert_eq!(media.video.as_str(), "output_final.mp4");
        assert_eq!(media.steps, strings(&["Planter", "Bird feeder"]));

        let snapshot = c.snapshot();
        assert_eq!(snapshot.stage, Stage::VideoReady);
        assert!(snapshot.last_error.is_none());
        assert!(!snapshot.is_busy());
        assert_eq!(h.capture.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detect_without_label_stays_captured() {
        let backend = FakeBackend::default()
            .detect_ready(Ok(DetectResponse { label: Some(String::new()), confidence: Some(0.4), bbox: None }))
            .detect_ready(Err(BackendError::Status { status: 500, body: "boom".into() }));
        let h = harness(backend, WorkflowPolicy::stepper());
        let c = &h.controller;
        let artifact = c.capture().await.unwrap();

        for _ in 0..2 {
            let err = c.detect(&artifact).await.unwrap_err();
            assert!(matches!(err, WorkflowError::DetectionFailed(_)));

            let snapshot = c.snapshot();
            assert_eq!(snapshot.stage, Stage::Captured);
            assert!(snapshot.detection.is_none());
            assert_eq!(snapshot.last_error, Some(err));
        }
        assert_eq!(h.capture.released.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_free_text_suggestions_are_split() {
        let backend = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": "1. Wash it\n2. Cut it\n3. Glue it" }));
        let h = harness(backend, WorkflowPolicy::scanner());

        let stage = h.controller.capture_and_advance().await.unwrap();
        assert_eq!(stage, Stage::Suggested);

        let snapshot = h.controller.snapshot();
        let suggestions = snapshot.suggestions.unwrap();
        assert_eq!(suggestions.items(), ["Wash it", "Cut it", "Glue it"]);
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_short_suggestion_lists() {
        let backend = FakeBackend::default()
            .detect_ready(detected("can"))
            .suggest_ready(json!({ "steps": ["Make a lantern", "Make a lantern"] }));
        let h = harness(backend, WorkflowPolicy::full_auto());

        let err = h.controller.capture_and_advance().await.unwrap_err();
        assert_eq!(err, WorkflowError::InsufficientSuggestions { got: 1, required: 3 });

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Detected);
        assert!(snapshot.suggestions.is_none());
        assert_eq!(h.backend.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_auto_reaches_video() {
        let backend = FakeBackend::default()
            .detect_ready(detected("cardboard"))
            .suggest_ready(json!({ "suggestions": ["Box fort", "Organizer", "Cat house", "Coasters"] }))
            .generate_ready(video("v.mp4", None));
        let h = harness(backend, WorkflowPolicy::full_auto());

        let stage = h.controller.capture_and_advance().await.unwrap();
        assert_eq!(stage, Stage::VideoReady);

        let sent = h.backend.generated_steps.lock().unwrap().clone();
        assert_eq!(sent, vec![strings(&["Box fort", "Organizer", "Cat house"])]);

        let media = h.controller.snapshot().media.unwrap();
        assert!(media.audio.is_none());
    }

    #[tokio::test]
    async fn test_empty_steps_never_reach_the_backend() {
        let backend = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": [] }));
        let h = harness(backend, WorkflowPolicy::scanner());
        h.controller.capture_and_advance().await.unwrap();

        assert_eq!(h.controller.generate(&[]).await, Err(WorkflowError::EmptySteps));
        assert_eq!(
            h.controller.generate(&strings(&["", "  "])).await,
            Err(WorkflowError::EmptySteps)
        );
        assert_eq!(h.controller.generate_from_suggestions().await, Err(WorkflowError::EmptySteps));

        assert_eq!(h.backend.generate_calls.load(Ordering::SeqCst), 0);
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Suggested);
        assert_eq!(snapshot.last_error, Some(WorkflowError::EmptySteps));
    }

    #[tokio::test]
    async fn test_generation_without_video_fails_and_keeps_suggestions() {
        let backend = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": ["Vase"] }))
            .generate_ready(Ok(VideoResponse { video: None, audio: Some("a.mp3".into()) }));
        let h = harness(backend, WorkflowPolicy::scanner());
        h.controller.capture_and_advance().await.unwrap();

        let err = h.controller.generate_from_suggestions().await.unwrap_err();
        assert!(matches!(err, WorkflowError::GenerationFailed(_)));

        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Suggested);
        assert!(snapshot.suggestions.is_some());
        assert!(snapshot.media.is_none());
    }

    #[tokio::test]
    async fn test_new_generation_supersedes_media() {
        let backend = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": ["Vase"] }))
            .generate_ready(video("first.mp4", None))
            .generate_ready(video("second.mp4", Some("second.mp3")));
        let h = harness(backend, WorkflowPolicy::scanner());
        h.controller.capture_and_advance().await.unwrap();

        h.controller.generate_from_suggestions().await.unwrap();
        h.controller.edit_suggestions(strings(&["Candle holder"])).unwrap();
        h.controller.generate_from_suggestions().await.unwrap();

        let media = h.controller.snapshot().media.unwrap();
        assert_eq!(media.video.as_str(), "second.mp4");
        assert_eq!(media.steps, strings(&["Candle holder"]));
        assert_eq!(h.backend.generate_calls.load(Ordering::SeqCst), 2);
    }

    /// Walks a stepper controller forward until it sits at `target`.
    async fn advance_to(c: &WorkflowController, target: Stage) {
        if target == Stage::Idle {
            return;
        }
        let artifact = c.capture().await.unwrap();
        if target == Stage::Captured {
            return;
        }
        let detection = c.detect(&artifact).await.unwrap();
        if target == Stage::Detected {
            return;
        }
        c.suggest(&detection.label).await.unwrap();
        if target == Stage::Suggested {
            return;
        }
        c.generate_from_suggestions().await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_from_every_stage() {
        for stage in Stage::all() {
            let backend = FakeBackend::default()
                .detect_ready(detected("jar"))
                .suggest_ready(json!({ "suggestions": ["Vase"] }))
                .generate_ready(video("v.mp4", None));
            let h = harness(backend, WorkflowPolicy::stepper());
            let c = &h.controller;

            advance_to(c, stage).await;
            assert_eq!(c.snapshot().stage, stage);

            let before = c.snapshot().run_id;
            c.reset();
            let snapshot = c.snapshot();
            assert_eq!(snapshot.stage, Stage::Idle, "reset from {stage:?}");
            assert!(snapshot.detection.is_none());
            assert!(snapshot.suggestions.is_none());
            assert!(snapshot.media.is_none());
            assert!(snapshot.last_error.is_none());
            assert!(!snapshot.is_busy());
            assert_ne!(snapshot.run_id, before);

            // A second reset is harmless.
            c.reset();
            assert_eq!(c.snapshot().stage, Stage::Idle);
        }
    }

    #[tokio::test]
    async fn test_late_suggestions_after_reset_are_discarded() {
        let (backend, reply) = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_pending();
        let h = harness(backend, WorkflowPolicy::stepper());
        advance_to(&h.controller, Stage::Detected).await;

        let task = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.suggest("jar").await }
        });
        wait_until_busy(&h.controller).await;

        h.controller.reset();
        let payload = SuggestPayload::from_value(json!({ "suggestions": ["Vase"] })).unwrap();
        reply.send(Ok(payload)).unwrap();

        assert_eq!(task.await.unwrap(), Err(WorkflowError::Superseded));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(snapshot.suggestions.is_none());
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_late_video_after_reset_is_discarded() {
        let (backend, reply) = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": ["Vase"] }))
            .generate_pending();
        let h = harness(backend, WorkflowPolicy::stepper());
        advance_to(&h.controller, Stage::Suggested).await;

        let task = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.generate_from_suggestions().await }
        });
        wait_until_busy(&h.controller).await;

        h.controller.reset();
        reply.send(video("late.mp4", None)).unwrap();

        assert_eq!(task.await.unwrap(), Err(WorkflowError::Superseded));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(snapshot.media.is_none());
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_edit_during_generation_is_rejected() {
        let (backend, reply) = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": ["Vase", "Lamp", "Planter"] }))
            .generate_pending();
        let h = harness(backend, WorkflowPolicy::stepper());
        advance_to(&h.controller, Stage::Suggested).await;

        let task = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.generate_from_suggestions().await }
        });
        wait_until_busy(&h.controller).await;

        let before = h.controller.snapshot();
        assert_eq!(
            h.controller.edit_suggestions_text("Something else"),
            Err(WorkflowError::OperationInProgress)
        );
        assert_eq!(
            h.controller.generate_from_suggestions().await,
            Err(WorkflowError::OperationInProgress)
        );
        assert_eq!(h.controller.snapshot(), before);

        reply.send(video("v.mp4", None)).unwrap();
        let media = task.await.unwrap().unwrap();
        let suggestions = h.controller.snapshot().suggestions.unwrap();
        assert_eq!(media.steps, strings(&["Vase", "Lamp", "Planter"]));
        assert_eq!(suggestions.items(), media.steps.as_slice());
        assert_eq!(h.backend.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_detection_after_reset_is_discarded() {
        let (backend, reply) = FakeBackend::default().detect_pending();
        let h = harness(backend, WorkflowPolicy::stepper());
        let artifact = h.controller.capture().await.unwrap();

        let task = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.detect(&artifact).await }
        });
        wait_until_busy(&h.controller).await;

        h.controller.reset();
        reply.send(detected("bottle")).unwrap();

        assert_eq!(task.await.unwrap(), Err(WorkflowError::Superseded));
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Idle);
        assert!(snapshot.detection.is_none());
        assert!(snapshot.last_error.is_none());
        assert_eq!(h.capture.released.load(Ordering::SeqCst), 0);

        // The slot was freed by the reset, so a new run can start right away.
        h.controller.capture().await.unwrap();
        assert_eq!(h.controller.snapshot().stage, Stage::Captured);
    }

    #[tokio::test]
    async fn test_concurrent_call_rejected_without_side_effects() {
        let (backend, reply) = FakeBackend::default().detect_pending();
        let h = harness(backend, WorkflowPolicy::stepper());
        let artifact = h.controller.capture().await.unwrap();

        let task = tokio::spawn({
            let controller = h.controller.clone();
            async move { controller.detect(&artifact).await }
        });
        wait_until_busy(&h.controller).await;

        let before = h.controller.snapshot();
        assert_eq!(before.in_flight, Some(Operation::Detect));
        assert_eq!(before.busy_message(), Some("Detecting waste..."));

        assert_eq!(h.controller.suggest("bottle").await, Err(WorkflowError::OperationInProgress));
        assert_eq!(h.controller.capture().await.unwrap_err(), WorkflowError::OperationInProgress);
        assert_eq!(h.controller.snapshot(), before);

        reply.send(detected("bottle")).unwrap();
        assert_eq!(task.await.unwrap().unwrap().label, "bottle");
        assert_eq!(h.controller.snapshot().stage, Stage::Detected);
    }

    #[tokio::test]
    async fn test_skipping_a_stage_is_an_invalid_transition() {
        let h = harness(FakeBackend::default(), WorkflowPolicy::stepper());

        let err = h.controller.suggest("bottle").await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InvalidTransition { operation: Operation::Suggest, stage: Stage::Idle }
        );
        let err = h.controller.edit_suggestions(strings(&["a"])).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        let err = h.controller.generate(&strings(&["a"])).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

        assert!(h.controller.snapshot().last_error.is_none());
        assert_eq!(h.backend.generate_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capture_unavailable_is_recorded() {
        let backend = Arc::new(FakeBackend::default());
        let capture = Arc::new(FakeCapture::new(false));
        let controller = WorkflowController::new(backend, capture, WorkflowPolicy::stepper());

        let err = controller.capture().await.unwrap_err();
        assert!(matches!(err, WorkflowError::CaptureUnavailable(_)));

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Idle);
        assert_eq!(snapshot.error_message(), Some(err.to_string()));
    }

    #[tokio::test]
    async fn test_fresh_capture_invalidates_results() {
        let backend = FakeBackend::default()
            .detect_ready(detected("jar"))
            .suggest_ready(json!({ "suggestions": ["Vase"] }));
        let h = harness(backend, WorkflowPolicy::scanner());
        h.controller.capture_and_advance().await.unwrap();
        let first_run = h.controller.snapshot().run_id;

        h.controller.capture().await.unwrap();
        let snapshot = h.controller.snapshot();
        assert_eq!(snapshot.stage, Stage::Captured);
        assert!(snapshot.detection.is_none());
        assert!(snapshot.suggestions.is_none());
        assert_ne!(snapshot.run_id, first_run);
        assert_eq!(h.capture.acquired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_stage_changes() {
        let backend = FakeBackend::default().detect_ready(detected("jar"));
        let h = harness(backend, WorkflowPolicy::stepper());
        let mut updates = h.controller.subscribe();

        let artifact = h.controller.capture().await.unwrap();
        h.controller.detect(&artifact).await.unwrap();

        assert!(updates.has_changed().unwrap());
        let latest = updates.borrow_and_update().clone();
        assert_eq!(latest.stage, Stage::Detected);
        assert!(latest.can(Operation::Suggest));
        assert!(!latest.can(Operation::Generate));
        assert_eq!(latest.active_step(), 1);
    }
}
