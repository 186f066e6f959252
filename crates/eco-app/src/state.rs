use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Duration;
use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use eco_core::{CaptureSource, WorkflowController, WorkflowError, WorkflowPolicy, WorkflowSnapshot};
use crate::backend::{download_video, BackendConfig, HttpBackend, LiveFeed};
use crate::capture::{FeedCapture, FileCapture};
use crate::events::{AppEvent, EcoEvent, UiEvent};

const FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// The three ways of driving a workflow. Each owns its own controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Upload a photo and step through by hand.
    #[default]
    Stepper,
    /// Live camera, suggestions follow detection automatically.
    Scanner,
    /// Live camera, one button from capture to video.
    AutoFlow,
}

impl Screen {
    pub fn all() -> [Screen; 3] {
        [Self::Stepper, Self::Scanner, Self::AutoFlow]
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Stepper => "📤 Upload & Steps",
            Self::Scanner => "📷 Waste Scanner",
            Self::AutoFlow => "⚡ One-Click",
        }
    }

    pub fn uses_feed(&self) -> bool {
        matches!(self, Self::Scanner | Self::AutoFlow)
    }

    pub fn policy(&self) -> WorkflowPolicy {
        match self {
            Self::Stepper => WorkflowPolicy::stepper(),
            Self::Scanner => WorkflowPolicy::scanner(),
            Self::AutoFlow => WorkflowPolicy::full_auto(),
        }
    }
}

pub struct Session {
    pub controller: Arc<WorkflowController>,
    pub updates: watch::Receiver<WorkflowSnapshot>,
}

impl Session {
    fn new(backend: Arc<HttpBackend>, capture: Arc<dyn CaptureSource>, screen: Screen, ctx: &egui::Context, runtime: &Handle) -> Self {
        let controller = Arc::new(WorkflowController::new(backend, capture, screen.policy()));
        let updates = controller.subscribe();

        // Repaint whenever a background transition lands.
        let mut changes = controller.subscribe();
        let ctx = ctx.clone();
        runtime.spawn(async move {
            while changes.changed().await.is_ok() {
                ctx.request_repaint();
            }
        });

        Self { controller, updates }
    }
}

pub struct AppState {
    runtime: Handle,
    events: Sender<EcoEvent>,
    egui_ctx: egui::Context,

    backend: Arc<HttpBackend>,
    feed: LiveFeed,
    file_capture: Arc<FileCapture>,

    stepper: Session,
    scanner: Session,
    auto_flow: Session,

    preview: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(config: BackendConfig, runtime: Handle, events: Sender<EcoEvent>, egui_ctx: egui::Context) -> Self {
        let backend = Arc::new(HttpBackend::new(config));
        let feed = LiveFeed::new(backend.client().clone(), backend.config().clone());
        let file_capture = Arc::new(FileCapture::default());
        let feed_capture: Arc<dyn CaptureSource> = Arc::new(FeedCapture::new(feed.clone(), FRAME_TIMEOUT));

        let stepper = Session::new(backend.clone(), file_capture.clone(), Screen::Stepper, &egui_ctx, &runtime);
        let scanner = Session::new(backend.clone(), feed_capture.clone(), Screen::Scanner, &egui_ctx, &runtime);
        let auto_flow = Session::new(backend.clone(), feed_capture, Screen::AutoFlow, &egui_ctx, &runtime);

        Self {
            runtime,
            events,
            egui_ctx,
            backend,
            feed,
            file_capture,
            stepper,
            scanner,
            auto_flow,
            preview: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.backend.config().base_url
    }

    pub fn session(&self, screen: Screen) -> &Session {
        match screen {
            Screen::Stepper => &self.stepper,
            Screen::Scanner => &self.scanner,
            Screen::AutoFlow => &self.auto_flow,
        }
    }

    fn push_event(&self, event: AppEvent) {
        push(&self.events, &self.egui_ctx, event);
    }

    pub fn on_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::SelectScreen(_) => {}
            UiEvent::PickImage => self.pick_image(),
            UiEvent::Detect(screen) => {
                let controller = self.session(screen).controller.clone();
                self.runtime.spawn(async move {
                    match controller.capture_and_advance().await {
                        Ok(stage) => debug!(?screen, %stage, "run advanced"),
                        Err(e) => log_rejection(screen, &e),
                    }
                });
            }
            UiEvent::Suggest(screen) => {
                let controller = self.session(screen).controller.clone();
                let label = controller
                    .snapshot()
                    .detection
                    .map(|detection| detection.label)
                    .unwrap_or_default();
                self.runtime.spawn(async move {
                    if let Err(e) = controller.suggest(&label).await {
                        log_rejection(screen, &e);
                    }
                });
            }
            UiEvent::Generate { screen, steps } => {
                let controller = self.session(screen).controller.clone();
                self.runtime.spawn(async move {
                    let result = match controller.edit_suggestions_text(&steps) {
                        Ok(()) => controller.generate_from_suggestions().await.map(|_| ()),
                        Err(e) => Err(e),
                    };
                    if let Err(e) = result {
                        log_rejection(screen, &e);
                    }
                });
            }
            UiEvent::Reset(screen) => {
                self.session(screen).controller.reset();
            }
            UiEvent::DownloadVideo(screen) => self.download(screen),
            UiEvent::StartFeed => self.start_feed(),
            UiEvent::StopFeed => self.stop_feed(),
        }
    }

    fn pick_image(&self) {
        let picked = rfd::FileDialog::new()
            .set_title("Choose a photo of the waste item")
            .add_filter("Images", &["jpg", "jpeg", "png", "webp", "bmp", "gif"])
            .pick_file();

        if let Some(path) = picked {
            info!("selected image {}", path.display());
            self.file_capture.select(path.clone());
            self.push_event(AppEvent::ImageSelected(path));
        }
    }

    fn download(&self, screen: Screen) {
        let Some(media) = self.session(screen).controller.snapshot().media else {
            self.push_event(AppEvent::Failed("No video to download yet.".into()));
            return;
        };

        let default_dir = self.backend.config().download_dir.clone();
        let Some(dir) = rfd::FileDialog::new()
            .set_title("Save output_final.mp4 to")
            .set_directory(&default_dir)
            .pick_folder()
        else {
            return;
        };

        let client = self.backend.client().clone();
        let base_url = self.base_url().to_string();
        let events = self.events.clone();
        let ctx = self.egui_ctx.clone();

        self.runtime.spawn(async move {
            push(&events, &ctx, AppEvent::Status("Downloading video...".into()));
            let event = match download_video(&client, &base_url, &media, &dir).await {
                Ok(path) => AppEvent::VideoSaved(path),
                Err(e) => AppEvent::Failed(e.to_string()),
            };
            push(&events, &ctx, event);
        });
    }

    fn start_feed(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.abort();
        }

        let feed = self.feed.clone();
        let events = self.events.clone();
        let ctx = self.egui_ctx.clone();

        self.preview = Some(self.runtime.spawn(async move {
            if let Err(e) = feed.start().await {
                push(&events, &ctx, AppEvent::Failed(format!("Could not start camera: {e}")));
                return;
            }
            push(&events, &ctx, AppEvent::FeedStarted);

            match feed.frames().await {
                Ok(mut frames) => {
                    while let Some(frame) = frames.next().await {
                        match frame.map(|bytes| decode_frame(&bytes)) {
                            Ok(Some(image)) => push(&events, &ctx, AppEvent::FeedFrame(image)),
                            Ok(None) => {}
                            Err(e) => {
                                warn!("live feed interrupted: {e}");
                                break;
                            }
                        }
                    }
                }
                Err(e) => push(&events, &ctx, AppEvent::Failed(format!("No camera stream: {e}"))),
            }

            push(&events, &ctx, AppEvent::FeedStopped);
        }));
    }

    fn stop_feed(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.abort();
        }

        let feed = self.feed.clone();
        let events = self.events.clone();
        let ctx = self.egui_ctx.clone();

        self.runtime.spawn(async move {
            let event = match feed.stop().await {
                Ok(()) => AppEvent::FeedStopped,
                Err(e) => AppEvent::Failed(format!("Could not stop camera: {e}")),
            };
            push(&events, &ctx, event);
        });
    }

    /// Whether any controller still waits for the backend.
    pub fn is_busy(&self) -> bool {
        Screen::all()
            .iter()
            .any(|screen| self.session(*screen).updates.borrow().is_busy())
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.abort();
        }
    }
}

fn push(events: &Sender<EcoEvent>, ctx: &egui::Context, event: AppEvent) {
    if events.send(EcoEvent::App(event)).is_ok() {
        ctx.request_repaint();
    }
}

/// Recorded failures already reach the screen through the snapshot; the rest
/// are only worth a log line.
fn log_rejection(screen: Screen, error: &WorkflowError) {
    if error.is_recorded() {
        debug!(?screen, "{error}");
    } else {
        info!(?screen, "request ignored: {error}");
    }
}

fn decode_frame(bytes: &[u8]) -> Option<egui::ColorImage> {
    match image::load_from_memory(bytes) {
        Ok(frame) => {
            let rgba = frame.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            Some(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
        }
        Err(e) => {
            debug!("skipping undecodable frame: {e}");
            None
        }
    }
}
