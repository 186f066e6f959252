use std::path::PathBuf;
use crate::state::Screen;

#[derive(Debug, Clone)]
pub enum EcoEvent {
    Ui(UiEvent),
    App(AppEvent),
}

/// Requests coming from the widgets.
#[derive(Debug, Clone)]
pub enum UiEvent {
    SelectScreen(Screen),
    PickImage,

    // Workflow
    Detect(Screen),
    Suggest(Screen),
    Generate {
        screen: Screen,
        steps: String,
    },
    Reset(Screen),
    DownloadVideo(Screen),

    // Live feed
    StartFeed,
    StopFeed,
}

/// Notifications from background tasks back to the widgets.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Status(String),
    ImageSelected(PathBuf),
    FeedStarted,
    FeedStopped,
    FeedFrame(egui::ColorImage),
    VideoSaved(PathBuf),
    Failed(String),
}
