mod auto_flow_panel;
mod feed_panel;
mod scanner_panel;
mod stepper_panel;
mod top_panel;
mod widgets;

pub use auto_flow_panel::AutoFlowPanel;
pub use feed_panel::FeedPanel;
pub use scanner_panel::ScannerPanel;
pub use stepper_panel::StepperPanel;
pub use top_panel::TopPanel;

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use egui::Context;
use tracing::warn;
use eco_core::WorkflowSnapshot;
use crate::events::{AppEvent, EcoEvent, UiEvent};
use crate::state::Screen;

/// Everything the panels read while drawing a frame.
pub struct UiContext {
    pub screen: Screen,
    pub stepper: WorkflowSnapshot,
    pub scanner: WorkflowSnapshot,
    pub auto_flow: WorkflowSnapshot,
    pub base_url: String,
    pub selected_image: Option<PathBuf>,
    pub feed_running: bool,
    pub status: Option<String>,
    pub saved_video: Option<PathBuf>,
    sender: Sender<EcoEvent>,
}

impl UiContext {
    pub fn new(snapshot: WorkflowSnapshot, base_url: String, sender: Sender<EcoEvent>) -> Self {
        Self {
            screen: Screen::default(),
            stepper: snapshot.clone(),
            scanner: snapshot.clone(),
            auto_flow: snapshot,
            base_url,
            selected_image: None,
            feed_running: false,
            status: None,
            saved_video: None,
            sender,
        }
    }

    pub fn snapshot(&self, screen: Screen) -> &WorkflowSnapshot {
        match screen {
            Screen::Stepper => &self.stepper,
            Screen::Scanner => &self.scanner,
            Screen::AutoFlow => &self.auto_flow,
        }
    }

    pub fn set_snapshot(&mut self, screen: Screen, snapshot: WorkflowSnapshot) {
        match screen {
            Screen::Stepper => self.stepper = snapshot,
            Screen::Scanner => self.scanner = snapshot,
            Screen::AutoFlow => self.auto_flow = snapshot,
        }
    }

    pub fn send_event(&self, event: UiEvent) {
        if self.sender.send(EcoEvent::Ui(event)).is_err() {
            warn!("event loop gone, dropping ui event");
        }
    }

    pub fn on_app_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Status(message) => self.status = Some(message.clone()),
            AppEvent::ImageSelected(path) => self.selected_image = Some(path.clone()),
            AppEvent::FeedStarted => {
                self.feed_running = true;
                self.status = Some("Camera on".into());
            }
            AppEvent::FeedStopped => {
                self.feed_running = false;
                self.status = Some("Camera off".into());
            }
            AppEvent::VideoSaved(path) => {
                self.status = Some(format!("Saved {}", path.display()));
                self.saved_video = Some(path.clone());
            }
            AppEvent::Failed(message) => self.status = Some(format!("❌ {message}")),
            AppEvent::FeedFrame(_) => {}
        }
    }
}

pub struct UiState {
    components: Vec<Box<dyn UiComponent>>,
    pub(crate) ui_ctx: UiContext,
}

impl UiState {
    pub fn new(ui_ctx: UiContext) -> Self {
        Self {
            components: Vec::new(),
            ui_ctx,
        }
    }

    pub fn draw(&mut self, ctx: &Context) {
        for component in self.components.iter_mut() {
            component.show(ctx, &self.ui_ctx);
        }
    }

    pub fn add_component(&mut self, component: Box<dyn UiComponent>) {
        self.components.push(component);
    }

    pub fn on_app_event(&mut self, event: &AppEvent) {
        self.ui_ctx.on_app_event(event);
        for component in self.components.iter_mut() {
            component.on_app_event(event);
        }
    }
}

/// Side and top panels must be added before the central ones.
pub trait UiComponent {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext);

    fn on_app_event(&mut self, _event: &AppEvent) {}
}
