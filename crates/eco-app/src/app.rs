use std::sync::mpsc::{self, Receiver};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::info;
use crate::backend::BackendConfig;
use crate::events::{EcoEvent, UiEvent};
use crate::state::{AppState, Screen};
use crate::ui::{self, UiContext, UiState};

pub struct App {
    state: AppState,
    ui: UiState,
    events: Receiver<EcoEvent>,
}

impl App {
    pub fn new(config: BackendConfig, runtime: Handle, egui_ctx: egui::Context) -> Self {
        let (sender, events) = mpsc::channel();

        let state = AppState::new(config, runtime, sender.clone(), egui_ctx);
        let snapshot = state.session(Screen::Stepper).controller.snapshot();

        let mut ui_state = UiState::new(UiContext::new(snapshot, state.base_url().to_string(), sender));
        ui_state.add_component(Box::new(ui::TopPanel::default()));
        ui_state.add_component(Box::new(ui::FeedPanel::default()));
        ui_state.add_component(Box::new(ui::StepperPanel::default()));
        ui_state.add_component(Box::new(ui::ScannerPanel::default()));
        ui_state.add_component(Box::new(ui::AutoFlowPanel::default()));

        Self {
            state,
            ui: ui_state,
            events,
        }
    }

    pub fn start_gui(config: BackendConfig) -> anyhow::Result<()> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size(egui::vec2(1100.0, 720.0))
                .with_title("eco-retail waste scanner"),
            ..Default::default()
        };

        let runtime = Handle::current();
        info!("connecting to backend at {}", config.base_url);

        eframe::run_native(
            "eco-retail waste scanner",
            options,
            Box::new(move |cc| Ok(Box::new(App::new(config, runtime, cc.egui_ctx.clone())))),
        )
        .map_err(|e| anyhow::anyhow!("window closed with an error: {e}"))
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                EcoEvent::Ui(UiEvent::SelectScreen(screen)) => self.ui.ui_ctx.screen = screen,
                EcoEvent::Ui(event) => self.state.on_ui_event(event),
                EcoEvent::App(event) => self.ui.on_app_event(&event),
            }
        }
    }

    fn refresh_snapshots(&mut self) {
        for screen in Screen::all() {
            let snapshot = self.state.session(screen).updates.borrow().clone();
            self.ui.ui_ctx.set_snapshot(screen, snapshot);
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.refresh_snapshots();

        self.ui.draw(ctx);

        // Keep spinners moving while a request is outstanding.
        if self.state.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
