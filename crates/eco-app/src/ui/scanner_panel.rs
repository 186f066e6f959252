use egui::{Color32, Context, RichText};
use eco_core::Operation;
use crate::events::UiEvent;
use crate::state::Screen;
use crate::ui::widgets::{self, StepsEditor};
use crate::ui::{UiComponent, UiContext};

const SCREEN: Screen = Screen::Scanner;

/// Scan with the live camera; suggestions arrive right after detection.
#[derive(Default)]
pub struct ScannerPanel {
    editor: StepsEditor,
}

impl UiComponent for ScannerPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        if ui_ctx.screen != SCREEN {
            return;
        }

        let snapshot = ui_ctx.snapshot(SCREEN);
        self.editor.sync(snapshot);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Waste Scanner");
                widgets::step_indicator(ui, snapshot);
                ui.separator();

                if !ui_ctx.feed_running && snapshot.detection.is_none() {
                    ui.label(
                        RichText::new("Start the camera, hold the item in view, then scan.")
                            .color(Color32::LIGHT_BLUE),
                    );
                }

                let scan = ui.add_enabled(
                    ui_ctx.feed_running && snapshot.can(Operation::Capture),
                    egui::Button::new(RichText::new("🔍 Scan Waste").size(16.0))
                        .min_size(egui::vec2(ui.available_width(), 36.0)),
                );
                if scan.clicked() {
                    ui_ctx.send_event(UiEvent::Detect(SCREEN));
                }

                ui.add_space(8.0);
                widgets::busy_banner(ui, snapshot);
                widgets::error_banner(ui, snapshot);

                if let Some(detection) = &snapshot.detection {
                    ui.add_space(5.0);
                    widgets::detection_card(ui, detection);

                    // Suggestions failed or came back short: allow a retry.
                    if snapshot.can(Operation::Suggest) && ui.button("♻ Retry Suggestions").clicked() {
                        ui_ctx.send_event(UiEvent::Suggest(SCREEN));
                    }
                }

                if let Some(suggestions) = &snapshot.suggestions {
                    ui.add_space(8.0);
                    ui.label(RichText::new("♻ Reuse ideas").strong());
                    widgets::suggestion_list(ui, suggestions);

                    ui.collapsing("✏ Edit steps before generating", |ui| {
                        self.editor.show(ui, !snapshot.is_busy());
                    });

                    let generate = ui.add_enabled(
                        snapshot.can(Operation::Generate),
                        egui::Button::new("🎬 Generate Instructional Video"),
                    );
                    if generate.clicked() {
                        ui_ctx.send_event(UiEvent::Generate {
                            screen: SCREEN,
                            steps: self.editor.text().to_string(),
                        });
                    }
                }

                if let Some(media) = &snapshot.media {
                    ui.add_space(8.0);
                    widgets::media_card(ui, ui_ctx, SCREEN, media);
                }

                ui.add_space(8.0);
                if ui.button("🔄 Scan Another Item").clicked() {
                    ui_ctx.send_event(UiEvent::Reset(SCREEN));
                }
            });
        });
    }
}
