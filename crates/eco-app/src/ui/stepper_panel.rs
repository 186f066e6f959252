use egui::{Color32, Context, RichText};
use eco_core::Operation;
use crate::events::UiEvent;
use crate::state::Screen;
use crate::ui::widgets::{self, StepsEditor};
use crate::ui::{UiComponent, UiContext};

const SCREEN: Screen = Screen::Stepper;

/// Upload a photo, then drive each step by hand. Suggestions can be edited
/// before the video is generated.
#[derive(Default)]
pub struct StepperPanel {
    editor: StepsEditor,
}

impl UiComponent for StepperPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        if ui_ctx.screen != SCREEN {
            return;
        }

        let snapshot = ui_ctx.snapshot(SCREEN);
        self.editor.sync(snapshot);

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.heading("Upload & Steps");
                widgets::step_indicator(ui, snapshot);
                ui.separator();

                // === Upload ===
                ui.horizontal(|ui| {
                    if ui.add_enabled(!snapshot.is_busy(), egui::Button::new("📂 Choose Image")).clicked() {
                        ui_ctx.send_event(UiEvent::PickImage);
                    }
                    match &ui_ctx.selected_image {
                        Some(path) => ui.label(path.display().to_string()),
                        None => ui.label(RichText::new("No image selected").color(Color32::GRAY)),
                    };
                });
                ui.add_space(8.0);

                // === Step 1 ===
                let detect = ui.add_enabled(
                    snapshot.can(Operation::Capture),
                    egui::Button::new(RichText::new("1. Detect Waste Material").size(14.0))
                        .min_size(egui::vec2(ui.available_width(), 30.0)),
                );
                if detect.clicked() {
                    ui_ctx.send_event(UiEvent::Detect(SCREEN));
                }

                if let Some(detection) = &snapshot.detection {
                    ui.add_space(5.0);
                    widgets::detection_card(ui, detection);
                }
                ui.add_space(8.0);

                // === Step 2 ===
                let suggest = ui.add_enabled(
                    snapshot.can(Operation::Suggest),
                    egui::Button::new(RichText::new("2. Get Reuse Suggestions").size(14.0))
                        .min_size(egui::vec2(ui.available_width(), 30.0)),
                );
                if suggest.clicked() {
                    ui_ctx.send_event(UiEvent::Suggest(SCREEN));
                }

                if snapshot.suggestions.is_some() {
                    ui.add_space(5.0);
                    ui.label(RichText::new("♻ Reuse steps (edit freely)").strong());
                    self.editor.show(ui, !snapshot.is_busy());
                }
                ui.add_space(8.0);

                // === Step 3 ===
                let generate = ui.add_enabled(
                    snapshot.can(Operation::Generate),
                    egui::Button::new(RichText::new("3. Generate Instructional Video").size(14.0))
                        .min_size(egui::vec2(ui.available_width(), 30.0)),
                );
                if generate.clicked() {
                    ui_ctx.send_event(UiEvent::Generate {
                        screen: SCREEN,
                        steps: self.editor.text().to_string(),
                    });
                }

                ui.add_space(8.0);
                widgets::busy_banner(ui, snapshot);
                widgets::error_banner(ui, snapshot);

                if let Some(media) = &snapshot.media {
                    ui.add_space(8.0);
                    widgets::media_card(ui, ui_ctx, SCREEN, media);
                }

                ui.add_space(8.0);
                if ui.button("🔄 Start Over").clicked() {
                    ui_ctx.send_event(UiEvent::Reset(SCREEN));
                }
            });
        });
    }
}
