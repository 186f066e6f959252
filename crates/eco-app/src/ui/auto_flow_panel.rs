use egui::{Color32, Context, RichText};
use eco_core::{Operation, Stage};
use crate::events::UiEvent;
use crate::state::Screen;
use crate::ui::widgets;
use crate::ui::{UiComponent, UiContext};

const SCREEN: Screen = Screen::AutoFlow;

#[derive(Default)]
pub struct AutoFlowPanel {}

impl UiComponent for AutoFlowPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        if ui_ctx.screen != SCREEN {
            return;
        }

        let snapshot = ui_ctx.snapshot(SCREEN);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.heading("One-Click Upcycling");
                ui.label(
                    RichText::new("Scan an item and get a how-to video in one go.")
                        .color(Color32::LIGHT_BLUE),
                );
                ui.add_space(10.0);

                let idle = snapshot.stage == Stage::Idle || snapshot.last_error.is_some();
                let start = ui.add_enabled(
                    idle && ui_ctx.feed_running && snapshot.can(Operation::Capture),
                    egui::Button::new(RichText::new("⚡ Scan & Create Video").size(18.0))
                        .min_size(egui::vec2(260.0, 44.0)),
                );
                if start.clicked() {
                    ui_ctx.send_event(UiEvent::Detect(SCREEN));
                }
                if !ui_ctx.feed_running {
                    ui.label(RichText::new("Start the camera first.").small().color(Color32::GRAY));
                }
            });

            ui.add_space(10.0);
            widgets::step_indicator(ui, snapshot);
            ui.add_space(5.0);
            widgets::busy_banner(ui, snapshot);
            widgets::error_banner(ui, snapshot);

            if let Some(detection) = &snapshot.detection {
                ui.add_space(5.0);
                widgets::detection_card(ui, detection);
            }

            if let Some(suggestions) = &snapshot.suggestions {
                ui.add_space(5.0);
                widgets::suggestion_list(ui, suggestions);
            }

            if let Some(media) = &snapshot.media {
                ui.add_space(8.0);
                widgets::media_card(ui, ui_ctx, SCREEN, media);
            }

            if snapshot.stage != Stage::Idle || snapshot.last_error.is_some() {
                ui.add_space(10.0);
                if ui.button("🔄 Try Again").clicked() {
                    ui_ctx.send_event(UiEvent::Reset(SCREEN));
                }
            }
        });
    }
}
