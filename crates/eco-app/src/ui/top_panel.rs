use egui::{Color32, Context, RichText};
use crate::events::UiEvent;
use crate::state::Screen;
use crate::ui::{UiComponent, UiContext};

#[derive(Default)]
pub struct TopPanel {}

impl UiComponent for TopPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("♻ eco-retail");
                ui.separator();

                for screen in Screen::all() {
                    let busy = ui_ctx.snapshot(screen).is_busy();
                    let label = if busy {
                        format!("{} ⏳", screen.label())
                    } else {
                        screen.label().to_string()
                    };

                    if ui.selectable_label(ui_ctx.screen == screen, label).clicked() {
                        ui_ctx.send_event(UiEvent::SelectScreen(screen));
                    }
                }

                ui.separator();
                ui.label(RichText::new("Status:").color(Color32::LIGHT_BLUE));
                ui.label(ui_ctx.status.as_deref().unwrap_or("Ready"));
            });
        });
    }
}
