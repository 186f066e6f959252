use egui::{Color32, ColorImage, Context, RichText, TextureHandle, TextureOptions};
use crate::events::{AppEvent, UiEvent};
use crate::ui::{UiComponent, UiContext};

/// Camera preview and start/stop controls for the camera-based screens.
#[derive(Default)]
pub struct FeedPanel {
    texture: Option<TextureHandle>,
    pending: Option<ColorImage>,
}

impl FeedPanel {
    fn upload_pending(&mut self, ctx: &Context) {
        let Some(image) = self.pending.take() else {
            return;
        };

        match &mut self.texture {
            Some(texture) => texture.set(image, TextureOptions::default()),
            None => self.texture = Some(ctx.load_texture("live_feed", image, TextureOptions::default())),
        }
    }
}

impl UiComponent for FeedPanel {
    fn show(&mut self, ctx: &Context, ui_ctx: &UiContext) {
        if !ui_ctx.screen.uses_feed() {
            return;
        }

        self.upload_pending(ctx);

        egui::SidePanel::right("feed_panel")
            .default_width(360.0)
            .show(ctx, |ui| {
                ui.heading("📷 Live Camera");
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.add_enabled(!ui_ctx.feed_running, egui::Button::new("▶ Start Camera")).clicked() {
                        ui_ctx.send_event(UiEvent::StartFeed);
                    }
                    if ui.add_enabled(ui_ctx.feed_running, egui::Button::new("⏹ Stop Camera")).clicked() {
                        ui_ctx.send_event(UiEvent::StopFeed);
                    }
                });

                ui.add_space(8.0);

                match (&self.texture, ui_ctx.feed_running) {
                    (Some(texture), true) => {
                        ui.add(egui::Image::from_texture(texture).max_width(ui.available_width()));
                    }
                    (None, true) => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Waiting for the first frame...");
                        });
                    }
                    (_, false) => {
                        ui.label(RichText::new("Camera is off.").color(Color32::GRAY));
                    }
                }

                ui.add_space(8.0);
                ui.label(
                    RichText::new("The camera switches off by itself once an item has been detected.")
                        .small()
                        .color(Color32::GRAY),
                );
            });
    }

    fn on_app_event(&mut self, event: &AppEvent) {
        match event {
            AppEvent::FeedFrame(image) => self.pending = Some(image.clone()),
            AppEvent::FeedStopped => {
                self.texture = None;
                self.pending = None;
            }
            _ => {}
        }
    }
}
