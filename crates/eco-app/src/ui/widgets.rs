use egui::{Color32, RichText, TextEdit, Ui};
use eco_core::{Detection, GeneratedMedia, SuggestionSet, WorkflowSnapshot, STEP_LABELS};
use crate::events::UiEvent;
use crate::state::Screen;
use crate::ui::UiContext;

/// Numbered step list with the current position highlighted.
pub fn step_indicator(ui: &mut Ui, snapshot: &WorkflowSnapshot) {
    let active = snapshot.active_step();

    ui.horizontal(|ui| {
        for (index, label) in STEP_LABELS.iter().enumerate() {
            let (marker, color) = if index < active {
                ("✅", Color32::GREEN)
            } else if index == active {
                ("▶", Color32::LIGHT_BLUE)
            } else {
                ("○", Color32::GRAY)
            };

            ui.label(RichText::new(format!("{marker} {}. {label}", index + 1)).color(color));
            if index + 1 < STEP_LABELS.len() {
                ui.label(RichText::new("→").color(Color32::GRAY));
            }
        }
    });
}

pub fn busy_banner(ui: &mut Ui, snapshot: &WorkflowSnapshot) {
    if let Some(message) = snapshot.busy_message() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new(message).color(Color32::LIGHT_BLUE));
        });
    }
}

pub fn error_banner(ui: &mut Ui, snapshot: &WorkflowSnapshot) {
    if let Some(message) = snapshot.error_message() {
        egui::Frame::new()
            .fill(Color32::from_rgb(70, 20, 20))
            .inner_margin(8.0)
            .corner_radius(5.0)
            .show(ui, |ui| {
                ui.label(RichText::new(format!("❌ {message}")).color(Color32::LIGHT_RED));
            });
    }
}

pub fn detection_card(ui: &mut Ui, detection: &Detection) {
    egui::Frame::new()
        .fill(Color32::from_gray(30))
        .inner_margin(10.0)
        .corner_radius(5.0)
        .stroke(egui::Stroke::new(1.0, Color32::from_gray(60)))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("🎯").size(24.0));
                ui.vertical(|ui| {
                    ui.label(RichText::new(detection.display_label()).strong().size(16.0));
                    ui.label(
                        RichText::new(format!("Confidence: {}", detection.confidence_percent()))
                            .small()
                            .color(Color32::GRAY),
                    );
                });
            });
        });
}

pub fn suggestion_list(ui: &mut Ui, suggestions: &SuggestionSet) {
    if suggestions.is_empty() {
        ui.label(RichText::new("No suggestions came back for this item.").color(Color32::YELLOW));
        return;
    }

    for (index, item) in suggestions.items().iter().enumerate() {
        ui.label(format!("{}. {item}", index + 1));
    }
}

/// Links to the generated media plus a download button.
pub fn media_card(ui: &mut Ui, ui_ctx: &UiContext, screen: Screen, media: &GeneratedMedia) {
    egui::Frame::new()
        .fill(Color32::from_rgb(20, 50, 30))
        .inner_margin(10.0)
        .corner_radius(5.0)
        .show(ui, |ui| {
            ui.heading("🎬 Your instructional video is ready");
            ui.hyperlink_to("▶ Watch video", media.video.resolve(&ui_ctx.base_url));
            if let Some(audio) = &media.audio {
                ui.hyperlink_to("🔊 Listen to narration", audio.resolve(&ui_ctx.base_url));
            }

            ui.add_space(5.0);
            if ui.button("💾 Download").clicked() {
                ui_ctx.send_event(UiEvent::DownloadVideo(screen));
            }
            if let Some(saved) = &ui_ctx.saved_video {
                ui.label(RichText::new(format!("Saved to {}", saved.display())).small().color(Color32::GRAY));
            }
        });
}

/// Editable copy of the suggestions, one step per line.
///
/// The text follows the controller until the user types, and is replaced
/// again whenever the controller publishes a different suggestion set.
#[derive(Default)]
pub struct StepsEditor {
    text: String,
    seen: Option<SuggestionSet>,
}

impl StepsEditor {
    pub fn sync(&mut self, snapshot: &WorkflowSnapshot) {
        if snapshot.suggestions != self.seen {
            self.text = snapshot
                .suggestions
                .as_ref()
                .map(SuggestionSet::to_text)
                .unwrap_or_default();
            self.seen = snapshot.suggestions.clone();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn show(&mut self, ui: &mut Ui, enabled: bool) {
        ui.add_enabled(
            enabled,
            TextEdit::multiline(&mut self.text)
                .desired_width(f32::INFINITY)
                .desired_rows(4)
                .hint_text("One step per line"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{SuggestPayload, SuggestionPolicy};
    use serde_json::json;

    fn snapshot_with(suggestions: Option<SuggestionSet>) -> WorkflowSnapshot {
        WorkflowSnapshot {
            run_id: uuid::Uuid::nil(),
            stage: eco_core::Stage::Suggested,
            detection: None,
            suggestions,
            media: None,
            last_error: None,
            in_flight: None,
        }
    }

    fn set(items: &[&str]) -> SuggestionSet {
        let payload = SuggestPayload::from_value(json!({ "suggestions": items })).unwrap();
        SuggestionSet::normalize(payload, SuggestionPolicy::Lenient).unwrap()
    }

    #[test]
    fn test_editor_follows_new_suggestions() {
        let mut editor = StepsEditor::default();

        editor.sync(&snapshot_with(Some(set(&["Vase", "Lamp"]))));
        assert_eq!(editor.text(), "Vase\nLamp");

        // Local edits survive until the controller publishes something new.
        editor.text = "Vase\nLamp\nPlanter".into();
        editor.sync(&snapshot_with(Some(set(&["Vase", "Lamp"]))));
        assert_eq!(editor.text(), "Vase\nLamp\nPlanter");

        editor.sync(&snapshot_with(None));
        assert_eq!(editor.text(), "");
    }

    #[test]
    fn test_step_indicator_tracks_stage() {
        let snapshot = snapshot_with(None);
        assert_eq!(snapshot.active_step(), 2);
        assert_eq!(STEP_LABELS[snapshot.active_step()], "Generate Instructional Video");
    }
}
