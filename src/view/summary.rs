use super::app::App;
use super::Message;
use crate::model::{Model, Route};
use egui::{Color32, RichText};

impl App {
    pub(super) fn summary(self: &Self, ui: &mut egui::Ui, model: &Model) {
        let summary = match &model.summary {
            Some(summary) => summary,
            None => {
                ui.vertical_centered(|ui| {
                    ui.add_space(24.);
                    ui.label(RichText::new("No Flash Data Found").heading().color(Color32::RED));
                    if ui.button("Go Back").clicked() {
                        self.send(Message::Navigate(Route::Welcome));
                    }
                });
                return;
            }
        };

        let (mark, color) = if summary.is_success() {
            ("✔", Color32::GREEN)
        } else {
            ("✖", Color32::RED)
        };

        ui.vertical_centered(|ui| {
            ui.label(RichText::new(mark).size(48.).color(color));
            ui.heading("Firmware Flash Summary");
        });
        ui.separator();

        egui::Grid::new("flash_summary")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                for (label, value) in [
                    ("Version", &summary.version),
                    ("Device", &summary.device),
                    ("Date", &summary.date),
                    ("Time", &summary.time),
                ] {
                    ui.label(label);
                    ui.label(RichText::new(value.as_str()).strong());
                    ui.end_row();
                }
            });

        ui.add_space(8.);
        ui.label(
            RichText::new(format!("Flash Result: {}", summary.result))
                .strong()
                .color(color),
        );
        ui.add_space(8.);

        ui.horizontal(|ui| {
            if ui.button("Flash Another").clicked() {
                self.send(Message::Navigate(Route::Upload));
            }
            if ui.button("Clear").clicked() {
                self.send(Message::ClearSummary);
            }
        });
    }
}
