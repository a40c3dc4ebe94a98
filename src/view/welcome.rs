use super::app::App;
use super::Message;
use crate::model::Route;

impl App {
    pub(super) fn welcome(self: &Self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(24.);
            ui.heading("Welcome");
            ui.label(
                "Manage, upload, and monitor firmware updates for your embedded devices.",
            );
            ui.add_space(16.);
            ui.label("Click the button below to proceed to firmware management.");
            ui.add_space(8.);
            if ui.button("Next").clicked() {
                self.send(Message::Navigate(Route::Upload));
            }
        });
    }
}
