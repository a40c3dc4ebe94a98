use super::Message;
use crate::model::{is_firmware_path, Model, Route};
use egui::Layout;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

pub struct App {
    model: Arc<Mutex<Model>>,
    pub(super) selected_port: String,
    pub(super) port_prompt: bool,
    pub(super) inspect_firmware: bool,
    controller: mpsc::Sender<Message>,
}

impl App {
    pub fn new(
        model: Arc<Mutex<Model>>,
        controller: mpsc::Sender<Message>,
        inspect_firmware: bool,
    ) -> Self {
        Self {
            model,
            controller,
            selected_port: String::new(),
            port_prompt: false,
            inspect_firmware,
        }
    }

    pub(super) fn send(self: &Self, msg: Message) {
        if self.controller.send(msg).is_err() {
            log::error!("Controller is gone");
        }
    }

    pub(super) fn modify_model<F>(self: &Self, op: F)
    where
        F: FnOnce(&mut Model),
    {
        let mut model = self.model.lock().unwrap_or_else(|e| e.into_inner());
        op(&mut model);
    }

    /// Sends a command that talks to the backend, unless one is already in flight.
    pub(super) fn send_request(self: &Self, msg: Message) {
        let mut started = false;
        self.modify_model(|m| started = m.try_begin_request());
        if started {
            self.send(msg);
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let model = { self.model.lock().unwrap_or_else(|e| e.into_inner()).clone() };

        if model.route == Route::Upload && !model.upload.busy {
            let dropped = ctx.input().raw.dropped_files.clone();
            if let Some(path) = dropped
                .into_iter()
                .filter_map(|f| f.path)
                .find(|p| is_firmware_path(p))
            {
                self.send_request(Message::SelectFile(path));
            }
        }

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.spacing_mut().item_spacing.y = 8.;

            ui.with_layout(Layout::left_to_right(), |ui| {
                ui.heading("Firmware Management Portal");
                ui.with_layout(Layout::right_to_left(), |ui| {
                    ui.label(model.route.path());
                });
            });
        });

        egui::TopBottomPanel::bottom("messages")
            .default_height(128.)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .stick_to_bottom()
                    .auto_shrink([false, false])
                    .max_height(64.)
                    .show(ui, |ui| {
                        ui.with_layout(Layout::top_down_justified(egui::Align::LEFT), |ui| {
                            for m in &model.messages {
                                ui.add(egui::Label::new(m));
                            }
                        })
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| match model.route {
            Route::Welcome => self.welcome(ui),
            Route::Upload => self.upload(ui, &model),
            Route::Summary => self.summary(ui, &model),
        });

        if model.route == Route::Upload {
            self.device_windows(ctx, &model);
        }

        if let Some(alert) = &model.alert {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0., 0.])
                .show(ctx, |ui| {
                    ui.label(alert.as_str());
                    if ui.button("OK").clicked() {
                        self.modify_model(|m| m.alert = None);
                    }
                });
        }
    }
}
