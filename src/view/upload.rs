use super::app::App;
use super::Message;
use crate::model::{Model, FIRMWARE_EXTENSIONS};
use egui::{Color32, Layout, RichText};

impl App {
    pub(super) fn upload(self: &mut Self, ui: &mut egui::Ui, model: &Model) {
        let upload = &model.upload;

        ui.label("Upload, configure, and manage embedded device firmware");
        ui.separator();

        ui.with_layout(Layout::left_to_right(), |ui| {
            ui.label("Device Status:");
            match &upload.device {
                Some(device) => ui.colored_label(Color32::GREEN, format!("Connected on {}", device.port)),
                None => ui.colored_label(Color32::GRAY, "No device connected"),
            };
            ui.with_layout(Layout::right_to_left(), |ui| {
                let label = if model.is_connected() {
                    "Device Connected"
                } else {
                    "Connect Device"
                };
                if ui
                    .add_enabled(!model.is_connected(), egui::Button::new(label))
                    .clicked()
                {
                    self.port_prompt = true;
                }
            });
        });
        ui.separator();

        ui.heading("Upload Firmware");
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!upload.busy, egui::Button::new("Choose firmware file..."))
                .clicked()
            {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Firmware", &FIRMWARE_EXTENSIONS[..])
                    .pick_file()
                {
                    self.send_request(Message::SelectFile(path));
                }
            }
            ui.label(format!("Supports .{} (or drop a file here)", FIRMWARE_EXTENSIONS.join(", .")));
        });

        if let Some(file) = &upload.file {
            ui.colored_label(
                Color32::GREEN,
                format!("Selected file: {} ({} bytes)", file.name, file.size()),
            );
        }

        if let Some(details) = &upload.details {
            egui::Grid::new("firmware_details")
                .num_columns(2)
                .show(ui, |ui| {
                    ui.label("Version");
                    ui.label(details.version.as_str());
                    ui.end_row();
                    ui.label("Board");
                    ui.label(details.board.as_str());
                    ui.end_row();
                    ui.label("Build date");
                    ui.label(details.build_date.as_str());
                    ui.end_row();
                });
        }

        ui.add_space(8.);
        if ui
            .add_enabled(
                upload.can_flash(self.inspect_firmware),
                egui::Button::new(RichText::new("Flash Firmware").strong()),
            )
            .clicked()
        {
            self.send_request(Message::Flash);
        }

        if upload.busy {
            ui.label("Waiting for the backend...");
        }
        if let Some(status) = &upload.status {
            ui.label(status.as_str());
        }
    }

    pub(super) fn device_windows(self: &mut Self, ctx: &egui::Context, model: &Model) {
        if self.port_prompt {
            egui::Window::new("Select a serial port")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0., 0.])
                .show(ctx, |ui| {
                    if model.ports.is_empty() {
                        ui.label("No serial ports found");
                    }
                    egui::ComboBox::from_id_source("port")
                        .width(160.)
                        .selected_text(self.selected_port.as_str())
                        .show_ui(ui, |ui| {
                            for port in &model.ports {
                                ui.selectable_value(&mut self.selected_port, port.clone(), port.clone());
                            }
                        });
                    ui.horizontal(|ui| {
                        let chosen = model.ports.contains(&self.selected_port);
                        if ui.add_enabled(chosen, egui::Button::new("Connect")).clicked() {
                            self.send(Message::ConnectDevice(Some(self.selected_port.clone())));
                            self.port_prompt = false;
                        }
                        if ui.button("Cancel").clicked() {
                            self.send(Message::ConnectDevice(None));
                            self.port_prompt = false;
                        }
                    });
                });
        }

        if let (true, Some(device)) = (model.upload.show_device_popup, &model.upload.device) {
            egui::Window::new("Device Connected")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0., 0.])
                .show(ctx, |ui| {
                    ui.label(device.name.as_str());
                    ui.label(format!("Vendor ID: {}", device.vendor_label()));
                    ui.label(format!("Product ID: {}", device.product_label()));
                    ui.label(format!("Version: {}", device.version_label()));
                    if ui.button("OK").clicked() {
                        self.modify_model(|m| m.upload.show_device_popup = false);
                    }
                });
        }
    }
}
