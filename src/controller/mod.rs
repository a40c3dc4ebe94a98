use std::path::Path;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub mod backend;
mod serial;

use crate::config::Settings;
use crate::error::Error;
use crate::model::{
    timestamp, DeviceInfo, FirmwareDetails, FirmwareFile, FlashSummary, Model, Route,
    UploadState, SUCCESS_RESULT, UNKNOWN,
};
use crate::store::SummaryStore;
use crate::view;
use backend::Backend;

const PORT_REFRESH: Duration = Duration::from_millis(500);

pub struct Controller {
    model: Arc<Mutex<Model>>,
    ctx: egui::Context,
    rx: mpsc::Receiver<view::Message>,
    tx: mpsc::Sender<view::Message>,

    backend: Box<dyn Backend + Send>,
    store: SummaryStore,
    settings: Settings,
}

impl Controller {
    pub fn new(
        model: Arc<Mutex<Model>>,
        ctx: egui::Context,
        backend: Box<dyn Backend + Send>,
        store: SummaryStore,
        settings: Settings,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Controller {
            model,
            ctx,
            rx,
            tx,
            backend,
            store,
            settings,
        }
    }

    pub fn start(self: Self) {
        thread::spawn(move || self.task());
    }

    pub fn get_command_channel(self: &Self) -> mpsc::Sender<view::Message> {
        self.tx.clone()
    }

    fn modify_model<F>(self: &Self, mut op: F)
    where
        F: FnMut(&mut Model),
    {
        let mut model = self.model.lock().unwrap_or_else(|e| e.into_inner());
        op(&mut model);
        self.ctx.request_repaint();
    }

    fn snapshot(self: &Self) -> UploadState {
        self.model
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .upload
            .clone()
    }

    fn task(self: Self) {
        let mut portts: Instant = Instant::now();
        self.navigate(self.settings.start_route());

        loop {
            if let Some(msg) = self.rx.recv_timeout(Duration::from_millis(100)).ok() {
                self.handle(msg);
            }

            if Instant::now().duration_since(portts) > PORT_REFRESH {
                self.modify_model(|m| m.ports = serial::get_serial_ports());
                portts = Instant::now();
            }
        }
    }

    fn handle(self: &Self, msg: view::Message) {
        use view::Message::*;
        match msg {
            Navigate(route) => self.navigate(route),
            SelectFile(path) => self.select_file(&path),
            ConnectDevice(Some(port)) => self.connect_device(port),
            ConnectDevice(None) => log::debug!("Port selection cancelled"),
            Flash => self.flash(),
            ClearSummary => self.clear_summary(),
        }
    }

    fn notify(self: &Self, msg: String) {
        log::info!("{}", msg);
        self.modify_model(|m| m.message(msg.clone()))
    }

    fn alert(self: &Self, msg: String) {
        log::warn!("{}", msg);
        self.modify_model(|m| {
            m.message(msg.clone());
            m.alert = Some(msg.clone());
        })
    }

    fn navigate(self: &Self, route: Route) {
        log::debug!("Navigating to {}", route.path());
        match route {
            Route::Welcome => {
                log::info!("Welcome page rendered");
                self.modify_model(|m| m.route = route);
            }
            Route::Upload => self.modify_model(|m| {
                m.upload = UploadState::default();
                m.route = route;
            }),
            Route::Summary => {
                let summary = self.store.read().unwrap_or_else(|e| {
                    log::warn!("Unreadable flash summary: {}", e);
                    None
                });
                self.modify_model(|m| {
                    m.summary = summary.clone();
                    m.route = route;
                });
            }
        }
    }

    fn select_file(self: &Self, path: &Path) {
        match FirmwareFile::load(path) {
            Ok(file) => {
                self.modify_model(|m| m.upload.select_file(file.clone()));
                self.notify(format!("Selected firmware: {} ({} bytes)", file.name, file.size()));

                if self.settings.inspect_firmware {
                    self.inspect(&file);
                }
            }
            Err(e) => self.alert(format!("Cannot open firmware: {}", e)),
        }
        self.modify_model(|m| m.end_request());
    }

    fn inspect(self: &Self, file: &FirmwareFile) {
        self.modify_model(|m| m.upload.busy = true);
        let result = self.backend.firmware_info(file);
        self.modify_model(|m| m.end_request());

        match result {
            Ok(details) => {
                self.modify_model(|m| m.upload.details = Some(details.clone()));
                self.notify(format!(
                    "Firmware {} for {} built {}",
                    details.version, details.board, details.build_date
                ));
            }
            Err(e) => self.alert(format!("Failed to read firmware details: {}", e)),
        }
    }

    fn connect_device(self: &Self, port: String) {
        if self.snapshot().device.is_some() {
            return;
        }

        match serial::probe_device(&port, self.settings.baud_rate, self.settings.probe_timeout()) {
            Ok(device) => {
                self.notify(format!(
                    "Device connected on {} (version {})",
                    device.port,
                    device.version_label()
                ));
                self.modify_model(|m| {
                    m.upload.device = Some(device.clone());
                    m.upload.show_device_popup = true;
                });
            }
            Err(e) => {
                log::warn!("Port connection error: {:?}", e);
                self.alert(String::from("Failed to connect device"));
            }
        }
    }

    fn flash(self: &Self) {
        let upload = self.snapshot();
        let file = match (&upload.file, &upload.details) {
            (None, _) => Err(Error::NoFileSelected),
            (Some(_), None) if self.settings.inspect_firmware => Err(Error::NoDetails),
            (Some(file), _) => Ok(file.clone()),
        };
        let file = match file {
            Ok(file) => file,
            Err(e) => {
                self.modify_model(|m| m.end_request());
                return self.alert(e.to_string());
            }
        };

        self.modify_model(|m| {
            m.upload.busy = true;
            m.upload.status = Some(format!("Flashing {}...", file.name));
        });
        let port = upload.device.as_ref().map(|d| d.port.clone());

        let result = self
            .backend
            .flash(&file, port)
            .map(|summary| {
                summary.unwrap_or_else(|| {
                    local_summary(upload.details.as_ref(), upload.device.as_ref())
                })
            })
            .and_then(|summary| self.store.write(&summary).map(|_| summary));

        match result {
            Ok(summary) => {
                self.notify(format!("Flash result: {}", summary.result));
                self.modify_model(|m| {
                    m.end_request();
                    m.upload.status = None;
                    m.summary = Some(summary.clone());
                    m.route = Route::Summary;
                });
            }
            Err(e) => {
                let status = format!("Flash failed: {}", e);
                log::warn!("{}", status);
                self.modify_model(|m| {
                    m.end_request();
                    m.message(status.clone());
                    m.upload.status = Some(status.clone());
                });
            }
        }
    }

    fn clear_summary(self: &Self) {
        if let Err(e) = self.store.clear() {
            return self.alert(format!("Cannot clear flash summary: {}", e));
        }
        self.modify_model(|m| m.summary = None);
        self.navigate(Route::Upload);
    }
}

/// Summary for a backend that reports success without describing it.
fn local_summary(details: Option<&FirmwareDetails>, device: Option<&DeviceInfo>) -> FlashSummary {
    FlashSummary {
        result: String::from(SUCCESS_RESULT),
        version: details
            .map(|d| d.version.clone())
            .unwrap_or_else(|| String::from(UNKNOWN)),
        device: device
            .map(|d| d.name.clone())
            .unwrap_or_else(|| String::from(UNKNOWN)),
        date: timestamp("[year]-[month]-[day]"),
        time: timestamp("[hour]:[minute]:[second]"),
    }
}

#[cfg(test)]
mod tests {
    use super::backend::MockBackend;
    use super::*;
    use crate::view::Message;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        model: Arc<Mutex<Model>>,
        controller: Controller,
    }

    impl Fixture {
        fn new(backend: MockBackend) -> Self {
            Self::with_settings(backend, Settings::default())
        }

        fn with_settings(backend: MockBackend, settings: Settings) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let model = Arc::new(Mutex::new(Model::default()));
            let store = SummaryStore::new(dir.path().join("flashSummary.json"));
            let controller = Controller::new(
                Arc::clone(&model),
                egui::Context::default(),
                Box::new(backend),
                store,
                settings,
            );
            Fixture {
                dir,
                model,
                controller,
            }
        }

        fn firmware(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"\x7fELF firmware").unwrap();
            path
        }

        fn model(&self) -> Model {
            self.model.lock().unwrap().clone()
        }

        fn store(&self) -> SummaryStore {
            SummaryStore::new(self.dir.path().join("flashSummary.json"))
        }
    }

    fn details() -> FirmwareDetails {
        FirmwareDetails {
            version: "1.2.3".into(),
            board: "X".into(),
            build_date: "2024-01-01".into(),
        }
    }

    fn summary(result: &str) -> FlashSummary {
        FlashSummary {
            result: result.into(),
            version: "1.2.3".into(),
            device: "dev-1".into(),
            date: "2024-01-01".into(),
            time: "10:00".into(),
        }
    }

    fn inspected_backend() -> MockBackend {
        let mut backend = MockBackend::new();
        backend
            .expect_firmware_info()
            .returning(|_| Ok(details()));
        backend
    }

    #[test]
    fn flash_without_file_sends_nothing() {
        let mut backend = MockBackend::new();
        backend.expect_flash().never();
        let fixture = Fixture::new(backend);

        fixture.controller.handle(Message::Flash);

        let model = fixture.model();
        assert_eq!(model.alert, Some(Error::NoFileSelected.to_string()));
        assert!(!model.upload.busy);
        assert_eq!(fixture.store().read().unwrap(), None);
    }

    #[test]
    fn inspected_details_enable_flash() {
        let fixture = Fixture::new(inspected_backend());
        let path = fixture.firmware("blink.hex");

        fixture.controller.handle(Message::SelectFile(path));

        let model = fixture.model();
        assert_eq!(model.upload.details, Some(details()));
        assert_eq!(model.upload.file.as_ref().unwrap().name, "blink.hex");
        assert!(model.upload.can_flash(true));
        assert_eq!(model.alert, None);
    }

    #[test]
    fn failed_inspection_keeps_flash_disabled() {
        let mut backend = MockBackend::new();
        backend
            .expect_firmware_info()
            .returning(|_| Err(Error::Status(502)));
        backend.expect_flash().never();
        let fixture = Fixture::new(backend);

        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.bin")));
        fixture.controller.handle(Message::Flash);

        let model = fixture.model();
        assert_eq!(model.upload.details, None);
        assert!(!model.upload.can_flash(true));
        assert!(!model.upload.busy);
        assert_eq!(model.alert, Some(Error::NoDetails.to_string()));
    }

    #[test]
    fn new_selection_clears_details_and_status() {
        let mut backend = MockBackend::new();
        let mut calls = 0;
        backend.expect_firmware_info().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(details())
            } else {
                Err(Error::Backend("Unknown image".into()))
            }
        });
        let fixture = Fixture::new(backend);

        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("first.bin")));
        fixture.model.lock().unwrap().upload.status = Some("Flash failed: boom".into());
        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("second.elf")));

        let model = fixture.model();
        assert_eq!(model.upload.file.as_ref().unwrap().name, "second.elf");
        assert_eq!(model.upload.details, None);
        assert_eq!(model.upload.status, None);
    }

    #[test]
    fn unsupported_file_is_rejected_locally() {
        let mut backend = MockBackend::new();
        backend.expect_firmware_info().never();
        let fixture = Fixture::new(backend);

        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("notes.txt")));

        let model = fixture.model();
        assert_eq!(model.upload.file, None);
        assert!(model.alert.is_some());
    }

    #[test]
    fn successful_flash_persists_summary_and_navigates() {
        let mut backend = inspected_backend();
        backend
            .expect_flash()
            .times(1)
            .returning(|_, _| Ok(Some(summary("Successful"))));
        let fixture = Fixture::new(backend);
        fixture.controller.handle(Message::Navigate(Route::Upload));

        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.hex")));
        fixture.controller.handle(Message::Flash);

        let model = fixture.model();
        assert_eq!(model.route, Route::Summary);
        assert_eq!(model.summary, Some(summary("Successful")));
        assert!(!model.upload.busy);
        assert_eq!(fixture.store().read().unwrap(), Some(summary("Successful")));
    }

    #[test]
    fn failed_flash_stays_idle_with_message() {
        let mut backend = inspected_backend();
        backend
            .expect_flash()
            .times(2)
            .returning(|_, _| Err(Error::Backend("avrdude: programmer is not responding".into())));
        let fixture = Fixture::new(backend);
        fixture.controller.handle(Message::Navigate(Route::Upload));
        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.hex")));

        fixture.controller.handle(Message::Flash);
        let model = fixture.model();
        assert_eq!(model.route, Route::Upload);
        assert!(!model.upload.busy);
        assert!(model.upload.can_flash(true));
        assert_eq!(
            model.upload.status.as_deref(),
            Some("Flash failed: avrdude: programmer is not responding")
        );
        assert_eq!(fixture.store().read().unwrap(), None);

        // Retrying is allowed.
        fixture.controller.handle(Message::Flash);
        assert!(!fixture.model().upload.busy);
    }

    #[test]
    fn http_error_on_flash_is_reported() {
        let mut backend = inspected_backend();
        backend
            .expect_flash()
            .returning(|_, _| Err(Error::Status(503)));
        let fixture = Fixture::new(backend);
        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.hex")));
        fixture.controller.handle(Message::Flash);

        let model = fixture.model();
        assert!(!model.upload.busy);
        assert_eq!(
            model.upload.status.as_deref(),
            Some("Flash failed: Backend responded with HTTP 503")
        );
    }

    #[test]
    fn flash_without_inspection_needs_only_a_file() {
        let mut backend = MockBackend::new();
        backend.expect_firmware_info().never();
        backend
            .expect_flash()
            .withf(|file, port| file.name == "blink.bin" && port.is_none())
            .returning(|_, _| Ok(None));
        let mut settings = Settings::default();
        settings.inspect_firmware = false;
        let fixture = Fixture::with_settings(backend, settings);

        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.bin")));
        fixture.controller.handle(Message::Flash);

        let model = fixture.model();
        assert_eq!(model.route, Route::Summary);
        let stored = fixture.store().read().unwrap().unwrap();
        assert!(stored.is_success());
        assert_eq!(stored.version, UNKNOWN);
        assert_eq!(stored.device, UNKNOWN);
        assert_eq!(Some(stored), model.summary);
    }

    #[test]
    fn connected_port_is_sent_with_flash() {
        let mut backend = inspected_backend();
        backend
            .expect_flash()
            .withf(|_, port| port.as_deref() == Some("/dev/ttyACM0"))
            .returning(|_, _| Ok(Some(summary("Successful"))));
        let fixture = Fixture::new(backend);
        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.hex")));
        fixture.model.lock().unwrap().upload.device = Some(DeviceInfo {
            name: "Arduino Uno".into(),
            port: "/dev/ttyACM0".into(),
            vendor_id: Some(0x2341),
            product_id: Some(0x0043),
            version: None,
        });

        fixture.controller.handle(Message::Flash);
        assert_eq!(fixture.model().route, Route::Summary);
    }

    #[test]
    fn summary_screen_loads_stored_result() {
        let fixture = Fixture::new(MockBackend::new());
        fixture.store().write(&summary("Failed")).unwrap();

        fixture.controller.handle(Message::Navigate(Route::Summary));

        let model = fixture.model();
        assert_eq!(model.route, Route::Summary);
        let loaded = model.summary.unwrap();
        assert_eq!(loaded, summary("Failed"));
        assert!(!loaded.is_success());
    }

    #[test]
    fn summary_screen_without_data() {
        let fixture = Fixture::new(MockBackend::new());
        fixture.controller.handle(Message::Navigate(Route::Summary));
        assert_eq!(fixture.model().summary, None);
    }

    #[test]
    fn clear_erases_slot_and_returns_to_upload() {
        let fixture = Fixture::new(MockBackend::new());
        fixture.store().write(&summary("Successful")).unwrap();
        fixture.controller.handle(Message::Navigate(Route::Summary));

        fixture.controller.handle(Message::ClearSummary);

        let model = fixture.model();
        assert_eq!(model.route, Route::Upload);
        assert_eq!(model.summary, None);
        assert_eq!(fixture.store().read().unwrap(), None);
    }

    #[test]
    fn flash_another_keeps_slot() {
        let fixture = Fixture::new(MockBackend::new());
        fixture.store().write(&summary("Successful")).unwrap();
        fixture.controller.handle(Message::Navigate(Route::Summary));

        fixture.controller.handle(Message::Navigate(Route::Upload));

        assert_eq!(fixture.model().route, Route::Upload);
        assert_eq!(fixture.store().read().unwrap(), Some(summary("Successful")));
    }

    #[test]
    fn entering_upload_resets_screen_state() {
        let fixture = Fixture::new(inspected_backend());
        fixture
            .controller
            .handle(Message::SelectFile(fixture.firmware("blink.hex")));

        fixture.controller.handle(Message::Navigate(Route::Welcome));
        fixture.controller.handle(Message::Navigate(Route::Upload));

        let model = fixture.model();
        assert_eq!(model.upload.file, None);
        assert_eq!(model.upload.details, None);
    }

    #[test]
    fn cancelled_port_prompt_is_silent() {
        let fixture = Fixture::new(MockBackend::new());
        fixture.controller.handle(Message::ConnectDevice(None));

        let model = fixture.model();
        assert_eq!(model.alert, None);
        assert_eq!(model.upload.device, None);
    }

    #[test]
    fn unopenable_port_alerts_and_stays_disconnected() {
        let fixture = Fixture::new(MockBackend::new());
        fixture
            .controller
            .handle(Message::ConnectDevice(Some("/dev/no-such-port".into())));

        let model = fixture.model();
        assert_eq!(model.alert.as_deref(), Some("Failed to connect device"));
        assert_eq!(model.upload.device, None);
        assert!(!model.upload.show_device_popup);
    }

    #[test]
    fn connect_is_ignored_when_already_connected() {
        let fixture = Fixture::new(MockBackend::new());
        let device = DeviceInfo {
            name: "Arduino Uno".into(),
            port: "/dev/ttyACM0".into(),
            vendor_id: Some(0x2341),
            product_id: Some(0x0043),
            version: Some("1.0".into()),
        };
        fixture.model.lock().unwrap().upload.device = Some(device.clone());

        fixture
            .controller
            .handle(Message::ConnectDevice(Some("/dev/no-such-port".into())));

        let model = fixture.model();
        assert_eq!(model.upload.device, Some(device));
        assert_eq!(model.alert, None);
    }

    #[test]
    fn failed_clear_keeps_summary_on_screen() {
        let fixture = Fixture::new(MockBackend::new());
        // A directory where the slot file should be cannot be removed as a file.
        std::fs::create_dir(fixture.store().path()).unwrap();
        {
            let mut model = fixture.model.lock().unwrap();
            model.summary = Some(summary("Successful"));
            model.route = Route::Summary;
        }

        fixture.controller.handle(Message::ClearSummary);

        let model = fixture.model();
        assert_eq!(model.route, Route::Summary);
        assert_eq!(model.summary, Some(summary("Successful")));
        assert!(model.alert.unwrap().starts_with("Cannot clear flash summary"));
        assert!(fixture.store().path().exists());
    }

    #[test]
    fn local_summary_uses_details_and_device() {
        let device = DeviceInfo {
            name: "Arduino Uno".into(),
            port: "COM3".into(),
            vendor_id: None,
            product_id: None,
            version: None,
        };
        let summary = local_summary(Some(&details()), Some(&device));
        assert_eq!(summary.result, SUCCESS_RESULT);
        assert_eq!(summary.version, "1.2.3");
        assert_eq!(summary.device, "Arduino Uno");
        assert_eq!(summary.date.len(), "2024-01-01".len());
        assert_eq!(summary.time.len(), "10:00:00".len());
    }
}
