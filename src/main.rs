#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod config;
mod controller;
mod error;
mod model;
mod store;
mod view;

use config::Settings;
use controller::backend::HttpBackend;
use simplelog::*;
use std::fs::File;
use std::sync::{Arc, Mutex};
use store::SummaryStore;
use view::app::App;

fn init_logging(settings: &Settings) {
    let level = settings.level_filter();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = &settings.log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("Cannot create log file {}: {}", path.display(), e),
        }
    }

    if let Err(e) = CombinedLogger::init(loggers) {
        eprintln!("Logger already initialised: {}", e);
    }
}

fn main() {
    let (settings, settings_error) = match Settings::load() {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default().with_env(), Some(e)),
    };
    init_logging(&settings);
    if let Some(e) = settings_error {
        log::warn!("Ignoring settings file: {}", e);
    }
    log::info!("Backend at {}", settings.backend_url);

    let backend = match HttpBackend::new(&settings.backend_url, settings.request_timeout()) {
        Ok(backend) => backend,
        Err(e) => {
            log::error!("Cannot create HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let store = SummaryStore::new(settings.summary_path());
    log::debug!("Flash summary slot at {}", store.path().display());

    let model = Arc::new(Mutex::new(model::Model::default()));

    let controller_model = Arc::clone(&model);
    let view_model = Arc::clone(&model);

    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(640., 480.)),
        min_window_size: Some(egui::vec2(480., 360.)),
        drag_and_drop_support: true,
        ..eframe::NativeOptions::default()
    };

    let inspect_firmware = settings.inspect_firmware;
    eframe::run_native(
        "Firmware Management Portal",
        options,
        Box::new(move |cc| {
            let controller = controller::Controller::new(
                controller_model,
                cc.egui_ctx.clone(),
                Box::new(backend),
                store,
                settings,
            );
            let tx = controller.get_command_channel();
            controller.start();
            Box::new(App::new(view_model, tx, inspect_firmware))
        }),
    );
}
