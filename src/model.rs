use heapless::Deque as SDeque;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use time::{format_description, OffsetDateTime};

use crate::error::{Error, Result};

pub const FIRMWARE_EXTENSIONS: [&str; 3] = ["bin", "hex", "elf"];
pub const FIRMWARE_MIME: &str = "application/octet-stream";
pub const SUCCESS_RESULT: &str = "Successful";
pub const UNKNOWN: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Welcome,
    Upload,
    Summary,
}

const ROUTE_PATHS: [(&str, Route); 3] = [
    ("/", Route::Welcome),
    ("/start", Route::Upload),
    ("/flash-summary", Route::Summary),
];

impl Route {
    pub fn from_path(path: &str) -> Option<Route> {
        ROUTE_PATHS
            .iter()
            .find(|(p, _)| *p == path)
            .map(|&(_, route)| route)
    }

    pub fn path(self: &Self) -> &'static str {
        for &(path, route) in &ROUTE_PATHS {
            if route == *self {
                return path;
            }
        }
        "/"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FirmwareFile {
    pub name: String,
    pub mime: String,
    pub content: Arc<Vec<u8>>,
}

impl FirmwareFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        FirmwareFile {
            name: name.into(),
            mime: String::from(FIRMWARE_MIME),
            content: Arc::new(content),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !is_firmware_path(path) {
            return Err(Error::UnsupportedFile(path.display().to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::UnsupportedFile(path.display().to_string()))?;
        let content = std::fs::read(path)?;
        Ok(FirmwareFile::new(name, content))
    }

    pub fn size(self: &Self) -> usize {
        self.content.len()
    }
}

pub fn is_firmware_path(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            FIRMWARE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareDetails {
    pub version: String,
    pub board: String,
    pub build_date: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashSummary {
    pub result: String,
    pub version: String,
    pub device: String,
    pub date: String,
    pub time: String,
}

impl FlashSummary {
    pub fn is_success(self: &Self) -> bool {
        self.result == SUCCESS_RESULT
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub port: String,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    pub version: Option<String>,
}

impl DeviceInfo {
    pub fn vendor_label(self: &Self) -> String {
        id_label(self.vendor_id)
    }

    pub fn product_label(self: &Self) -> String {
        id_label(self.product_id)
    }

    pub fn version_label(self: &Self) -> &str {
        self.version.as_deref().unwrap_or(UNKNOWN)
    }
}

fn id_label(id: Option<u16>) -> String {
    match id {
        Some(id) => format!("0x{:04X}", id),
        None => String::from(UNKNOWN),
    }
}

/// State owned by one instance of the upload screen.
#[derive(Clone, Debug, Default)]
pub struct UploadState {
    pub file: Option<FirmwareFile>,
    pub details: Option<FirmwareDetails>,
    pub device: Option<DeviceInfo>,
    pub show_device_popup: bool,
    pub status: Option<String>,
    pub busy: bool,
}

impl UploadState {
    pub fn select_file(self: &mut Self, file: FirmwareFile) {
        self.file = Some(file);
        self.details = None;
        self.status = None;
    }

    pub fn can_flash(self: &Self, details_required: bool) -> bool {
        !self.busy && self.file.is_some() && (!details_required || self.details.is_some())
    }
}

#[derive(Clone)]
pub struct Model {
    pub route: Route,
    pub ports: Vec<String>,
    pub upload: UploadState,
    pub summary: Option<FlashSummary>,
    pub alert: Option<String>,
    pub messages: SDeque<String, 8>,
}

impl Default for Model {
    fn default() -> Self {
        Model {
            route: Route::Welcome,
            ports: Vec::new(),
            upload: UploadState::default(),
            summary: None,
            alert: None,
            messages: SDeque::default(),
        }
    }
}

impl Model {
    pub fn is_connected(self: &Self) -> bool {
        self.upload.device.is_some()
    }

    /// Marks a network request as outstanding. Returns false if one already is.
    pub fn try_begin_request(self: &mut Self) -> bool {
        if self.upload.busy {
            false
        } else {
            self.upload.busy = true;
            true
        }
    }

    pub fn end_request(self: &mut Self) {
        self.upload.busy = false;
    }

    pub fn message(self: &mut Self, msg: String) {
        if self.messages.is_full() {
            self.messages.pop_front();
        }

        self.messages
            .push_back(format!("[{}] {}", timestamp("[hour]:[minute]:[second]"), msg))
            .ok();
    }
}

/// Formats the current UTC time, or an empty string if the description is invalid.
pub fn timestamp(description: &str) -> String {
    format_description::parse(description)
        .ok()
        .and_then(|format| {
            OffsetDateTime::from(SystemTime::now())
                .format(&format)
                .ok()
        })
        .unwrap_or_default()
}
