use crate::error::{Error, Result};
use crate::model::{FirmwareDetails, FirmwareFile, FlashSummary};
use reqwest::blocking::{multipart, Client};
use serde::Deserialize;
use std::time::Duration;

pub const FLASH_PATH: &str = "/flash";
pub const FIRMWARE_INFO_PATH: &str = "/firmware-info";
pub const FILE_FIELD: &str = "file";
pub const PORT_FIELD: &str = "port";
pub const STATUS_SUCCESS: &str = "success";
const INVALID_RESPONSE: &str = "Invalid response from backend";

#[derive(Clone, Debug, Deserialize)]
pub struct InfoResponse {
    pub status: String,
    pub details: Option<FirmwareDetails>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FlashResponse {
    pub status: String,
    pub flash_summary: Option<FlashSummary>,
    pub message: Option<String>,
    pub error: Option<String>,
}

/// The firmware service. Every call is a single attempt.
#[cfg_attr(test, mockall::automock)]
pub trait Backend {
    fn firmware_info(&self, file: &FirmwareFile) -> Result<FirmwareDetails>;

    /// `Ok(None)` means the backend reported success without a summary.
    fn flash(&self, file: &FirmwareFile, port: Option<String>) -> Result<Option<FlashSummary>>;
}

impl InfoResponse {
    pub fn into_details(self) -> Result<FirmwareDetails> {
        if self.status != STATUS_SUCCESS {
            return Err(Error::Backend(
                self.message
                    .unwrap_or_else(|| String::from("Failed to read firmware details")),
            ));
        }
        self.details
            .ok_or_else(|| Error::Backend(String::from("Backend sent no firmware details")))
    }
}

impl FlashResponse {
    pub fn into_summary(self) -> Result<Option<FlashSummary>> {
        if self.status != STATUS_SUCCESS {
            return Err(Error::Backend(
                self.message
                    .or(self.error)
                    .unwrap_or_else(|| String::from("Flash failed")),
            ));
        }
        Ok(self.flash_summary)
    }
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpBackend {
            client,
            base_url: String::from(base_url.trim_end_matches('/')),
        })
    }

    fn file_part(file: &FirmwareFile) -> Result<multipart::Part> {
        Ok(multipart::Part::bytes(file.content.as_ref().clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?)
    }

    fn post<T: serde::de::DeserializeOwned>(&self, path: &str, form: multipart::Form) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {}", url);

        let response = self.client.post(&url).multipart(form).send()?;
        if !response.status().is_success() {
            log::warn!("POST {} returned {}", url, response.status());
            return Err(Error::Status(response.status().as_u16()));
        }
        response.json().map_err(|e| {
            log::warn!("POST {} sent an unreadable body: {}", url, e);
            Error::Backend(String::from(INVALID_RESPONSE))
        })
    }
}

impl Backend for HttpBackend {
    fn firmware_info(&self, file: &FirmwareFile) -> Result<FirmwareDetails> {
        let form = multipart::Form::new().part(FILE_FIELD, Self::file_part(file)?);
        self.post::<InfoResponse>(FIRMWARE_INFO_PATH, form)?
            .into_details()
    }

    fn flash(&self, file: &FirmwareFile, port: Option<String>) -> Result<Option<FlashSummary>> {
        let mut form = multipart::Form::new().part(FILE_FIELD, Self::file_part(file)?);
        if let Some(port) = port {
            form = form.text(PORT_FIELD, port);
        }
        self.post::<FlashResponse>(FLASH_PATH, form)?.into_summary()
    }
}
