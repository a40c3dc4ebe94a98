use crate::model::Route;
use std::path::PathBuf;

pub mod app;
mod summary;
mod upload;
mod welcome;

pub enum Message {
    Navigate(Route),
    SelectFile(PathBuf),
    /// `None` when the port prompt was dismissed without a choice.
    ConnectDevice(Option<String>),
    Flash,
    ClearSummary,
}
