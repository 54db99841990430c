//! Configuration management for kitchen-queue.
//!
//! This module handles resolving the data root and loading settings from it.

mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{
    ColorSetting, Config, GeneralConfig, QueueConfig, RemoteConfig, API_KEY_ENV, URL_ENV,
};
