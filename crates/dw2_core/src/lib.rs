pub mod backup;
pub mod bodyguard;
pub mod config;
pub mod error;
pub mod image;
pub mod item;
pub mod layout;
pub mod mods;
pub mod names;
pub mod reader;
pub mod record;
pub mod stage;
pub mod staging;
pub mod unit;

pub use error::{CoreError, CoreErrorCode, Result};
