pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod poller;
pub mod practicum;
pub mod telegram;

pub use error::BotError;
