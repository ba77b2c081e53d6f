pub mod config;
pub mod keyring;
pub mod message;
pub mod stream;
pub mod transcript;
