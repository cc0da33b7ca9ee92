pub mod admin;
pub mod backend;
pub mod booking;
pub mod configuration;
pub mod configuration_handler;
pub mod file_storage;
pub mod greeting;
pub mod http;
pub mod key_selection;
pub mod local_storage;
pub mod storage;
#[cfg(test)]
mod testutils;
pub mod types;
