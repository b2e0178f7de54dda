//! Runtime entry points and the response envelope.

pub mod api;

pub use api::{handle_json_event, handle_raw_event, health, ApiResponse, Health, ResponseBody};
