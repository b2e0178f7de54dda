//! Configuration models for admission, storage and job defaults.

pub mod gate;

pub use gate::{parse_allow_list, GateConfig, RequestSettings, ENV_PREFIX};
