//! ethereal-core: shared vocabulary for the ethereal secrets service and client
//!
//! - `config`: TOML configuration schema with stated defaults
//! - `error`: the error taxonomy every other crate returns
//! - `fragment`: `<remoteKey>;<localKey>` fragment identifier codec
//! - `types`: JSON request/response bodies exchanged over HTTP

pub mod config;
pub mod error;
pub mod fragment;
pub mod types;

pub use error::{EtherealError, EtherealResult};
pub use fragment::{is_uuid, FragmentIdentifier};
