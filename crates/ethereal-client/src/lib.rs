//! ethereal-client: caller-side facade for the ethereal secrets service
//!
//! Local secrets are sealed with the session secret the service hands out
//! and kept in a [`LocalStorage`]. Remote secrets are sealed with a fresh
//! local secret that only ever leaves the process inside the returned
//! fragment identifier.

pub mod client;
pub mod config;
pub mod storage;

pub use client::{EtherealClient, RemoteRetrieveResult, RemoteSaveResult, SaveRemoteOptions};
pub use config::ClientConfig;
pub use storage::{LocalStorage, MemoryStorage};
