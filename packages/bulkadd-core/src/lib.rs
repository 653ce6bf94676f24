//! Bulkadd Core Library
//!
//! This crate provides the building blocks for bulk-provisioning devices
//! into a LibreNMS instance:
//! - Device table loading (CSV with defaults applied at parse time)
//! - LibreNMS API client (devices, locations, partial updates)
//! - Location resolution (find by name or create with coordinates)
//! - The sequential provisioning loop
//!
//! # Example
//!
//! ```no_run
//! use bulkadd_core::{client, config, provision, table};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Resolve server URL and API token from env/config file
//!     let server = config::load_server_config()?;
//!     let client = client::LibrenmsClient::new(&server)?;
//!
//!     // Load the device table
//!     let records = table::load_records(Path::new("data/bulkadd.csv"))?;
//!
//!     // Provision every row; per-row failures never stop the run
//!     let report = provision::provision_all(&client, &records).await;
//!     println!("created {}, skipped {}, failed {}",
//!         report.created, report.skipped, report.failed);
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod location;
pub mod provision;
pub mod table;

// Re-export commonly used types
pub use client::{AddDeviceRequest, LibrenmsApi, LibrenmsClient};
pub use config::{load_server_config, ConfigSource, ServerConfig};
pub use provision::{provision_all, RunReport};
pub use table::{load_records, DeviceRecord, TableError};
