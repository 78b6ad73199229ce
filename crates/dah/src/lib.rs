//! DICOM Application Hosting protocol layer
//!
//! A Host and a Hosted Application each run a local server and call into the
//! other's. This crate provides the pieces both sides share:
//!
//! - the data model and its wire codec
//! - request framing and the Transport Server
//! - the Message Router and handler groups
//! - the Transport Client and typed interface proxies
//!
//! Only descriptors and locators cross the process boundary; bulk data is
//! retrieved by the consumer from the locator URIs.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod framing;
pub mod interface;
pub mod proxies;
pub mod router;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use client::TransportClient;
pub use codec::{Fault, FaultCode, MethodCall, Reply};
pub use config::{PeerEndpoint, ServerConfig};
pub use error::{DahError, Result};
pub use interface::Interface;
pub use proxies::{ApplicationProxy, ExchangeProxy, HostProxy};
pub use router::{Dispatch, GroupKind, HandlerGroup, MessageRouter};
pub use server::{BoundServer, TransportServer};
pub use types::{
    AvailableData, ObjectDescriptor, ObjectLocator, Patient, Rectangle, Series, Severity, State,
    Status, Study,
};

/// Protocol layer version
pub const DAH_VERSION: &str = "0.1.0";

/// Default Host service port
pub const DEFAULT_HOST_PORT: u16 = 8080;

/// Default Hosted Application service port
pub const DEFAULT_APPLICATION_PORT: u16 = 8081;
