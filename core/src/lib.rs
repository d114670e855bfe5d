//! Synchronous client core for the Taleo Business Edition REST API.
//!
//! # Overview
//! Authenticates against the platform, discovers entity metadata and
//! fetches records together with their related records.
//!
//! # Design
//! - A call is described by a `RequestDescriptor`, filled in from session
//!   state by `normalize`, executed once by a `Transport` and decoded by
//!   `interpret`.
//! - `Session` owns the host URL, auth token and the log of errors the
//!   remote service reported.
//! - `TaleoClient` builds descriptors from the `Endpoint` table and keeps
//!   payloads as `serde_json::Value`.
//! - Every fallible operation returns `Result<_, ApiError>`.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod normalize;
pub mod related;
pub mod response;
pub mod session;
pub mod transport;

pub use client::{RelatedRecords, TaleoClient};
pub use config::SessionConfig;
pub use endpoint::Endpoint;
pub use error::{ApiError, ConfigError, ErrorRecord, TransportError};
pub use http::{ContentType, HttpMethod, HttpResponse, RequestDescriptor, ResolvedRequest};
pub use related::{resolve_key, RelatedRecord};
pub use response::Payload;
pub use session::{Session, SessionState};
pub use transport::{Transport, UreqTransport};
