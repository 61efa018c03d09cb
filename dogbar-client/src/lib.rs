//! Dogbar Client - backend boundary for the admin console
//!
//! Async traits for the auth, table and blob services, local session stores,
//! and a REST implementation against the hosted backend.

pub mod backend;
pub mod config;
pub mod error;
pub mod hosted;
pub mod http;
pub mod store;

pub use backend::{AuthBackend, BlobStore, ListOptions, SortOrder, StorageObject, TableStore};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use hosted::{HostedBackend, SESSION_KEY};
pub use http::HttpClient;
pub use store::{FileStore, KeyValueStore, MemoryStore};
