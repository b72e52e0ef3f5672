//! # console-api
//!
//! Remote resource access for an OpenStack-style cloud console.
//!
//! One [`ResourceApi`] addresses one JSON collection (projects, database
//! instances, load-balancer listeners, ...). The crate ships a REST
//! implementation, [`RestResourceApi`], that speaks the common OpenStack
//! envelope conventions and authenticates with an `X-Auth-Token` header.
//!
//! ## Feature Flags
//!
//! - **`native-tls`** *(default)*: Use the platform's native TLS implementation.
//! - **`rustls`**: Use rustls.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use console_api::{create_resource_api, ApiConfig, ListQuery, ResourceEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig {
//!         base_url: "https://cloud.example.com/identity".to_string(),
//!         auth_token: "gAAAAAB...".to_string(),
//!         ..ApiConfig::default()
//!     };
//!     let projects = create_resource_api(
//!         &config,
//!         ResourceEndpoint::new("/v3/projects", "projects", "project"),
//!     )?;
//!
//!     let page = projects.list(&ListQuery::default().with_filter("name", "demo")).await?;
//!     for project in &page.items {
//!         println!("{} {}", project.id, project.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ApiError>`](ApiError). Variants are grouped
//! by [`ApiError::class`] into server rejections (not found, forbidden,
//! conflict, validation) and transport failures (network, timeout, rate limit,
//! 5xx, unparsable body). Transient failures of idempotent requests are
//! retried with exponential backoff.

mod error;
mod factory;
mod rest;
mod traits;
mod transport;
mod types;
mod utils;

pub use error::{ApiError, ErrorClass, Result};

pub use factory::create_resource_api;

pub use traits::ResourceApi;

pub use rest::RestResourceApi;

pub use types::{
    ApiConfig, BatchDeleteFailure, BatchDeleteResult, ListQuery, PaginatedResponse, Resource,
    ResourceEndpoint, is_present,
};

pub use utils::log_sanitizer;
