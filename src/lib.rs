//! Client for API discovery documents.
//!
//! A discovery document describes every version of an API, its resources,
//! their methods and the parameters each method takes. [`DiscoveryDocument::load`]
//! fetches and parses one; [`Api::build_request`] turns a
//! `resourceName.methodName` identifier plus parameters into an [`HttpRequest`].
//!
//! ```rust,ignore
//! use discovery_client::{ClientConfig, DiscoveryDocument, HttpClient};
//!
//! let transport = HttpClient::new(&ClientConfig::default())?;
//! let doc = DiscoveryDocument::load(&transport, "buzz")?;
//! let request = doc.build_request("activities.list", &json!({"userId": "@me", "scope": "@self"}))?;
//! ```

pub mod api;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod http;
pub mod request;

pub use api::Api;
pub use config::{ClientConfig, DEFAULT_DISCOVERY_URL};
pub use descriptor::{
    ApiDefinition, MethodDescriptor, MethodType, ParameterDescriptor, ResourceDescriptor,
    ServiceDescriptor,
};
pub use discovery::DiscoveryDocument;
pub use error::{DiscoveryError, Result};
pub use http::{HttpClient, HttpResponse, Transport};
pub use request::{build_request, HttpRequest};
