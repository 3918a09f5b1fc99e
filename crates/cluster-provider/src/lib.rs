//! Cluster credential resolution for Kubernetes-facing servers.
//!
//! A server selects one [`provider::ClusterProvider`] strategy at startup from
//! its [`config::BaseConfig`] and asks it for a client on every request. The
//! `auth-headers` strategy builds that client from credentials the caller sent
//! with the request; see [`credentials`].

pub mod config;
pub mod context;
pub mod credentials;
pub mod provider;

pub use config::{BaseConfig, ConfigError, ProviderKind};
pub use context::{AUTHORIZATION_KEY, RequestContext};
pub use provider::{ClusterProvider, ProviderError, new_provider};
