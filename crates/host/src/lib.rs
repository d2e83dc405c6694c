//! Graphene host
//!
//! Lets a test runner drive Marionette tests in the Graphene runtime. The
//! crate root mirrors a command-group module: [`help`] describes the group for
//! a CLI framework, and [`create_host`] / [`create_session`] forward
//! construction to a [`HostProvider`].
//!
//! # Example
//!
//! ```ignore
//! use graphene_host::{GrapheneProvider, HostConfig, SessionConfig, create_host, create_session};
//!
//! let provider = GrapheneProvider;
//! let host = create_host(&provider, HostConfig::with_runtime("/opt/graphene")).await?;
//! let session = create_session(&provider, SessionConfig::new(host)).await?;
//! let title = session.execute_script("return document.title", vec![]).await?;
//! session.destroy().await?;
//! ```

pub mod config;
pub mod help;
pub mod host;
pub mod profile;
pub mod provider;
pub mod session;
pub mod shim;

pub use config::{
	DEFAULT_MARIONETTE_PORT, DEFAULT_SHUTDOWN_GRACE, DEFAULT_STARTUP_TIMEOUT, HostConfig, SessionConfig, SessionOptions,
};
pub use graphene_runtime::{Error, Result};
pub use help::{ArgumentHelp, CommandDescriptor, GroupInfo, help};
pub use host::GrapheneHost;
pub use profile::Profile;
pub use provider::{GrapheneProvider, HostProvider};
pub use session::{Context, Session};
pub use shim::{Shim, create_host, create_session};
