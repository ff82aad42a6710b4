//! treeconf-core: persistent configuration tree with expression resolution
//!
//! A [`Config`] wraps an immutable tree of maps, lists and scalar leaves that is
//! addressed by paths such as `servers[0].host`. Every edit returns a new tree
//! sharing untouched subtrees with the previous one. String leaves may hold
//! `${...}` placeholders that are resolved against the tree itself, with ordered
//! fallbacks (`${name ? 'World'}`) and cycle detection.
//!
//! # Example
//!
//! ```rust
//! use treeconf_core::Config;
//!
//! let yaml = r#"
//! database:
//!   host: localhost
//!   port: 5432
//!   url: postgres://${database.host}:${database.port}/${database.name ? 'app'}
//! "#;
//!
//! let config = Config::from_yaml(yaml)
//!     .unwrap()
//!     .to_builder()
//!     .resolve_expressions(&Config::empty())
//!     .unwrap()
//!     .build();
//! assert_eq!(config.get::<u16>("database.port").unwrap(), 5432);
//! assert_eq!(
//!     config.get_string("database.url").unwrap(),
//!     "postgres://localhost:5432/app"
//! );
//! ```

pub mod coercion;
pub mod error;
pub mod interpolation;
pub mod node;
pub mod path;
pub mod resolver;
pub mod secret;
pub mod value;

mod audit;
mod config;
mod creator;

pub use audit::AuditableConfig;
pub use coercion::{ConfigType, FnParser, Locale, ParserRegistry, ValueParser};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use interpolation::{Expression, Segment};
pub use node::{Node, RemoveOptions};
pub use path::{Path, PathElement};
pub use resolver::UnresolvedPolicy;
pub use secret::SecretRedactor;
pub use value::{Scalar, Value};
