//! Viewkit keeps named "view" documents (a query, a schema fragment and a
//! pipeline of lenses) on disk, along with a full history of their edits.
//!
//! Every save records a reverse [JSON Merge
//! Patch](https://datatracker.ietf.org/doc/html/rfc7396), so any change can be
//! rolled back, and every write is atomic.
//!
//! This crate provides an API that allows for embedding Viewkit into another
//! application. For Viewkit's command line interface, see the `viewkit-cli`
//! crate.

mod config;
mod datetime;
mod error;
pub mod fetch;
mod fs;
mod hash;
mod metadata;
pub mod patch;
pub mod revision;
pub mod schema;
pub mod service;
mod store;
mod view;
pub mod wasm;

pub use config::Config;
pub use datetime::Timestamp;
pub use error::Error;
pub use metadata::{Metadata, Revision};
pub use schema::{FileSchemaStore, SchemaStore};
pub use store::{rollback, LocalStore, ViewStore};
pub use view::{asset_locator, validate_name, Lens, Transform, View};
