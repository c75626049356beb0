//! Settings and schema documents for tagsync.
//!
//! Both documents are owned by the host, loaded once per run through
//! [`tagsync_fs::ConfigStore`] and treated as read-only afterwards.

pub mod error;
pub mod schema;
pub mod settings;

pub use error::{Error, Result};
pub use schema::{Schema, ValueType};
pub use settings::{CollisionPolicy, SyncEntry, SyncSettings};
