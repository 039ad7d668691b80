//! Reconciles an Avi-on mesh inventory, from the cloud or from a local
//! `mesh_db.json` snapshot, into the import document an avionmesh hub
//! consumes, and delivers it.

pub mod cli;
pub mod cloud;
pub mod error;
pub mod http;
pub mod importer;
pub mod inventory;
pub mod payload;
pub mod resolver;
pub mod settings;
pub mod snapshot;
pub mod sync;

pub use error::{ErrorKind, SyncError, SyncResult};
