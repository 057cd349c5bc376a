//! Project-management record store.
//!
//! Projects, tasks, comments, file attachments and an activity history kept
//! in a single JSON document. Task changes re-derive each project's progress.

pub mod app;
pub mod config;
pub mod currency;
pub mod io;
pub mod logging;
pub mod model;
pub mod store;
pub mod summary;

pub use currency::{Currency, CurrencyConverter, Rates};
pub use store::{Document, RecordStore, StoreError, StoreOptions, StoreResult};
