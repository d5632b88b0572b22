//! # Reqbase
//!
//! A requirements-management backend, usable both as a standalone binary and
//! as a library.
//!
//! Projects, requirements, use cases and user stories live in SQLite behind
//! token-authenticated HTTP endpoints. Every domain row carries a soft-delete
//! flag; reads only ever see active rows.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use reqbase::server::{AppState, create_router};
//! use reqbase::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/reqbase.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
