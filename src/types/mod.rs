mod kind;
mod models;

pub use kind::{CatalogKind, ElementKind};
pub use models::*;
