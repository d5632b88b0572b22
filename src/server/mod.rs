mod admin;
mod catalogs;
pub mod dto;
mod projects;
mod requirements;
pub mod response;
mod router;
mod slug;
mod stories;
mod use_cases;

pub use router::{AppState, create_router};
