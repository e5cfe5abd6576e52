pub mod audio;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod database;
pub mod errors;
pub mod history;
pub mod models;
pub mod prefetch;
pub mod providers;
pub mod recommendations;
pub mod service;
pub mod spotify;
pub mod youtube;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::AppError;
pub use service::{Collaborators, SongService};
