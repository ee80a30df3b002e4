pub mod advice;
pub mod auth;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod firebase;
pub mod flows;
pub mod profile;
pub mod state;
pub mod storage;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use error::AppError;
pub use state::AppState;
