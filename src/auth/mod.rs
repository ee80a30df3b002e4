pub mod controller;
pub mod dto;
pub mod firebase;
pub mod services;

pub use controller::AuthController;
pub use dto::UserSession;
pub use firebase::FirebaseAuth;
pub use services::{refresh_if_expired, AuthBackend, AuthError};
