pub mod client;
pub mod dto;

pub use client::{AdviceClient, AdviceError};
pub use dto::{AdviceEndpoint, AdviceResult};
