pub mod client;
pub mod locality;

pub use client::JobClient;
