pub mod client;
pub mod naming;
pub mod transport;

pub use client::HdfsClient;
