pub mod service;

pub use service::DaemonService;
