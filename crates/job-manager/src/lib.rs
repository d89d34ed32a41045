pub mod jobs;
pub mod service;

pub use jobs::JobRegistry;
pub use service::JobManagerService;
