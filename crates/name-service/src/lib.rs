pub mod catalog;
pub mod service;

pub use catalog::{Catalog, FileData};
pub use service::NameServiceImpl;
