pub mod duplicate_service;
pub mod export_service;
pub mod import_service;
pub mod item_master_service;
pub mod sync_client;

pub use duplicate_service::*;
pub use export_service::*;
pub use import_service::*;
pub use item_master_service::*;
pub use sync_client::*;
