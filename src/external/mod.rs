pub mod notion;
pub mod store;

pub use notion::*;
pub use store::*;
