pub mod common;
pub mod game;
pub mod page;
pub mod pull;
pub mod uigf;

pub use game::*;
pub use page::{Page, QueryPage, fields, props};
pub use pull::*;
pub use uigf::*;
