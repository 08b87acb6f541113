pub mod dedup_cache;
pub mod delay;
pub mod pity;
pub mod time;
pub mod uigf_parser;

pub use dedup_cache::DedupCache;
pub use delay::{Delay, TokioDelay};
pub use pity::calculate_pity;
pub use time::{iso_to_uigf, uigf_to_iso};
pub use uigf_parser::{parse_bytes, parse_file};
