pub mod lf_queue;
pub mod logging;
pub mod time;
pub mod types;

pub use types::{OrderId, Side};
