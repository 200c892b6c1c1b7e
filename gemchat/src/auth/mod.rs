mod flow;
mod manager;

pub use flow::*;
pub use manager::*;
