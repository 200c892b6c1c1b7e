mod base;
mod memory;
mod sqlite;

pub use base::*;
pub use memory::*;
pub use sqlite::*;
