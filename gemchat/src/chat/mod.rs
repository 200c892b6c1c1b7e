mod attachment;
mod listener;
mod manager;
mod reply;
mod view;
mod window;

pub use attachment::*;
pub use listener::*;
pub use manager::*;
pub use reply::*;
pub use view::*;
pub use window::*;
