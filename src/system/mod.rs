pub mod differ;
pub mod gpu;
pub mod platform;
pub mod relaunch;
pub mod scheduler;
pub mod selection;
pub mod snapshot;
pub mod source;
pub mod terminate;
