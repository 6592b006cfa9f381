//! Data models shared by the API client and the workflows.

mod task;
mod video;

pub use task::*;
pub use video::*;
