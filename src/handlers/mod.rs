//! 请求处理器模块
//!
//! OPTIONS / GET / POST 以及其余方法的处理器

pub mod forward;
pub mod status;

pub use forward::forward_handler;
pub use status::{method_not_allowed, preflight_handler, status_handler};
