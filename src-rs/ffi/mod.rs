pub mod session;
pub mod session_util;

pub use session::*;
