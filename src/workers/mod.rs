mod dispatch_loop;
mod session_cleanup;
mod timeout_loop;

pub use dispatch_loop::{dispatch_loop, dispatch_once};
pub use session_cleanup::session_cleanup_loop;
pub use timeout_loop::timeout_loop;
