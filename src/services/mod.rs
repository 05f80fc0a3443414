mod registry;
mod session;

pub use registry::{ServiceRegistry, poll_until};
pub use session::Session;
