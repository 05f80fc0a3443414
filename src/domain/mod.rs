mod compose;
pub mod traits;

pub use compose::{
    ComposeSpec, ComposeTool, DEFAULT_COMPOSE_COMMAND, DEFAULT_PROJECT_PREFIX, ProjectName,
    WaitOptions,
};
pub use traits::{CommandRunner, ReadinessCheck};
