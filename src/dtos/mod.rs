mod admin;
mod auth;
mod file;
mod query;
mod task;
mod workflow;

pub use admin::*;
pub use auth::*;
pub use file::*;
pub use query::*;
pub use task::*;
pub use workflow::*;

/// Escape LIKE wildcards in user input to prevent pattern injection.
pub(crate) fn escape_like_pattern(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
