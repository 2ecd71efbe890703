use std::sync::Arc;

use crate::dispatch::CommandDescriptor;

pub mod issues;

pub use issues::IssuesCommand;

/// The commands this gateway ships with. Registered once at startup.
pub fn built_in() -> Vec<CommandDescriptor> {
    vec![CommandDescriptor::detached("/issues", Arc::new(IssuesCommand))]
}
