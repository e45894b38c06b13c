//! Generation collaborator contract: agent context, tools and the generator trait

mod generator;
mod tool;

pub use generator::{AgentContext, Generator};
pub use tool::{Tool, ToolSet};

#[cfg(test)]
pub use generator::mock::MockGenerator;
