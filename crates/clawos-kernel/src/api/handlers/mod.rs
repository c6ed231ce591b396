pub mod admin;
pub mod approvals;
pub mod identity;
pub mod sessions;
pub mod subagents;
pub mod system;
pub mod tasks;
pub mod tokens;
