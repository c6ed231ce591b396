//! Shared entity types for the ClawOS kernel.
//!
//! Every persisted entity, and the tagged records nested inside them
//! (`contract`, `scope`, `required_deliverable`, `event.data`), lives here
//! as a plain `serde`-derived struct or enum rather than a loosely-typed
//! JSON blob, so every layer above the store works with the same types.

mod action_request;
mod agent;
mod approval;
mod artifact;
mod cap_token;
mod connection;
mod contract;
mod dar;
mod dct;
mod event;
mod ids;
mod kernel_state;
mod objective;
mod risk_policy;
mod scope;
mod session;
mod subagent;
mod task;
mod workspace;

pub use action_request::*;
pub use agent::*;
pub use approval::*;
pub use artifact::*;
pub use cap_token::*;
pub use connection::*;
pub use contract::*;
pub use dar::*;
pub use dct::*;
pub use event::*;
pub use ids::*;
pub use kernel_state::*;
pub use objective::*;
pub use risk_policy::*;
pub use scope::*;
pub use session::*;
pub use subagent::*;
pub use task::*;
pub use workspace::*;
