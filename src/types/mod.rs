//! Core domain types for the kickoff bot.

pub mod ids;

pub use ids::{StateId, WorkItemId};
