//! CLI command implementations

pub mod checkout;
pub mod clone;
pub mod config;
pub mod diff;
pub mod link;
pub mod post;
pub mod pr;
pub mod publish;
pub mod reclone;
pub mod scaffold;
pub mod stage;
pub mod status;
pub mod workspaces;
