//! Infrastructure layer — adapters over external tools.
//!
//! Each adapter implements an application port by shelling out to the
//! corresponding CLI (`terraform`, `docker`, `aws`, `kubectl`) through a
//! `CommandRunner`, or by making HTTP calls. No domain logic lives here
//! beyond translating tool output into domain types.

pub mod command_runner;
pub mod docker;
pub mod http;
pub mod kubectl;
pub mod terraform;
