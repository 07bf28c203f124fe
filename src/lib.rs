pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::adapters::storage::LocalStorage;
pub use crate::config::{Cli, Command, Settings};
pub use crate::core::enrollment::{EnrollmentCoordinator, EnrollmentError, Placement};
pub use crate::core::persistence::PortalStore;
pub use crate::core::registry::Registry;
pub use crate::utils::error::{PortalError, Result};
