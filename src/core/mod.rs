pub mod consistency;
pub mod enrollment;
pub mod persistence;
pub mod registry;
pub mod reports;

pub use crate::domain::model::CourseSection;
pub use crate::domain::ports::{ConfigProvider, Storage};
pub use crate::domain::user::User;
pub use crate::utils::error::Result;
