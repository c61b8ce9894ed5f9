pub mod descriptor;
pub mod enums;
pub mod record;

pub use descriptor::*;
pub use enums::*;
pub use record::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
