// Re-export all model types
pub use self::catalog::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::quote::*;
pub use self::service::*;
pub use self::validation::*;

mod catalog;
mod enums;
mod errors;
mod quote;
mod service;
mod validation;
