pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod types;

pub use claim::TokenClaim;
pub use config::Settings;
pub use constants::*;
pub use error::TitanError;
pub use types::*;
