pub mod challenge;
pub mod executor;
pub mod minter;

pub use challenge::{Challenge, ChallengeCache};
pub use executor::SigningExecutor;
pub use minter::{MintRequest, MintResponse, TokenMinter};
