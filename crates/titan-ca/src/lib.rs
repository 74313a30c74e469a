pub mod service;
pub mod store;

pub use service::CaService;
pub use store::{Identity, IdentityStore};
