pub mod keys;
pub mod pem;
pub mod signer;

pub use keys::{sign_nonce, IdentityKeys};
pub use pem::{fingerprint, normalize_pem, parse_public_key_pem, verify_nonce_signature};
pub use signer::{signer_for, EcdsaSigner, RsaSigner, TokenSigner};
