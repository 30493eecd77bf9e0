pub mod access_jwt;
pub mod claims;
pub mod factory;

pub use access_jwt::TokenVerifier;
pub use claims::{Authorities, extract_authorities};
pub use factory::build_verifier;
