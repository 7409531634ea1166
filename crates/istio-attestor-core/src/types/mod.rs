mod attestation;
mod claims;
mod token_review;

pub use attestation::*;
pub use claims::*;
pub use token_review::*;
