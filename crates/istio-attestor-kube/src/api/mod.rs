//! API group modules.

mod authentication;

pub use authentication::AuthenticationApi;
