//! Resource implementations

pub mod password;

pub use password::{PasswordConfig, PasswordResource, PasswordState};
