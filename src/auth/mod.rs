//! Authentication and authorization for Cabinet.
//!
//! This module provides password hashing, account registration and login,
//! and the folder access policy.

mod account;
mod password;
pub mod policy;
pub mod validation;

pub use account::{
    authenticate, delete_user, ensure_admin, register, RegistrationError, RegistrationRequest,
};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use policy::{can_perform, require, Decision, FolderAccess, Operation};
pub use validation::ValidationError;
