pub mod credential;

pub use credential::{AccountCredential, PrivateKey};
