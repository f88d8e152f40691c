pub mod abi;
pub mod config;
pub mod domain;
pub mod errors;

pub use config::InvocationConfig;
pub use errors::InvokeError;
