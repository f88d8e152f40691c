pub mod artifact;
pub mod handle;

pub use artifact::InterfaceDescription;
pub use handle::ContractHandle;
