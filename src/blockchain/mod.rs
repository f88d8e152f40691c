pub mod ethereum;
pub mod failure;
pub mod traits;

pub use ethereum::EthereumClient;
pub use traits::ContractInvoker;
