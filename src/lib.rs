// src/lib.rs
//! Client for the BC24 livestock contract: artifact loading, contract
//! binding, signed transactions and read calls over Ethereum JSON-RPC.

pub mod blockchain;
pub mod cli;
pub mod contract;
pub mod core;
pub mod security;
pub mod service;
