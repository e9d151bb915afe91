//! Access to the ledger that hosts the vault registry
//!
//! [`LedgerClient`] is the seam to a real chain. [`MemoryLedger`] runs the
//! registry rules in-process for tests and the local demo.

mod memory;
mod provider;

pub use memory::{MemoryLedger, MemoryLedgerClient};
pub use provider::{LedgerClient, LedgerError, Receipt, TxRequest, TxStatus};
