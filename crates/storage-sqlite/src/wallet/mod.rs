//! SQLite storage implementation for wallets and the transaction ledger.

mod model;
mod repository;

pub use model::{NewWalletDB, NewWalletTransactionDB, WalletDB, WalletTransactionDB};
pub use repository::WalletRepository;
pub(crate) use repository::debit_in_tx;
