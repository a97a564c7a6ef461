//! Wallet module - prepaid balances and the append-only ledger.

mod wallet_errors;
mod wallet_model;
mod wallet_service;
mod wallet_traits;

pub use wallet_errors::WalletError;
pub use wallet_model::{
    CreditReceipt, DebitReceipt, DebitRequest, LedgerAudit, NewCredit, RefundReceipt,
    TransactionKind, Wallet, WalletTransaction,
};
pub use wallet_service::WalletService;
pub use wallet_traits::{WalletRepositoryTrait, WalletServiceTrait};
