// Contract Ledger - Core Library
// Balance and value tracking for procurement contracts: bid items,
// commitments (empenhos) and invoices (notas fiscais).
// Exposes all modules for use in CLI, API server, and tests

pub mod model;
pub mod period;
pub mod balance;     // Balance Calculator - quantity pools per item
pub mod financial;   // Financial Aggregator - item/contract/client/portfolio values
pub mod projection;  // View Projector - filtered dashboard listings
pub mod tabular;     // Header + row tables for export
pub mod mutations;
pub mod store;
pub mod autosave;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use model::{
    BiddingType, Client, Commitment, CommitmentItem, Contract, ContractItem, Invoice,
    InvoiceItem, Portfolio, Quantity, MAX_QUANTITY,
};
pub use period::{parse_date, DateFilter, MonthFilter, YearFilter};
pub use balance::{
    balance_to_commit, balance_to_supply, is_commitment_pending, item_balances,
    orphaned_lines, quantity_committed, quantity_supplied, ItemBalance, OrphanedLine,
};
pub use financial::{
    commitment_value, invoice_value, ClientTotals, ContractTotals, ItemFinancials,
    PortfolioTotals,
};
pub use projection::{
    available_years, project, Dashboard, DashboardCommitment, DashboardContract,
    DashboardInvoice,
};
pub use tabular::{Cell, Table};
pub use mutations::{NewClient, NewCommitment, NewContract, NewInvoice, NewItem};
pub use store::{load_portfolio_json, write_portfolio_json, SnapshotStore, SqliteStore};
pub use autosave::{Autosave, SaveState};
pub use config::Settings;
pub use error::{EntityKind, LedgerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
