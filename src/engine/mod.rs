//! Pure computation engines for transfer classification and reconciliation.
//!
//! Nothing in here performs I/O; every function works on a snapshot handed in by the caller.

pub mod arbiter;
pub mod audit;
pub mod classifier;
pub mod fee_matcher;
pub mod pipeline;
pub mod reconciliation;

pub use arbiter::{
    arbitrate, replay_principal, split_withdrawal, ArbiterInputs, ArbiterThresholds, Arbitration,
    ArbitrationRule, InvestedSource,
};
pub use audit::{audit_to_csv, build_audit_trail, AuditLine, AuditTrail, TransactionView};
pub use classifier::{
    classify, classify_transfer, Classification, ClassificationOutcome, ClassifierContext,
    InternalAddresses, SkipCounts, SkipReason, VaultRegistry,
};
pub use fee_matcher::{match_fees, FeeMatchConfig, FeeMatchKind, FeeMatchReport};
pub use pipeline::{analyze, AnalysisInput, AnalysisSettings, WalletReport};
pub use reconciliation::{reconcile, FeeRate, Reconciliation, TransferCounts};
