//! Rule-based classification of raw transfers into wallet transactions.
//!
//! Rules are evaluated in table order and the first match wins. The table is the single place
//! where priority is decided; nothing else in the classifier breaks ties.

use crate::domain::{Address, Decimal, RawTransfer, Transaction, TransactionType};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Vault address → display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultRegistry {
    vaults: HashMap<Address, String>,
}

impl VaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vault(mut self, address: Address, name: impl Into<String>) -> Self {
        self.vaults.insert(address, name.into());
        self
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.vaults.contains_key(address)
    }

    pub fn name_of(&self, address: &Address) -> Option<&str> {
        self.vaults.get(address).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vaults.is_empty()
    }
}

impl FromIterator<(Address, String)> for VaultRegistry {
    fn from_iter<I: IntoIterator<Item = (Address, String)>>(iter: I) -> Self {
        Self {
            vaults: iter.into_iter().collect(),
        }
    }
}

/// Protocol-owned addresses whose transfers are noise to the holder.
///
/// Membership is exact for listed addresses; prefixes cover whole contract families.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InternalAddresses {
    exact: HashSet<Address>,
    prefixes: Vec<String>,
}

impl InternalAddresses {
    pub fn new(exact: impl IntoIterator<Item = Address>, prefixes: Vec<String>) -> Self {
        Self {
            exact: exact.into_iter().collect(),
            prefixes: prefixes
                .into_iter()
                .map(|p| p.trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.exact.contains(address) || self.prefixes.iter().any(|p| address.has_prefix(p))
    }
}

/// Immutable address context the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierContext {
    pub wallet: Address,
    pub treasury: Address,
    pub vaults: VaultRegistry,
    pub internal: InternalAddresses,
    /// Another address owned by the same holder; transfers to/from it are not external flows.
    pub secondary: Option<Address>,
    /// Base-unit scale of the token's `value` field.
    pub token_decimals: u32,
}

impl ClassifierContext {
    fn is_wallet(&self, address: &Address) -> bool {
        *address == self.wallet
    }

    fn is_treasury(&self, address: &Address) -> bool {
        *address == self.treasury
    }

    fn is_external(&self, address: &Address) -> bool {
        !self.internal.contains(address) && self.secondary.as_ref() != Some(address)
    }
}

/// One entry of the classification table.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&RawTransfer, &ClassifierContext) -> bool,
    pub outcome: TransactionType,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Priority-ordered classification table. A transfer matching none of them is dropped.
pub static RULES: [Rule; 6] = [
    Rule {
        name: "wallet_to_treasury",
        applies: |t, ctx| ctx.is_wallet(&t.from) && ctx.is_treasury(&t.to),
        outcome: TransactionType::Fee,
    },
    // A refund from the treasury is still incoming cash.
    Rule {
        name: "treasury_to_wallet",
        applies: |t, ctx| ctx.is_wallet(&t.to) && ctx.is_treasury(&t.from),
        outcome: TransactionType::Receive,
    },
    Rule {
        name: "vault_to_wallet",
        applies: |t, ctx| ctx.is_wallet(&t.to) && ctx.vaults.contains(&t.from),
        outcome: TransactionType::Withdraw,
    },
    Rule {
        name: "wallet_to_vault",
        applies: |t, ctx| ctx.is_wallet(&t.from) && ctx.vaults.contains(&t.to),
        outcome: TransactionType::Deposit,
    },
    Rule {
        name: "external_to_wallet",
        applies: |t, ctx| ctx.is_wallet(&t.to) && ctx.is_external(&t.from),
        outcome: TransactionType::Receive,
    },
    Rule {
        name: "wallet_to_external",
        applies: |t, ctx| ctx.is_wallet(&t.from) && ctx.is_external(&t.to),
        outcome: TransactionType::Send,
    },
];

/// Why a transfer produced no transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    ZeroValue,
    UnparsableValue,
    /// Above [`Decimal::max_amount`]; no real transfer of the token is that large.
    OutOfRange,
    /// No rule matched: protocol-internal movement.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Classified(Transaction),
    Skipped(SkipReason),
}

/// First rule in table order that applies to `transfer`.
pub fn matching_rule(transfer: &RawTransfer, ctx: &ClassifierContext) -> Option<&'static Rule> {
    RULES.iter().find(|rule| (rule.applies)(transfer, ctx))
}

/// Classify a single transfer. `seq` is its index in the raw input list.
pub fn classify_transfer(
    transfer: &RawTransfer,
    seq: usize,
    ctx: &ClassifierContext,
) -> Classification {
    let Some(amount) = Decimal::from_base_units(&transfer.value, ctx.token_decimals) else {
        return Classification::Skipped(SkipReason::UnparsableValue);
    };
    if amount.is_zero() {
        return Classification::Skipped(SkipReason::ZeroValue);
    }
    if !amount.is_within_amount_bounds() {
        return Classification::Skipped(SkipReason::OutOfRange);
    }

    let Some(rule) = matching_rule(transfer, ctx) else {
        return Classification::Skipped(SkipReason::Internal);
    };

    let vault_name = match rule.outcome {
        TransactionType::Withdraw => ctx.vaults.name_of(&transfer.from),
        TransactionType::Deposit => ctx.vaults.name_of(&transfer.to),
        _ => None,
    }
    .map(str::to_string);

    Classification::Classified(Transaction::from_transfer(
        transfer,
        seq,
        rule.outcome,
        amount,
        vault_name,
    ))
}

/// Per-reason counts of dropped transfers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipCounts {
    pub zero_value: usize,
    pub unparsable: usize,
    pub out_of_range: usize,
    pub internal: usize,
    /// Rows the transfer source could not decode at all.
    pub malformed: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::ZeroValue => self.zero_value += 1,
            SkipReason::UnparsableValue => self.unparsable += 1,
            SkipReason::OutOfRange => self.out_of_range += 1,
            SkipReason::Internal => self.internal += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.zero_value + self.unparsable + self.out_of_range + self.internal + self.malformed
    }
}

/// Result of classifying a full transfer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOutcome {
    /// Classified transactions, in raw input order.
    pub transactions: Vec<Transaction>,
    pub raw_count: usize,
    pub skipped: SkipCounts,
}

impl ClassificationOutcome {
    pub fn classified_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.total()
    }
}

/// Classify every transfer in order.
pub fn classify(transfers: &[RawTransfer], ctx: &ClassifierContext) -> ClassificationOutcome {
    let mut transactions = Vec::with_capacity(transfers.len());
    let mut skipped = SkipCounts::default();

    for (seq, transfer) in transfers.iter().enumerate() {
        match classify_transfer(transfer, seq, ctx) {
            Classification::Classified(tx) => transactions.push(tx),
            Classification::Skipped(reason) => skipped.record(reason),
        }
    }

    ClassificationOutcome {
        transactions,
        raw_count: transfers.len(),
        skipped,
    }
}
