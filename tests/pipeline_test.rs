use std::str::FromStr;
use yieldtrail::domain::{Address, Decimal, RawTransfer, TimeSec, TransactionType};
use yieldtrail::engine::{
    analyze, classify, classify_transfer, match_fees, reconcile, AnalysisInput, AnalysisSettings,
    Classification, ClassifierContext, FeeMatchConfig, FeeRate, InternalAddresses, SkipReason,
    TransferCounts, VaultRegistry, WalletReport,
};
use yieldtrail::ledger::{DepositLedger, InMemoryLedgerStore};

const WALLET: &str = "0x1111111111111111111111111111111111111111";
const TREASURY: &str = "0x2222222222222222222222222222222222222222";
const VAULT: &str = "0x3333333333333333333333333333333333333333";
const ROUTER: &str = "0x4444444444444444444444444444444444444444";
const FRIEND: &str = "0x5555555555555555555555555555555555555555";
const SECONDARY: &str = "0x6666666666666666666666666666666666666666";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn ctx() -> ClassifierContext {
    ClassifierContext {
        wallet: Address::new(WALLET),
        treasury: Address::new(TREASURY),
        vaults: VaultRegistry::new().with_vault(Address::new(VAULT), "USDC Core"),
        internal: InternalAddresses::new(
            vec![Address::new(ROUTER)],
            vec!["0x9999".to_string()],
        ),
        secondary: Some(Address::new(SECONDARY)),
        token_decimals: 6,
    }
}

/// `amount` in whole-token decimal notation, converted to 6-decimal base units.
fn transfer(hash: &str, from: &str, to: &str, amount: &str, ts: i64) -> RawTransfer {
    let units = (d(amount) * d("1000000")).to_canonical_string();
    RawTransfer::new(hash, Address::new(from), Address::new(to), units, TimeSec::new(ts))
}

fn run(transfers: &[RawTransfer], balance: &str) -> WalletReport {
    let c = ctx();
    analyze(
        AnalysisInput {
            transfers,
            malformed_rows: 0,
            context: &c,
            current_balance: d(balance),
            ledger_total: Decimal::zero(),
        },
        &AnalysisSettings::default(),
    )
}

#[test]
fn scenario_external_receive() {
    let report = run(&[transfer("0x01", FRIEND, WALLET, "100", 1000)], "100");
    assert_eq!(report.transactions.len(), 1);
    let tx = &report.transactions[0].transaction;
    assert_eq!(tx.tx_type, TransactionType::Receive);
    assert_eq!(tx.amount.to_fixed_string(2), "100.00");
}

#[test]
fn scenario_vault_deposit() {
    let report = run(&[transfer("0x01", WALLET, VAULT, "40", 1000)], "40");
    assert_eq!(report.transactions.len(), 1);
    let tx = &report.transactions[0].transaction;
    assert_eq!(tx.tx_type, TransactionType::Deposit);
    assert_eq!(tx.amount.to_fixed_string(2), "40.00");
    assert_eq!(tx.vault_name.as_deref(), Some("USDC Core"));
}

#[test]
fn scenario_withdrawal_with_fee() {
    let report = run(
        &[
            transfer("0x01", VAULT, WALLET, "45", 5000),
            transfer("0x02", WALLET, TREASURY, "0.75", 5010),
        ],
        "0",
    );

    let withdraw = report
        .transactions
        .iter()
        .map(|v| &v.transaction)
        .find(|t| t.tx_type == TransactionType::Withdraw)
        .unwrap();
    assert_eq!(withdraw.amount.to_fixed_string(2), "45.00");
    let fee = withdraw.associated_fee.as_ref().unwrap();
    assert_eq!(fee.amount, d("0.75"));
    assert_eq!(fee.tx_hash, "0x02");

    assert_eq!(report.summary.total_fees, d("0.75"));
    assert_eq!(report.summary.gross_yield_realized.to_fixed_string(2), "5.00");
    assert_eq!(report.summary.realized_earnings.to_fixed_string(2), "4.25");
    assert!(report.checks.realized_earnings_check.passed);
}

#[test]
fn scenario_unmatched_fee_becomes_send() {
    let report = run(
        &[
            transfer("0x01", VAULT, WALLET, "45", 1000),
            transfer("0x02", WALLET, TREASURY, "2", 1000 + 301),
        ],
        "0",
    );

    let sent = report
        .transactions
        .iter()
        .map(|v| &v.transaction)
        .find(|t| t.tx_hash == "0x02")
        .unwrap();
    assert_eq!(sent.tx_type, TransactionType::Send);
    assert_eq!(sent.amount.to_fixed_string(2), "2.00");
    assert!(sent.reclassified);
    assert_eq!(report.summary.total_fees, Decimal::zero());
    assert_eq!(report.summary.total_sends, d("2"));
    assert_eq!(report.fee_matching.reclassified, 1);
}

#[test]
fn scenario_internal_noise_is_counted() {
    let mut transfers = vec![
        transfer("0x01", FRIEND, WALLET, "100", 1),
        transfer("0x02", WALLET, VAULT, "50", 2),
        transfer("0x03", VAULT, WALLET, "10", 3),
        transfer("0x04", WALLET, FRIEND, "5", 4),
        transfer("0x05", FRIEND, WALLET, "7", 5),
        transfer("0x06", WALLET, VAULT, "20", 6),
        transfer("0x07", TREASURY, WALLET, "1", 7),
    ];
    // Router, prefix-matched contract, and the holder's own secondary address.
    transfers.push(transfer("0x08", WALLET, ROUTER, "3", 8));
    transfers.push(transfer(
        "0x09",
        "0x9999000000000000000000000000000000000001",
        WALLET,
        "4",
        9,
    ));
    transfers.push(transfer("0x0a", SECONDARY, WALLET, "6", 10));

    let outcome = classify(&transfers, &ctx());
    assert_eq!(outcome.raw_count, 10);
    assert_eq!(outcome.classified_count(), 7);
    assert_eq!(outcome.skipped.internal, 3);

    let report = run(&transfers, "0");
    assert!(report.checks.transaction_count_check.passed);
    assert_eq!(report.checks.transaction_count_check.expected, d("10"));
    assert_eq!(report.checks.transaction_count_check.actual, d("10"));
}

#[test]
fn zero_and_unparsable_values_are_dropped_not_errors() {
    let c = ctx();
    let zero = RawTransfer::new(
        "0x01",
        Address::new(FRIEND),
        Address::new(WALLET),
        "0",
        TimeSec::new(1),
    );
    let garbage = RawTransfer::new(
        "0x02",
        Address::new(FRIEND),
        Address::new(WALLET),
        "1e6",
        TimeSec::new(2),
    );
    assert_eq!(
        classify_transfer(&zero, 0, &c),
        Classification::Skipped(SkipReason::ZeroValue)
    );
    assert_eq!(
        classify_transfer(&garbage, 1, &c),
        Classification::Skipped(SkipReason::UnparsableValue)
    );

    let report = run(&[zero, garbage], "0");
    assert!(report.transactions.is_empty());
    assert_eq!(report.skipped.zero_value, 1);
    assert_eq!(report.skipped.unparsable, 1);
    assert!(report.checks.transaction_count_check.passed);
}

fn mixed_history() -> Vec<RawTransfer> {
    vec![
        transfer("0x01", FRIEND, WALLET, "500", 100),
        transfer("0x02", WALLET, VAULT, "400", 200),
        transfer("0x03", VAULT, WALLET, "120", 1_000),
        transfer("0x04", WALLET, TREASURY, "1.5", 1_030),
        transfer("0x05", VAULT, WALLET, "60", 2_000),
        transfer("0x06", WALLET, TREASURY, "0.3", 2_000),
        transfer("0x07", WALLET, TREASURY, "9", 9_000),
        transfer("0x08", WALLET, FRIEND, "25", 9_500),
        transfer("0x09", TREASURY, WALLET, "0.2", 9_600),
        transfer("0x0a", WALLET, ROUTER, "11", 9_700),
        transfer("0x0b", WALLET, VAULT, "100", 10_000),
    ]
}

#[test]
fn classification_is_independent_of_input_order() {
    let c = ctx();
    let forward = mixed_history();
    let mut reversed = forward.clone();
    reversed.reverse();

    let kind = |transfers: &[RawTransfer]| -> Vec<(String, Option<TransactionType>)> {
        let mut kinds: Vec<_> = transfers
            .iter()
            .enumerate()
            .map(|(seq, t)| {
                let kind = match classify_transfer(t, seq, &c) {
                    Classification::Classified(tx) => Some(tx.tx_type),
                    Classification::Skipped(_) => None,
                };
                (t.tx_hash.clone(), kind)
            })
            .collect();
        kinds.sort_by(|a, b| a.0.cmp(&b.0));
        kinds
    };

    assert_eq!(kind(&forward), kind(&reversed));
}

#[test]
fn every_fee_is_consumed_or_reclassified() {
    let c = ctx();
    let outcome = classify(&mixed_history(), &c);
    let original_fees: Vec<String> = outcome
        .transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Fee)
        .map(|t| t.tx_hash.clone())
        .collect();
    assert_eq!(original_fees.len(), 3);

    let mut transactions = outcome.transactions;
    let report = match_fees(&mut transactions, &FeeMatchConfig::default());

    for hash in &original_fees {
        let tx = transactions.iter().find(|t| &t.tx_hash == hash).unwrap();
        let consumed_by = transactions
            .iter()
            .filter(|w| {
                w.associated_fee
                    .as_ref()
                    .map(|f| &f.tx_hash == hash)
                    .unwrap_or(false)
            })
            .count();
        match tx.tx_type {
            TransactionType::Fee => assert_eq!(consumed_by, 1, "fee {} not consumed once", hash),
            TransactionType::Send => {
                assert_eq!(consumed_by, 0, "reclassified fee {} also consumed", hash);
                assert!(tx.reclassified);
            }
            other => panic!("fee {} ended up as {:?}", hash, other),
        }
    }
    assert_eq!(report.matched() + report.reclassified, original_fees.len());
    assert!(transactions
        .iter()
        .filter(|t| t.associated_fee.is_some())
        .all(|t| t.tx_type == TransactionType::Withdraw));
}

#[test]
fn net_deposited_identity_is_exact() {
    let c = ctx();
    let outcome = classify(&mixed_history(), &c);
    let counts = TransferCounts {
        raw: outcome.raw_count,
        classified: outcome.classified_count(),
        skipped: outcome.skipped_count(),
    };
    let mut transactions = outcome.transactions;
    match_fees(&mut transactions, &FeeMatchConfig::default());

    for balance in ["0", "250.5", "1000000"] {
        let r = reconcile(&transactions, d(balance), counts, FeeRate::default());
        assert_eq!(
            r.summary.total_deposited_to_vaults - r.summary.total_withdrawn_from_vaults,
            r.summary.net_deposited
        );
        assert!(r.checks.net_deposited_check.passed);
        assert!(r.checks.transaction_count_check.passed);
    }
}

#[test]
fn running_balance_ends_at_net_wallet_flow() {
    let report = run(&mixed_history(), "330");
    let last = report.transactions.last().unwrap();
    // 500 - 400 + 120 - 1.5 + 60 - 0.3 - 9 - 25 + 0.2 - 100
    assert_eq!(last.balance_after, d("144.4"));
    let timestamps: Vec<i64> = report
        .transactions
        .iter()
        .map(|v| v.transaction.timestamp.as_secs())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn ledger_never_goes_negative() {
    let ledger = DepositLedger::new(std::sync::Arc::new(InMemoryLedgerStore::new()));
    let wallet = Address::new(WALLET);

    let steps: [(&str, &str, &str); 8] = [
        ("deposit", "100", ""),
        ("withdraw", "500", "120"),
        ("deposit", "10", ""),
        ("withdraw", "3", "-1"),
        ("withdraw", "1", "1"),
        ("deposit", "0.5", ""),
        ("withdraw", "0.25", "0.5"),
        ("withdraw", "1000000", "0.0001"),
    ];
    for (kind, a, b) in steps {
        let record = match kind {
            "deposit" => ledger.record_deposit(&wallet, d(a)).await.unwrap(),
            _ => ledger.record_withdrawal(&wallet, d(a), d(b)).await.unwrap(),
        };
        assert!(!record.total_deposited.is_negative());
    }
    assert_eq!(ledger.get_total_deposited(&wallet).await.unwrap(), Decimal::zero());
}
