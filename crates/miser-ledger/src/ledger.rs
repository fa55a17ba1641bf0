use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use miser_core::{from_decimal, lookup_currency, to_decimal, Id, MiserError};
use miser_crypto::generate_id;
use miser_journal::{
    Account, AccountType, BalanceSnapshot, ItemKind, TagBinding, Transaction,
    TransactionState, SYSTEM_TAG_INITIAL,
};
use miser_registry::{AccountRegistry, BalanceRegistry, TagBindingRegistry, TagRegistry, TransactionRegistry};
use tracing::{info, warn};

use crate::sign::{self, Side};

/// The ledger service: the one place that enforces the cross-registry
/// invariants of double-entry accounting. Individual registries only know
/// about their own entity type; `Ledger` is what makes "post a transaction"
/// or "open an account" atomic across all of them.
pub struct Ledger {
    accounts: Arc<AccountRegistry>,
    transactions: Arc<TransactionRegistry>,
    balances: Arc<BalanceRegistry>,
    tags: Arc<TagRegistry>,
    tag_bindings: Arc<TagBindingRegistry>,
    /// Serializes the two composite operations (`open_account`,
    /// `post_transaction`) so their multi-registry invariants hold even
    /// under concurrent callers. Plain reads only take the individual
    /// registries' read locks and do not need this lock.
    lock: Mutex<()>,
}

impl Ledger {
    pub fn new(
        accounts: Arc<AccountRegistry>,
        transactions: Arc<TransactionRegistry>,
        balances: Arc<BalanceRegistry>,
        tags: Arc<TagRegistry>,
        tag_bindings: Arc<TagBindingRegistry>,
    ) -> Self {
        Self {
            accounts,
            transactions,
            balances,
            tags,
            tag_bindings,
            lock: Mutex::new(()),
        }
    }

    /// Opens a new account, synthesizes its initial (self-transfer)
    /// transaction and balance snapshot, and tags both with the system
    /// `Initial` tag.
    pub fn open_account(
        &self,
        name: &str,
        account_type: AccountType,
        description: &str,
        currency_code: &str,
        opened_at: DateTime<Utc>,
        initial_balance: f64,
    ) -> Result<Account, MiserError> {
        let _guard = self.lock.lock().unwrap();

        if name.trim().is_empty() {
            return Err(MiserError::BlankName);
        }
        if lookup_currency(currency_code).is_none() {
            return Err(MiserError::UnsupportedCurrency(currency_code.to_string()));
        }

        let account = Account::new(
            generate_id(),
            name,
            account_type,
            description,
            currency_code,
            opened_at,
        );
        self.accounts.add(account.clone());
        self.accounts.enqueue(account.clone());

        let initial_tx = Transaction {
            id: generate_id(),
            source: account.id.clone(),
            dest: account.id.clone(),
            instant: opened_at,
            memo: "initial balance".into(),
            value: from_decimal(initial_balance),
            state: TransactionState::Uncleared,
            deleted: false,
        };
        self.transactions.add(initial_tx.clone());
        self.transactions.enqueue(initial_tx.clone());

        let snapshot = BalanceSnapshot {
            id: generate_id(),
            account: account.id.clone(),
            transaction: initial_tx.id.clone(),
            value: from_decimal(initial_balance),
            instant: opened_at,
        };
        self.balances.add(snapshot.clone());
        self.balances.enqueue(snapshot.clone());

        let tag = self.tags.get_or_create(SYSTEM_TAG_INITIAL, generate_id);
        self.bind_tag(&tag.id, &initial_tx.id, ItemKind::TransactionTag);
        self.bind_tag(&tag.id, &snapshot.id, ItemKind::BalanceTag);

        info!(account = %account.id, %account_type, "account opened");
        Ok(account)
    }

    fn bind_tag(&self, tag: &Id, item: &Id, kind: ItemKind) {
        let binding = TagBinding { id: generate_id(), tag: tag.clone(), item: item.clone(), kind };
        if self.tag_bindings.add(binding.clone()) == 1 {
            self.tag_bindings.enqueue(binding);
        }
    }

    /// Posts a transaction from `source` to `dest`. Validates every
    /// precondition before mutating anything; a rejected transaction
    /// leaves every registry untouched.
    pub fn post_transaction(
        &self,
        source: &Id,
        dest: &Id,
        instant: DateTime<Utc>,
        amount: f64,
        memo: &str,
    ) -> Result<Transaction, MiserError> {
        let _guard = self.lock.lock().unwrap();

        if amount <= 0.0 {
            warn!(%source, %dest, amount, "rejected transaction: non-positive amount");
            return Err(MiserError::NonPositiveAmount);
        }
        if instant == DateTime::<Utc>::default() {
            warn!(%source, %dest, "rejected transaction: zero instant");
            return Err(MiserError::ZeroInstant);
        }
        let value = from_decimal(amount);

        let src_account = self
            .accounts
            .get(source)
            .ok_or_else(|| MiserError::AccountNotFound(source.clone()))?;
        let dst_account = self
            .accounts
            .get(dest)
            .ok_or_else(|| MiserError::AccountNotFound(dest.clone()))?;

        if instant < src_account.opened_at {
            return Err(MiserError::BeforeAccountOpened(source.clone()));
        }
        if instant < dst_account.opened_at {
            return Err(MiserError::BeforeAccountOpened(dest.clone()));
        }

        let current = self.current_balance(source)?;
        if current.value < value {
            warn!(%source, have = current.value, need = value, "rejected transaction: overdraft");
            return Err(MiserError::Overdraft { have: current.value, need: value });
        }

        let src_type = src_account.account_type()?;
        let dst_type = dst_account.account_type()?;
        if src_type == dst_type {
            warn!(%source, %dest, "rejected transaction: same account type on both sides");
            return Err(MiserError::SameAccountType);
        }

        let tx = Transaction {
            id: generate_id(),
            source: source.clone(),
            dest: dest.clone(),
            instant,
            memo: memo.into(),
            value,
            state: TransactionState::Uncleared,
            deleted: false,
        };
        self.transactions.add(tx.clone());
        self.transactions.enqueue(tx.clone());

        let src_delta = sign::delta(src_type, Side::Source, value);
        let dst_delta = sign::delta(dst_type, Side::Destination, value);
        self.apply_balance_delta(source, &tx, src_delta);
        self.apply_balance_delta(dest, &tx, dst_delta);

        info!(tx = %tx.id, %source, %dest, value, "transaction posted");
        Ok(tx)
    }

    /// Inserts `tx`'s balance snapshot for `account` at the right point in
    /// the chronological chain, then shifts every later snapshot on this
    /// account by the same `delta` — the retroactive propagation that lets
    /// a transaction be posted with a past instant without rewriting the
    /// journal's append-only history.
    fn apply_balance_delta(&self, account: &Id, tx: &Transaction, delta: i64) {
        let prev_tx = self
            .transactions
            .first_before_tx(account, &tx.id)
            .expect("the initial transaction guarantees a predecessor");
        let prev_snapshot = self
            .balances
            .get(account, &prev_tx.id)
            .expect("every visible transaction has a balance snapshot");

        let new_snapshot = BalanceSnapshot {
            id: generate_id(),
            account: account.clone(),
            transaction: tx.id.clone(),
            value: prev_snapshot.value + delta,
            instant: tx.instant,
        };
        self.balances.add(new_snapshot.clone());
        self.balances.enqueue(new_snapshot);

        for later_tx in self.transactions.all_after_tx(account, &tx.id) {
            let old_snapshot = self
                .balances
                .get(account, &later_tx.id)
                .expect("a later transaction must already have a balance snapshot");
            let shifted = BalanceSnapshot {
                id: generate_id(),
                account: account.clone(),
                transaction: later_tx.id.clone(),
                value: old_snapshot.value + delta,
                instant: later_tx.instant,
            };
            self.balances.add(shifted.clone());
            self.balances.enqueue(shifted);
        }
    }

    /// The balance snapshot attached to `account`'s chronologically last
    /// transaction. Every open account has at least its initial
    /// transaction, so this only fails for an unknown account.
    pub fn current_balance(&self, account: &Id) -> Result<BalanceSnapshot, MiserError> {
        let last_tx = self
            .transactions
            .last(account)
            .ok_or_else(|| MiserError::AccountNotFound(account.clone()))?;
        self.balances
            .get(account, &last_tx.id)
            .ok_or(MiserError::BalanceNotFound { account: account.clone(), transaction: last_tx.id })
    }

    /// `current_balance`, converted to a decimal amount.
    pub fn amount(&self, account: &Id) -> Result<f64, MiserError> {
        Ok(to_decimal(self.current_balance(account)?.value))
    }

    /// Marks `account` and every transaction touching it as deleted.
    /// Existing balance snapshots are left untouched: `amount` on a
    /// deleted account keeps returning its last pre-deletion balance
    /// (see DESIGN.md for the reasoning).
    pub fn delete_account(&self, account: &Id) -> Result<(), MiserError> {
        let _guard = self.lock.lock().unwrap();
        let mut existing = self
            .accounts
            .get(account)
            .ok_or_else(|| MiserError::AccountNotFound(account.clone()))?;
        existing.deleted = true;
        self.accounts.add(existing.clone());
        self.accounts.enqueue(existing);

        for mut tx in self.transactions.touching(account) {
            tx.deleted = true;
            self.transactions.add(tx.clone());
            self.transactions.enqueue(tx);
        }
        info!(%account, "account deleted");
        Ok(())
    }

    pub fn set_transaction_state(
        &self,
        tx_id: &Id,
        state: TransactionState,
    ) -> Result<Transaction, MiserError> {
        let mut tx = self
            .transactions
            .get(tx_id)
            .ok_or_else(|| MiserError::TransactionNotFound(tx_id.clone()))?;
        tx.state = state;
        self.transactions.add(tx.clone());
        self.transactions.enqueue(tx.clone());
        Ok(tx)
    }

    /// Net of every account's current balance, signed by type:
    /// `Assets + Expenses - Liabilities - Equity - Income`. Zero for a
    /// consistent ledger. Read-only diagnostic, recovered from the
    /// original source's trial-balance check.
    pub fn trial_balance(&self) -> Result<f64, MiserError> {
        let mut net = 0.0;
        for account in self.accounts.list() {
            let amount = self.amount(&account.id)?;
            let signed = match account.account_type()? {
                AccountType::Asset | AccountType::Expense => amount,
                AccountType::Liability | AccountType::Equity | AccountType::Income => -amount,
            };
            net += signed;
        }
        Ok(net)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_ledger() -> Ledger {
        Ledger::new(
            Arc::new(AccountRegistry::new()),
            Arc::new(TransactionRegistry::new()),
            Arc::new(BalanceRegistry::new()),
            Arc::new(TagRegistry::new()),
            Arc::new(TagBindingRegistry::new()),
        )
    }

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }

    #[test]
    fn opening_a_zero_balance_account_tags_its_initial_transaction() {
        let ledger = new_ledger();
        let account = ledger
            .open_account("Deposit", AccountType::Asset, "", "USD", t(0), 0.0)
            .unwrap();

        assert_eq!(ledger.accounts.list().len(), 1);
        let initial = ledger.transactions.last(&account.id).unwrap();
        assert!(initial.is_initial());
        let snapshot = ledger.balances.get(&account.id, &initial.id).unwrap();
        assert_eq!(snapshot.value, 0);

        let tag = ledger.tags.get_by_name(SYSTEM_TAG_INITIAL).unwrap();
        assert_eq!(
            ledger.tag_bindings.items_for_tag_kind(&tag.id, ItemKind::TransactionTag),
            vec![initial.id.clone()]
        );
        assert_eq!(
            ledger.tag_bindings.items_for_tag_kind(&tag.id, ItemKind::BalanceTag),
            vec![snapshot.id]
        );
    }

    #[test]
    fn simple_expense_moves_value_between_accounts() {
        let ledger = new_ledger();
        let cash = ledger
            .open_account("Cash", AccountType::Asset, "", "USD", t(0), 1555.12)
            .unwrap();
        let market = ledger
            .open_account("Market", AccountType::Expense, "", "USD", t(0), 343.11)
            .unwrap();

        ledger
            .post_transaction(&cash.id, &market.id, t(1), 1.53, "groceries")
            .unwrap();

        approx(ledger.amount(&cash.id).unwrap(), 1553.59);
        approx(ledger.amount(&market.id).unwrap(), 344.64);
    }

    #[test]
    fn retroactive_insertion_shifts_only_later_snapshots() {
        let ledger = new_ledger();
        let wallet = ledger
            .open_account("Wallet", AccountType::Asset, "", "USD", t(0), 200.37)
            .unwrap();
        let bazaar = ledger
            .open_account("Bazaar", AccountType::Expense, "", "USD", t(0), 0.50)
            .unwrap();

        let t1 = t(0) + Duration::days(19) + Duration::hours(7);
        let t2 = t1 + Duration::hours(7);
        ledger.post_transaction(&wallet.id, &bazaar.id, t1, 2.13, "").unwrap();
        ledger.post_transaction(&wallet.id, &bazaar.id, t2, 5.17, "").unwrap();

        let t3 = t1 + Duration::hours(3);
        let tx3 = ledger
            .post_transaction(&wallet.id, &bazaar.id, t3, 150.00, "")
            .unwrap();

        let snap_t1_wallet = ledger
            .balances
            .get(&wallet.id, &ledger.transactions.first_before(&wallet.id, t1 + Duration::seconds(1)).unwrap().id)
            .unwrap();
        approx(snap_t1_wallet.value, 198.24);

        let snap_t3_wallet = ledger.balances.get(&wallet.id, &tx3.id).unwrap();
        approx(snap_t3_wallet.value, 48.24);
        let snap_t3_bazaar = ledger.balances.get(&bazaar.id, &tx3.id).unwrap();
        approx(snap_t3_bazaar.value, 152.63);

        approx(ledger.amount(&wallet.id).unwrap(), 43.07);
        approx(ledger.amount(&bazaar.id).unwrap(), 157.80);
    }

    #[test]
    fn double_entry_symmetry_holds_across_posting() {
        let ledger = new_ledger();
        let src = ledger
            .open_account("Checking", AccountType::Asset, "", "USD", t(0), 500.0)
            .unwrap();
        let dst = ledger
            .open_account("Rent", AccountType::Expense, "", "USD", t(0), 0.0)
            .unwrap();

        let before = ledger.amount(&src.id).unwrap() + ledger.amount(&dst.id).unwrap();
        ledger.post_transaction(&src.id, &dst.id, t(1), 120.0, "rent").unwrap();
        let after = ledger.amount(&src.id).unwrap() + ledger.amount(&dst.id).unwrap();
        approx(before, after);
    }

    #[test]
    fn overdraft_by_one_millionth_is_rejected_and_nothing_changes() {
        let ledger = new_ledger();
        let a = ledger
            .open_account("A", AccountType::Asset, "", "USD", t(0), 10.0)
            .unwrap();
        let b = ledger
            .open_account("B", AccountType::Expense, "", "USD", t(0), 0.0)
            .unwrap();

        let before = ledger.amount(&a.id).unwrap();
        let err = ledger
            .post_transaction(&a.id, &b.id, t(1), 10.000001, "")
            .unwrap_err();
        assert!(matches!(err, MiserError::Overdraft { .. }));
        approx(ledger.amount(&a.id).unwrap(), before);
    }

    #[test]
    fn zero_amount_transaction_is_rejected() {
        let ledger = new_ledger();
        let a = ledger.open_account("A", AccountType::Asset, "", "USD", t(0), 10.0).unwrap();
        let b = ledger.open_account("B", AccountType::Expense, "", "USD", t(0), 0.0).unwrap();
        assert!(matches!(
            ledger.post_transaction(&a.id, &b.id, t(1), 0.0, ""),
            Err(MiserError::NonPositiveAmount)
        ));
    }

    #[test]
    fn zero_instant_transaction_is_rejected() {
        let ledger = new_ledger();
        let a = ledger.open_account("A", AccountType::Asset, "", "USD", t(0), 10.0).unwrap();
        let b = ledger.open_account("B", AccountType::Expense, "", "USD", t(0), 0.0).unwrap();
        assert!(matches!(
            ledger.post_transaction(&a.id, &b.id, DateTime::<Utc>::default(), 1.0, ""),
            Err(MiserError::ZeroInstant)
        ));
    }

    #[test]
    fn instant_equal_to_opening_is_accepted() {
        let ledger = new_ledger();
        let a = ledger.open_account("A", AccountType::Asset, "", "USD", t(0), 10.0).unwrap();
        let b = ledger.open_account("B", AccountType::Expense, "", "USD", t(0), 0.0).unwrap();
        assert!(ledger.post_transaction(&a.id, &b.id, t(0), 1.0, "").is_ok());
    }

    #[test]
    fn same_account_type_transfer_is_rejected() {
        let ledger = new_ledger();
        let a = ledger.open_account("A", AccountType::Asset, "", "USD", t(0), 10.0).unwrap();
        let b = ledger.open_account("B", AccountType::Asset, "", "USD", t(0), 0.0).unwrap();
        assert!(matches!(
            ledger.post_transaction(&a.id, &b.id, t(1), 1.0, ""),
            Err(MiserError::SameAccountType)
        ));
    }

    #[test]
    fn deleting_an_account_marks_its_transactions_deleted_but_keeps_snapshots() {
        let ledger = new_ledger();
        let a = ledger.open_account("A", AccountType::Asset, "", "USD", t(0), 10.0).unwrap();
        let b = ledger.open_account("B", AccountType::Expense, "", "USD", t(0), 0.0).unwrap();
        let tx = ledger.post_transaction(&a.id, &b.id, t(1), 1.0, "").unwrap();

        ledger.delete_account(&a.id).unwrap();

        assert!(ledger.accounts.get(&a.id).is_none());
        assert!(ledger.transactions.get(&tx.id).is_none());
        // the snapshot itself is not rewritten, only hidden behind the
        // now-deleted transaction it is keyed on.
        assert!(ledger.balances.get(&a.id, &tx.id).is_some());
    }

    #[test]
    fn trial_balance_nets_to_zero_after_several_postings() {
        let ledger = new_ledger();
        let cash = ledger.open_account("Cash", AccountType::Asset, "", "USD", t(0), 1000.0).unwrap();
        let salary = ledger.open_account("Salary", AccountType::Income, "", "USD", t(0), 0.0).unwrap();
        let rent = ledger.open_account("Rent", AccountType::Expense, "", "USD", t(0), 0.0).unwrap();

        ledger.post_transaction(&salary.id, &cash.id, t(1), 2000.0, "paycheck").unwrap();
        ledger.post_transaction(&cash.id, &rent.id, t(2), 750.0, "rent").unwrap();

        approx(ledger.trial_balance().unwrap(), 0.0);
    }
}
