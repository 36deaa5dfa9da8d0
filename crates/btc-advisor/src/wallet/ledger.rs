//! Wallet Ledger
//!
//! Simulated buy/sell against a fictitious USD + BTC wallet. Every mutation
//! builds the next state, persists it, and only then replaces the current
//! one, so a rejected or unpersisted trade leaves the wallet untouched.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::store::WalletStore;
use crate::error::{AdvisorError, Result};
use crate::model::{Transaction, TransactionKind, WalletState};

/// The simulated wallet and its trade history
pub struct WalletLedger {
    store: Arc<dyn WalletStore>,
    state: WalletState,
}

impl WalletLedger {
    /// Load the stored wallet, creating and persisting the default on first use.
    ///
    /// An unreadable document is replaced by the default wallet.
    pub fn open(store: Arc<dyn WalletStore>) -> Result<Self> {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                let state = WalletState::default();
                store.save(&state)?;
                tracing::info!("Initialized default wallet");
                state
            }
            Err(AdvisorError::Serialization(e)) => {
                tracing::warn!(error = %e, "Stored wallet unreadable, starting from default");
                let state = WalletState::default();
                store.save(&state)?;
                state
            }
            Err(e) => return Err(e),
        };

        Ok(Self { store, state })
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }

    /// Total value of the wallet at `price`
    pub fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.state.portfolio_value(price)
    }

    /// Spend `usd_amount` on BTC at `price`
    pub fn buy(&mut self, usd_amount: Decimal, price: Decimal) -> Result<Transaction> {
        validate(usd_amount, price)?;
        if usd_amount > self.state.usd_balance {
            return Err(AdvisorError::InsufficientFunds {
                needed: usd_amount,
                available: self.state.usd_balance,
            });
        }

        let btc_amount = usd_amount / price;
        let tx = Transaction::new(TransactionKind::Buy, usd_amount, btc_amount, price);

        let mut next = self.state.clone();
        next.usd_balance -= usd_amount;
        next.btc_balance += btc_amount;
        next.transactions.insert(0, tx.clone());
        self.commit(next)?;

        self.log_trade(&tx);
        Ok(tx)
    }

    /// Sell `btc_amount` for USD at `price`
    pub fn sell(&mut self, btc_amount: Decimal, price: Decimal) -> Result<Transaction> {
        validate(btc_amount, price)?;
        if btc_amount > self.state.btc_balance {
            return Err(AdvisorError::InsufficientHoldings {
                needed: btc_amount,
                available: self.state.btc_balance,
            });
        }

        let usd_amount = btc_amount * price;
        let tx = Transaction::new(TransactionKind::Sell, usd_amount, btc_amount, price);

        let mut next = self.state.clone();
        next.usd_balance += usd_amount;
        next.btc_balance -= btc_amount;
        next.transactions.insert(0, tx.clone());
        self.commit(next)?;

        self.log_trade(&tx);
        Ok(tx)
    }

    /// Restore the default wallet, discarding history
    pub fn reset(&mut self) -> Result<&WalletState> {
        self.commit(WalletState::default())?;
        tracing::info!("Wallet reset to default");
        Ok(&self.state)
    }

    fn commit(&mut self, next: WalletState) -> Result<()> {
        self.store.save(&next)?;
        self.state = next;
        Ok(())
    }

    fn log_trade(&self, tx: &Transaction) {
        tracing::info!(
            kind = %tx.kind,
            usd = %tx.usd_amount,
            btc = %tx.btc_amount,
            price = %tx.price_at_execution,
            usd_balance = %self.state.usd_balance,
            btc_balance = %self.state.btc_balance,
            "Executed simulated trade"
        );
    }
}

fn validate(amount: Decimal, price: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AdvisorError::InvalidAmount(format!("{amount} must be positive")));
    }
    if price <= Decimal::ZERO {
        return Err(AdvisorError::PriceUnavailable(format!("cannot execute at {price}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::{FileWalletStore, MemoryWalletStore};
    use rust_decimal_macros::dec;

    struct ReadOnlyStore;

    impl WalletStore for ReadOnlyStore {
        fn load(&self) -> Result<Option<WalletState>> {
            Ok(Some(WalletState::default()))
        }

        fn save(&self, _wallet: &WalletState) -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
    }

    fn ledger() -> (WalletLedger, Arc<MemoryWalletStore>) {
        let store = Arc::new(MemoryWalletStore::new());
        let ledger = WalletLedger::open(store.clone()).unwrap();
        (ledger, store)
    }

    #[test]
    fn test_open_persists_default() {
        let (ledger, store) = ledger();
        assert_eq!(ledger.state(), &WalletState::default());
        assert_eq!(store.load().unwrap(), Some(WalletState::default()));
    }

    #[test]
    fn test_buy_scenario() {
        let (mut ledger, store) = ledger();

        let tx = ledger.buy(dec!(6000), dec!(60000)).unwrap();
        assert_eq!(tx.kind, TransactionKind::Buy);
        assert_eq!(tx.btc_amount, dec!(0.1));
        assert_eq!(tx.price_at_execution, dec!(60000));

        let state = ledger.state();
        assert_eq!(state.usd_balance, dec!(4000));
        assert_eq!(state.btc_balance, dec!(0.6));
        assert_eq!(state.transactions.len(), 1);
        assert_eq!(store.load().unwrap().as_ref(), Some(state));
    }

    #[test]
    fn test_sell_credits_usd() {
        let (mut ledger, _) = ledger();

        let tx = ledger.sell(dec!(0.25), dec!(60000)).unwrap();
        assert_eq!(tx.usd_amount, dec!(15000));
        assert_eq!(ledger.state().usd_balance, dec!(25000));
        assert_eq!(ledger.state().btc_balance, dec!(0.25));
    }

    #[test]
    fn test_transactions_most_recent_first() {
        let (mut ledger, _) = ledger();
        let first = ledger.buy(dec!(100), dec!(50000)).unwrap();
        let second = ledger.sell(dec!(0.01), dec!(50000)).unwrap();

        let ids: Vec<_> = ledger.state().transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_insufficient_funds_leaves_wallet_unchanged() {
        let (mut ledger, store) = ledger();
        let before = ledger.state().clone();

        let err = ledger.buy(dec!(10000.01), dec!(60000)).unwrap_err();
        assert!(matches!(err, AdvisorError::InsufficientFunds { .. }));
        assert_eq!(ledger.state(), &before);
        assert_eq!(store.load().unwrap(), Some(before));
    }

    #[test]
    fn test_insufficient_holdings_leaves_wallet_unchanged() {
        let (mut ledger, _) = ledger();
        let before = ledger.state().clone();

        let err = ledger.sell(dec!(0.51), dec!(60000)).unwrap_err();
        assert!(matches!(err, AdvisorError::InsufficientHoldings { .. }));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn test_spend_entire_balance() {
        let (mut ledger, _) = ledger();
        ledger.buy(dec!(10000), dec!(60000)).unwrap();
        assert_eq!(ledger.state().usd_balance, Decimal::ZERO);

        let btc = ledger.state().btc_balance;
        ledger.sell(btc, dec!(60000)).unwrap();
        assert_eq!(ledger.state().btc_balance, Decimal::ZERO);
        assert!(ledger.state().usd_balance >= Decimal::ZERO);
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let (mut ledger, _) = ledger();
        assert!(matches!(
            ledger.buy(Decimal::ZERO, dec!(60000)),
            Err(AdvisorError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.sell(dec!(-0.1), dec!(60000)),
            Err(AdvisorError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.buy(dec!(100), Decimal::ZERO),
            Err(AdvisorError::PriceUnavailable(_))
        ));
    }

    #[test]
    fn test_failed_persist_leaves_wallet_unchanged() {
        let mut ledger = WalletLedger::open(Arc::new(ReadOnlyStore)).unwrap();
        let before = ledger.state().clone();

        assert!(matches!(
            ledger.buy(dec!(100), dec!(60000)),
            Err(AdvisorError::Storage(_))
        ));
        assert_eq!(ledger.state(), &before);
    }

    #[test]
    fn test_open_replaces_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileWalletStore::in_dir(dir.path()));
        std::fs::write(store.path(), "{ nope").unwrap();

        let ledger = WalletLedger::open(store.clone()).unwrap();
        assert_eq!(ledger.state(), &WalletState::default());

        let rewritten = std::fs::read_to_string(store.path()).unwrap();
        assert!(rewritten.contains("usd_balance"));
        assert_eq!(store.load().unwrap(), Some(WalletState::default()));
    }

    #[test]
    fn test_reset_restores_default() {
        let (mut ledger, _) = ledger();
        ledger.buy(dec!(500), dec!(50000)).unwrap();
        let state = ledger.reset().unwrap();
        assert_eq!(state, &WalletState::default());
    }

    #[test]
    fn test_reopen_sees_previous_trades() {
        let store = Arc::new(MemoryWalletStore::new());
        {
            let mut ledger = WalletLedger::open(store.clone()).unwrap();
            ledger.buy(dec!(6000), dec!(60000)).unwrap();
        }
        let ledger = WalletLedger::open(store).unwrap();
        assert_eq!(ledger.state().usd_balance, dec!(4000));
        assert_eq!(ledger.portfolio_value(dec!(60000)), dec!(40000));
    }
}
