//! The ledger engine — wires the store, configuration, clock and event
//! sink together, and exposes one method per operation.
//!
//! RULES:
//!   - Every mutation goes through the store's atomic update paths.
//!   - Committed events are handed to the sink after commit; a sink
//!     failure is logged and never rolls the mutation back.
//!   - Admin-gated operations compare the acting id against the
//!     configured owner id; the engine does not authenticate.
//!
//! The engine is shared across caller threads (`&self` methods, wrap
//! in `Arc`); the store serializes the actual updates.

use crate::{
    bonus::{self, BonusReceipt},
    clock::{FixedClock, LedgerClock, SystemClock},
    command::{CommandReply, UserCommand},
    config::LedgerConfig,
    error::{LedgerError, LedgerResult},
    event::{event_type_name, EventSink, LedgerEvent},
    query::{self, AccountInfo, BalanceView},
    referral::{self, ReferralReceipt},
    store::{LeaderboardEntry, LedgerStats, LedgerStore, PendingWithdrawal},
    types::UserId,
    withdrawal::{self, ApprovalReceipt, WithdrawalReceipt},
    Account,
};
use std::sync::Arc;

pub struct LedgerEngine {
    pub store: LedgerStore,
    config: LedgerConfig,
    clock: Arc<dyn LedgerClock>,
    sink: Option<Box<dyn EventSink>>,
}

impl LedgerEngine {
    pub fn new(store: LedgerStore, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
            sink: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn LedgerClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Open the configured store and build a fully wired engine. If the
    /// persisted store was corrupt, the recovery is logged and recorded
    /// in the event log — the run must not look like history was intact.
    pub fn build(config: LedgerConfig) -> LedgerResult<Self> {
        let store = LedgerStore::open(&config.db_path)?;
        if store.recovered_from_corruption() {
            log::error!(
                "ledger store at {} was corrupt and has been replaced; \
                 prior history is only in the quarantined file",
                config.db_path
            );
            store.append_event(&LedgerEvent::StoreRecovered {
                path: config.db_path.clone(),
            })?;
        }
        Ok(Self::new(store, config))
    }

    /// In-memory engine with test defaults and a pinned calendar date.
    pub fn build_test() -> LedgerResult<Self> {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        Ok(
            Self::new(LedgerStore::in_memory()?, LedgerConfig::test_defaults())
                .with_clock(Arc::new(FixedClock::new(date))),
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ── Operations ─────────────────────────────────────────────

    /// Account snapshot, created on first contact.
    pub fn account(&self, id: UserId) -> LedgerResult<Account> {
        self.store.get(id)
    }

    pub fn balance_of(&self, id: UserId) -> LedgerResult<BalanceView> {
        query::balance_of(&self.store, &self.config.rewards, id)
    }

    pub fn account_info(&self, id: UserId) -> LedgerResult<AccountInfo> {
        query::account_info(&self.store, id, self.clock.today())
    }

    pub fn set_payout_id(&self, id: UserId, payout_id: &str) -> LedgerResult<Account> {
        let (account, events) = withdrawal::set_payout_id(&self.store, id, payout_id)?;
        self.notify(&events);
        Ok(account)
    }

    pub fn apply_referral(
        &self,
        referred_id: UserId,
        referrer_id: UserId,
    ) -> LedgerResult<ReferralReceipt> {
        let (receipt, events) =
            referral::apply(&self.store, &self.config.rewards, referred_id, referrer_id)?;
        self.notify(&events);
        Ok(receipt)
    }

    pub fn claim_daily_bonus(&self, id: UserId) -> LedgerResult<BonusReceipt> {
        let (receipt, events) =
            bonus::claim(&self.store, &self.config.rewards, id, self.clock.today())?;
        self.notify(&events);
        Ok(receipt)
    }

    pub fn request_withdrawal(&self, id: UserId) -> LedgerResult<WithdrawalReceipt> {
        let (receipt, events) = withdrawal::request(&self.store, &self.config.rewards, id)?;
        self.notify(&events);
        Ok(receipt)
    }

    pub fn approve_withdrawal(
        &self,
        admin_id: UserId,
        target_id: UserId,
    ) -> LedgerResult<ApprovalReceipt> {
        let (receipt, events) =
            withdrawal::approve(&self.store, self.config.owner_id, admin_id, target_id)?;
        self.notify(&events);
        Ok(receipt)
    }

    pub fn leaderboard(&self, n: usize) -> LedgerResult<Vec<LeaderboardEntry>> {
        query::leaderboard(&self.store, n)
    }

    /// Owner-only aggregate view.
    pub fn stats(&self, admin_id: UserId) -> LedgerResult<LedgerStats> {
        self.require_owner(admin_id)?;
        query::stats(&self.store)
    }

    /// Owner-only list of requests awaiting approval.
    pub fn pending_withdrawals(&self, admin_id: UserId) -> LedgerResult<Vec<PendingWithdrawal>> {
        self.require_owner(admin_id)?;
        query::pending_withdrawals(&self.store)
    }

    // ── Transport dispatch ─────────────────────────────────────

    /// Map one transport command to its operation. Validation failures
    /// come back as `CommandReply::Rejected` with the user-visible
    /// message; only integrity errors surface as `Err`.
    pub fn dispatch(&self, command: UserCommand) -> LedgerResult<CommandReply> {
        let reply = match command {
            UserCommand::Balance { user_id } => self
                .balance_of(user_id)
                .map(|view| CommandReply::Balance { view }),
            UserCommand::Info { user_id } => self.account_info(user_id).map(|info| {
                CommandReply::Info {
                    account: info.account,
                    bonus_available: info.bonus_available,
                }
            }),
            UserCommand::SetPayoutId { user_id, payout_id } => self
                .set_payout_id(user_id, &payout_id)
                .map(|account| CommandReply::PayoutSet {
                    payout_id: account.payout_id.unwrap_or_default(),
                }),
            UserCommand::ApplyReferral {
                user_id,
                referrer_id,
            } => self
                .apply_referral(user_id, referrer_id)
                .map(|receipt| CommandReply::ReferralApplied {
                    referrer_id: receipt.referrer_id,
                    bonus: receipt.bonus,
                }),
            UserCommand::ClaimDailyBonus { user_id } => self
                .claim_daily_bonus(user_id)
                .map(|receipt| CommandReply::BonusGranted {
                    amount: receipt.amount,
                }),
            UserCommand::RequestWithdrawal { user_id } => self
                .request_withdrawal(user_id)
                .map(|receipt| CommandReply::WithdrawalRequested {
                    rupees: receipt.rupees,
                    remainder: receipt.remainder,
                }),
            UserCommand::ApproveWithdrawal {
                admin_id,
                target_id,
            } => self
                .approve_withdrawal(admin_id, target_id)
                .map(|receipt| CommandReply::WithdrawalApproved {
                    target_id: receipt.target_id,
                    amount: receipt.amount,
                }),
            UserCommand::Leaderboard { limit } => self
                .leaderboard(limit)
                .map(|entries| CommandReply::Leaderboard { entries }),
            UserCommand::Stats { admin_id } => {
                self.stats(admin_id).map(|stats| CommandReply::Stats { stats })
            }
            UserCommand::PendingWithdrawals { admin_id } => self
                .pending_withdrawals(admin_id)
                .map(|entries| CommandReply::PendingWithdrawals { entries }),
        };

        match reply {
            Ok(reply) => Ok(reply),
            Err(err) if err.is_validation() => Ok(CommandReply::Rejected {
                message: err.to_string(),
            }),
            Err(err) => Err(err),
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn require_owner(&self, admin_id: UserId) -> LedgerResult<()> {
        if admin_id != self.config.owner_id {
            return Err(LedgerError::NotAuthorized);
        }
        Ok(())
    }

    /// Best-effort delivery of committed events. The mutation already
    /// stands; a sink failure is an operational problem, not a rollback.
    fn notify(&self, events: &[LedgerEvent]) {
        let Some(sink) = &self.sink else {
            return;
        };
        for event in events {
            if let Err(err) = sink.deliver(event) {
                log::warn!(
                    "event sink delivery failed for {}: {err:#}",
                    event_type_name(event)
                );
            }
        }
    }
}
