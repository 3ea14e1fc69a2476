//! Position lifecycle controller.
//!
//! One evaluation reads the pool and the owned position, then either holds,
//! or exits and re-enters:
//! - `NoPosition -> Entering`: size a trade, swap, mint
//! - `Held -> Held`: pool tick inside the bounds widened by the range buffer
//! - `Held -> Exiting -> Entering`: withdraw, collect, sweep, burn, then enter
//!
//! Multi-step sequences are best-effort. A failure leaves whatever the
//! completed steps produced, and the next evaluation starts again from chain state.

use crate::cache::PositionCache;
use crate::error::{ExecutionError, Result};
use crate::lifecycle::{
    DeferredData, ExitedData, LifecycleTracker, MintedData, SkippedData, TradeData,
};
use crate::transaction::{PendingTransactions, RetryPolicy};
use chrono::{DateTime, Duration, Utc};
use clmm_keeper_domain::config::{RangeConfig, StrategyConfig};
use clmm_keeper_domain::cooldown::CooldownState;
use clmm_keeper_domain::entities::{PositionState, TokenId};
use clmm_keeper_domain::math::{adjust_for_decimals, find_range_from_sqrt_price, size_trade};
use clmm_keeper_domain::token::{Amount, Token};
use clmm_keeper_domain::value_objects::{RangeProposal, TradePlan, TradeSide};
use clmm_keeper_protocols::config::ChainConfig;
use clmm_keeper_protocols::{
    ExitRequest, MintRequest, PoolReader, PoolSlot, PositionManager, SwapAggregator, SwapRequest,
    TransactionSender, TxReceipt, WalletBalances,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the controller reads from and writes to.
#[derive(Clone)]
pub struct Collaborators {
    pub pool: Arc<dyn PoolReader>,
    pub positions: Arc<dyn PositionManager>,
    pub balances: Arc<dyn WalletBalances>,
    pub aggregator: Arc<dyn SwapAggregator>,
    pub sender: Arc<dyn TransactionSender>,
}

impl Collaborators {
    /// Uses one chain client for every on-chain role.
    pub fn from_chain<C>(chain: Arc<C>, aggregator: Arc<dyn SwapAggregator>) -> Self
    where
        C: PoolReader + PositionManager + WalletBalances + TransactionSender + 'static,
    {
        Self {
            pool: chain.clone(),
            positions: chain.clone(),
            balances: chain.clone(),
            aggregator,
            sender: chain,
        }
    }
}

/// Parameters of the controller, gathered from the chain, strategy and range sections.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Address owning the position and the balances.
    pub wallet: String,
    /// token0 of the pool.
    pub base_token: Token,
    /// token1 of the pool.
    pub quote_token: Token,
    pub range: RangeConfig,
    /// Minimum time between two rebalancing trades.
    pub cooldown: Duration,
    pub min_base_balance: f64,
    pub min_quote_balance: f64,
    pub deposit_per_mille: u64,
    /// Validity of mint and exit transactions.
    pub deadline: Duration,
    pub slippage_pct: f64,
    pub swap_amount_places: u32,
}

impl ControllerConfig {
    pub fn new(
        wallet: impl Into<String>,
        chain: &ChainConfig,
        strategy: &StrategyConfig,
        range: &RangeConfig,
    ) -> Self {
        Self {
            wallet: wallet.into(),
            base_token: chain.base_token.clone(),
            quote_token: chain.quote_token.clone(),
            range: range.clone(),
            cooldown: Duration::seconds(strategy.cooldown_secs),
            min_base_balance: chain.min_base_balance,
            min_quote_balance: chain.min_quote_balance,
            deposit_per_mille: chain.deposit_per_mille,
            deadline: Duration::seconds(chain.deadline_secs),
            slippage_pct: chain.swap_slippage_pct,
            swap_amount_places: chain.swap_amount_places,
        }
    }
}

/// Where the controller stands in the position lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    NoPosition,
    Held(TokenId),
    Exiting(TokenId),
    Entering,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::NoPosition => write!(f, "no position"),
            ControllerState::Held(id) => write!(f, "holding #{id}"),
            ControllerState::Exiting(id) => write!(f, "exiting #{id}"),
            ControllerState::Entering => write!(f, "entering"),
        }
    }
}

/// What an evaluation would do given the current chain state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// Pool tick inside the extended range.
    Hold(PositionState),
    /// Position empty or out of the extended range.
    Exit(PositionState),
    /// No position owned.
    Enter,
}

/// Chain state read at the start of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub slot: PoolSlot,
    pub action: PlannedAction,
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Position kept as is.
    Holding(PositionState),
    /// A position was minted. `token_id` is `None` when the post-mint lookup failed.
    Entered {
        exited: Option<TokenId>,
        token_id: Option<TokenId>,
        proposal: RangeProposal,
    },
    /// The cooldown had not elapsed; the controller waited it out without trading.
    Deferred {
        exited: Option<TokenId>,
        remaining: Duration,
    },
    /// Balances after the trade were below the minimum; nothing was minted.
    Skipped {
        exited: Option<TokenId>,
        base_balance: Decimal,
        quote_balance: Decimal,
    },
}

/// Drives the single managed position.
pub struct PositionController {
    collaborators: Collaborators,
    config: ControllerConfig,
    cache: PositionCache,
    cooldown: Mutex<CooldownState>,
    state: Mutex<ControllerState>,
    pending: PendingTransactions,
    lifecycle: Arc<LifecycleTracker>,
    retry: RetryPolicy,
}

impl PositionController {
    pub fn new(collaborators: Collaborators, config: ControllerConfig) -> Self {
        Self {
            collaborators,
            config,
            cache: PositionCache::new(),
            cooldown: Mutex::new(CooldownState::new()),
            state: Mutex::new(ControllerState::NoPosition),
            pending: PendingTransactions::new(),
            lifecycle: Arc::new(LifecycleTracker::new()),
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy applied to reads. Writes are never repeated within a cycle.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_lifecycle(mut self, lifecycle: Arc<LifecycleTracker>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock()
    }

    pub fn cooldown(&self) -> CooldownState {
        *self.cooldown.lock()
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn lifecycle(&self) -> &Arc<LifecycleTracker> {
        &self.lifecycle
    }

    pub fn pending(&self) -> &PendingTransactions {
        &self.pending
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn set_state(&self, next: ControllerState) {
        let mut state = self.state.lock();
        let current = *state;
        if current != next {
            debug!(from = %current, to = %next, "Controller state changed");
            *state = next;
        }
    }

    /// Reads the pool and the owned position and decides what to do, without writing.
    pub async fn assess(&self) -> Result<Assessment> {
        let slot = self.read_slot().await?;
        let action = match self.resolve_position().await? {
            Some(position)
                if position.liquidity > 0
                    && position.in_extended_range(slot.tick, self.config.range.range_buffer_ticks) =>
            {
                PlannedAction::Hold(position)
            }
            Some(position) => PlannedAction::Exit(position),
            None => PlannedAction::Enter,
        };
        Ok(Assessment { slot, action })
    }

    /// Runs one evaluation as of `now`.
    pub async fn evaluate(&self, now: DateTime<Utc>) -> Result<CycleOutcome> {
        let assessment = self.assess().await?;

        let exited = match assessment.action {
            PlannedAction::Hold(position) => {
                debug!(
                    token_id = %position.token_id,
                    tick = assessment.slot.tick,
                    range = format!("[{}, {}]", position.tick_lower, position.tick_upper),
                    "Position in range"
                );
                self.set_state(ControllerState::Held(position.token_id));
                return Ok(CycleOutcome::Holding(position));
            }
            PlannedAction::Exit(position) => {
                self.set_state(ControllerState::Exiting(position.token_id));
                self.exit(&position, assessment.slot.tick).await?;
                Some(position.token_id)
            }
            PlannedAction::Enter => None,
        };

        self.set_state(ControllerState::Entering);
        match self.enter(now, exited).await {
            Ok(outcome) => {
                let next = match &outcome {
                    CycleOutcome::Entered {
                        token_id: Some(id), ..
                    } => ControllerState::Held(*id),
                    _ => ControllerState::NoPosition,
                };
                self.set_state(next);
                Ok(outcome)
            }
            Err(e) => {
                self.set_state(ControllerState::NoPosition);
                Err(e)
            }
        }
    }

    async fn read_slot(&self) -> Result<PoolSlot> {
        let pool = &self.collaborators.pool;
        self.retry.run("slot0", || pool.slot0()).await
    }

    async fn read_position(&self, token_id: TokenId) -> Result<Option<PositionState>> {
        let positions = &self.collaborators.positions;
        self.retry
            .run("positions", || positions.position(token_id))
            .await
    }

    async fn lookup_owned(&self) -> Result<Option<TokenId>> {
        let positions = &self.collaborators.positions;
        let wallet = self.config.wallet.as_str();
        self.retry
            .run("owned position", || positions.owned_position(wallet))
            .await
    }

    /// The live owned position. The cache is only a hint: ownership is
    /// confirmed on chain before any cached id is used.
    async fn resolve_position(&self) -> Result<Option<PositionState>> {
        let wallet = self.config.wallet.as_str();

        let cached = self.cache.get(wallet).await;
        let owned = self.lookup_owned().await?;
        if let Some(cached) = cached.filter(|id| owned != Some(*id)) {
            debug!(token_id = %cached, "Cached position is no longer owned");
            self.cache.invalidate(wallet).await;
        }

        let Some(token_id) = owned else {
            return Ok(None);
        };
        match self.read_position(token_id).await? {
            Some(position) => {
                self.cache.set(wallet, token_id).await;
                Ok(Some(position))
            }
            None => {
                self.cache.invalidate(wallet).await;
                Ok(None)
            }
        }
    }

    async fn read_balances(&self) -> Result<(Amount, Amount)> {
        let balances = &self.collaborators.balances;
        let base_token = &self.config.base_token;
        let quote_token = &self.config.quote_token;
        let base = self
            .retry
            .run("base balance", || balances.balance_of(base_token))
            .await?;
        let quote = self
            .retry
            .run("quote balance", || balances.balance_of(quote_token))
            .await?;
        Ok((base, quote))
    }

    async fn exit(&self, position: &PositionState, pool_tick: i32) -> Result<TxReceipt> {
        info!(
            token_id = %position.token_id,
            tick = pool_tick,
            range = format!("[{}, {}]", position.tick_lower, position.tick_upper),
            buffer = self.config.range.range_buffer_ticks,
            liquidity = position.liquidity,
            "Exiting position"
        );
        let request = ExitRequest {
            token_id: position.token_id,
            liquidity: position.liquidity,
            deadline: Utc::now() + self.config.deadline,
        };

        let receipt = {
            let _pending = self.pending.track("exit");
            self.collaborators.positions.exit(&request).await?
        };

        self.cache.invalidate(&self.config.wallet).await;
        self.lifecycle
            .record_exited(
                position.token_id,
                &receipt.hash,
                ExitedData {
                    tick_lower: position.tick_lower,
                    tick_upper: position.tick_upper,
                    liquidity: position.liquidity,
                    pool_tick,
                },
            )
            .await;
        Ok(receipt)
    }

    async fn enter(&self, now: DateTime<Utc>, exited: Option<TokenId>) -> Result<CycleOutcome> {
        let remaining = self.cooldown.lock().remaining(now, self.config.cooldown);
        if let Some(remaining) = remaining {
            self.lifecycle
                .record_deferred(DeferredData {
                    remaining_secs: remaining.num_seconds(),
                })
                .await;
            if let Ok(wait) = remaining.to_std() {
                tokio::time::sleep(wait).await;
            }
            return Ok(CycleOutcome::Deferred { exited, remaining });
        }

        // The price may have moved during the exit.
        let slot = self.read_slot().await?;
        let proposal = find_range_from_sqrt_price(slot.sqrt_price_x96, &self.config.range)?;
        // Balances are in whole tokens, so size against the decimal-adjusted price.
        let price = adjust_for_decimals(
            proposal.reference_price,
            self.config.base_token.decimals,
            self.config.quote_token.decimals,
        );
        info!(
            price,
            pool_price = proposal.reference_price,
            tick_lower = proposal.tick_lower,
            tick_upper = proposal.tick_upper,
            proportion = proposal.proportion,
            "Range proposed"
        );

        let (base, quote) = self.read_balances().await?;
        let plan = size_trade(quote.to_f64(), base.to_f64(), price, proposal.proportion)?;
        self.rebalance(&plan, price, now).await?;

        let (base, quote) = self.read_balances().await?;
        if base.to_f64() <= self.config.min_base_balance
            || quote.to_f64() <= self.config.min_quote_balance
        {
            let data = SkippedData {
                base_balance: base.to_decimal(),
                quote_balance: quote.to_decimal(),
            };
            self.lifecycle.record_skipped(data.clone()).await;
            return Ok(CycleOutcome::Skipped {
                exited,
                base_balance: data.base_balance,
                quote_balance: data.quote_balance,
            });
        }

        let request = MintRequest {
            tick_lower: proposal.tick_lower,
            tick_upper: proposal.tick_upper,
            amount0: base.scaled(self.config.deposit_per_mille, 1000),
            amount1: quote.scaled(self.config.deposit_per_mille, 1000),
            deadline: Utc::now() + self.config.deadline,
        };
        let receipt = {
            let _pending = self.pending.track("mint");
            self.collaborators.positions.mint(&request).await?
        };

        let token_id = match self.lookup_owned().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Minted position not found, next evaluation will look again");
                None
            }
        };
        if let Some(id) = token_id {
            self.cache.set(&self.config.wallet, id).await;
        }

        self.lifecycle
            .record_minted(
                token_id,
                &receipt.hash,
                MintedData {
                    tick_lower: request.tick_lower,
                    tick_upper: request.tick_upper,
                    amount0: request.amount0.to_decimal(),
                    amount1: request.amount1.to_decimal(),
                    reference_price: price,
                },
            )
            .await;

        Ok(CycleOutcome::Entered {
            exited,
            token_id,
            proposal,
        })
    }

    /// Swaps toward the target split. Returns `None` when the rounded amount is zero.
    async fn rebalance(
        &self,
        plan: &TradePlan,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<TxReceipt>> {
        let (src, dst) = match plan.side {
            TradeSide::SellBase => (&self.config.base_token, &self.config.quote_token),
            TradeSide::SellQuote => (&self.config.quote_token, &self.config.base_token),
        };
        let amount =
            Amount::from_f64_rounded(plan.amount, src.decimals, self.config.swap_amount_places);
        if amount.is_zero() {
            debug!(side = %plan.side, amount = plan.amount, "No trade needed");
            return Ok(None);
        }

        let request = SwapRequest {
            src: src.clone(),
            dst: dst.clone(),
            amount,
            from: self.config.wallet.clone(),
            slippage_pct: self.config.slippage_pct,
            disable_estimate: false,
            allow_partial_fill: false,
        };
        let aggregator = &self.collaborators.aggregator;
        let transaction = self
            .retry
            .run("swap quote", || aggregator.build_swap(&request))
            .await?;
        if !transaction.from.eq_ignore_ascii_case(&self.config.wallet) {
            return Err(ExecutionError::UnexpectedState {
                step: "swap quote",
                reason: format!("transaction is from {}", transaction.from),
            });
        }

        let receipt = {
            let _pending = self.pending.track("swap");
            self.collaborators.sender.send(&transaction).await?
        };
        self.cooldown.lock().record(now);

        self.lifecycle
            .record_trade(
                &receipt.hash,
                TradeData {
                    side: plan.side,
                    sold: src.symbol.clone(),
                    amount: amount.to_decimal(),
                    price,
                },
            )
            .await;
        Ok(Some(receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{EventData, LifecycleEventType};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use clmm_keeper_protocols::{ProtocolError, SwapTransaction};
    use primitive_types::U256;

    const WALLET: &str = "0x00000000000000000000000000000000000000aa";

    #[derive(Default)]
    struct ChainState {
        tick: i32,
        position: Option<PositionState>,
        next_id: u64,
        base: f64,
        quote: f64,
        swaps: u32,
        mints: u32,
        exits: u32,
        slot_failures: u32,
        fail_swap: bool,
        /// Pool price slot; `None` means 1.0.
        sqrt_price_x96: Option<U256>,
        /// Token sold and amount of every swap quote requested.
        swap_requests: Vec<(String, Decimal)>,
        /// A live position the wallet does not own.
        foreign: Option<PositionState>,
    }

    /// In-memory pool, position manager, wallet and aggregator.
    #[derive(Default)]
    struct FakeChain {
        state: Mutex<ChainState>,
    }

    impl FakeChain {
        fn new(tick: i32, base: f64, quote: f64) -> Arc<Self> {
            Arc::new(Self {
                state: Mutex::new(ChainState {
                    tick,
                    next_id: 100,
                    base,
                    quote,
                    ..Default::default()
                }),
            })
        }

        fn holding(self: Arc<Self>, lower: i32, upper: i32) -> Arc<Self> {
            self.state.lock().position = Some(PositionState {
                token_id: TokenId::new(7u64),
                tick_lower: lower,
                tick_upper: upper,
                liquidity: 1_000,
            });
            self
        }

        fn receipt(prefix: &str, n: u32) -> TxReceipt {
            TxReceipt {
                hash: format!("0x{prefix}{n}"),
                block_number: Some(1),
            }
        }
    }

    #[async_trait]
    impl PoolReader for FakeChain {
        async fn slot0(&self) -> clmm_keeper_protocols::Result<PoolSlot> {
            let mut state = self.state.lock();
            if state.slot_failures > 0 {
                state.slot_failures -= 1;
                return Err(ProtocolError::Timeout { operation: "slot0" });
            }
            // Price 1.0 keeps the proposed range at [-400, 200].
            Ok(PoolSlot {
                sqrt_price_x96: state.sqrt_price_x96.unwrap_or(U256::from(1u128 << 96)),
                tick: state.tick,
            })
        }
    }

    #[async_trait]
    impl PositionManager for FakeChain {
        async fn owned_position(&self, _owner: &str) -> clmm_keeper_protocols::Result<Option<TokenId>> {
            Ok(self.state.lock().position.as_ref().map(|p| p.token_id))
        }

        async fn position(
            &self,
            token_id: TokenId,
        ) -> clmm_keeper_protocols::Result<Option<PositionState>> {
            let state = self.state.lock();
            Ok(state
                .position
                .iter()
                .chain(state.foreign.iter())
                .find(|p| p.token_id == token_id)
                .cloned())
        }

        async fn mint(&self, request: &MintRequest) -> clmm_keeper_protocols::Result<TxReceipt> {
            let mut state = self.state.lock();
            state.mints += 1;
            state.next_id += 1;
            state.position = Some(PositionState {
                token_id: TokenId::new(state.next_id),
                tick_lower: request.tick_lower,
                tick_upper: request.tick_upper,
                liquidity: 5_000,
            });
            Ok(Self::receipt("m", state.mints))
        }

        async fn exit(&self, request: &ExitRequest) -> clmm_keeper_protocols::Result<TxReceipt> {
            let mut state = self.state.lock();
            assert_eq!(
                state.position.as_ref().map(|p| p.token_id),
                Some(request.token_id)
            );
            state.exits += 1;
            state.position = None;
            Ok(Self::receipt("e", state.exits))
        }
    }

    #[async_trait]
    impl WalletBalances for FakeChain {
        async fn balance_of(&self, token: &Token) -> clmm_keeper_protocols::Result<Amount> {
            let state = self.state.lock();
            let value = if token.symbol == "ZRO" {
                state.base
            } else {
                state.quote
            };
            Ok(Amount::from_f64_rounded(value, token.decimals, 6))
        }
    }

    #[async_trait]
    impl SwapAggregator for FakeChain {
        async fn build_swap(
            &self,
            request: &SwapRequest,
        ) -> clmm_keeper_protocols::Result<SwapTransaction> {
            self.state
                .lock()
                .swap_requests
                .push((request.src.symbol.clone(), request.amount.to_decimal()));
            Ok(SwapTransaction {
                from: request.from.clone(),
                to: "0x111111125421ca6dc452d289314280a0f8842a65".into(),
                data: "0x".into(),
                value: U256::zero(),
                gas: None,
                gas_price: None,
            })
        }
    }

    #[async_trait]
    impl TransactionSender for FakeChain {
        async fn send(
            &self,
            _transaction: &SwapTransaction,
        ) -> clmm_keeper_protocols::Result<TxReceipt> {
            let mut state = self.state.lock();
            if state.fail_swap {
                return Err(ProtocolError::Reverted {
                    operation: "swap",
                    hash: "0xdead".into(),
                });
            }
            state.swaps += 1;
            Ok(Self::receipt("s", state.swaps))
        }
    }

    fn controller(chain: &Arc<FakeChain>) -> PositionController {
        controller_on(chain, &ChainConfig::default())
    }

    fn controller_on(chain: &Arc<FakeChain>, chain_config: &ChainConfig) -> PositionController {
        let aggregator: Arc<dyn SwapAggregator> = chain.clone();
        let config = ControllerConfig::new(
            WALLET,
            chain_config,
            &StrategyConfig::default(),
            &RangeConfig::default(),
        );
        PositionController::new(Collaborators::from_chain(chain.clone(), aggregator), config)
            .with_retry(RetryPolicy {
                initial_delay_ms: 1,
                ..RetryPolicy::default()
            })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_holds_inside_extended_range() {
        let chain = FakeChain::new(505, 1000.0, 1.0).holding(0, 600);
        let controller = controller(&chain);

        let outcome = controller.evaluate(now()).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Holding(ref p) if p.tick_lower == 0));
        assert_eq!(controller.state(), ControllerState::Held(TokenId::new(7u64)));
        assert_eq!(chain.state.lock().exits, 0);
        assert_eq!(
            controller.cache().get(WALLET).await,
            Some(TokenId::new(7u64))
        );
    }

    #[tokio::test]
    async fn test_exits_past_buffer_and_reenters() {
        let chain = FakeChain::new(805, 1000.0, 1.0).holding(0, 600);
        let controller = controller(&chain);

        let outcome = controller.evaluate(now()).await.unwrap();

        let CycleOutcome::Entered {
            exited,
            token_id,
            proposal,
        } = outcome
        else {
            panic!("expected entry, got {outcome:?}");
        };
        assert_eq!(exited, Some(TokenId::new(7u64)));
        assert_eq!(token_id, Some(TokenId::new(101u64)));
        assert_eq!((proposal.tick_lower, proposal.tick_upper), (-400, 200));

        let state = chain.state.lock();
        assert_eq!((state.exits, state.swaps, state.mints), (1, 1, 1));
        drop(state);

        assert_eq!(controller.state(), ControllerState::Held(TokenId::new(101u64)));
        assert_eq!(
            controller.cache().get(WALLET).await,
            Some(TokenId::new(101u64))
        );
        assert!(controller.pending().is_idle());
        assert_eq!(controller.cooldown().last_trade(), Some(now()));
    }

    #[tokio::test]
    async fn test_empty_position_is_exited() {
        let chain = FakeChain::new(100, 1000.0, 1.0).holding(0, 600);
        if let Some(position) = chain.state.lock().position.as_mut() {
            position.liquidity = 0;
        }
        let controller = controller(&chain);

        let assessment = controller.assess().await.unwrap();
        assert!(matches!(assessment.action, PlannedAction::Exit(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_entry_within_cooldown_is_deferred() {
        let chain = FakeChain::new(0, 1000.0, 1.0);
        let controller = controller(&chain);

        let first = controller.evaluate(now()).await.unwrap();
        assert!(matches!(first, CycleOutcome::Entered { .. }));

        // Push the pool far outside the new range ten minutes later.
        chain.state.lock().tick = 5_000;
        let second = controller
            .evaluate(now() + Duration::minutes(10))
            .await
            .unwrap();

        let CycleOutcome::Deferred { exited, remaining } = second else {
            panic!("expected deferral, got {second:?}");
        };
        assert_eq!(exited, Some(TokenId::new(101u64)));
        assert_eq!(remaining, Duration::minutes(50));

        let state = chain.state.lock();
        assert_eq!((state.swaps, state.mints, state.exits), (1, 1, 1));
        drop(state);
        assert_eq!(controller.state(), ControllerState::NoPosition);
        assert!(
            controller
                .lifecycle()
                .last_event(LifecycleEventType::EntryDeferred)
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_entry_after_cooldown_trades_again() {
        let chain = FakeChain::new(0, 1000.0, 1.0);
        let controller = controller(&chain);
        controller.evaluate(now()).await.unwrap();

        chain.state.lock().tick = 5_000;
        let outcome = controller
            .evaluate(now() + Duration::minutes(61))
            .await
            .unwrap();

        assert!(matches!(outcome, CycleOutcome::Entered { .. }));
        assert_eq!(chain.state.lock().swaps, 2);
    }

    #[tokio::test]
    async fn test_stale_cache_is_revalidated() {
        let chain = FakeChain::new(0, 1000.0, 1.0).holding(-400, 200);
        let controller = controller(&chain);
        controller.cache().set(WALLET, TokenId::new(3u64)).await;

        let outcome = controller.evaluate(now()).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Holding(ref p) if p.token_id == TokenId::new(7u64)));
        assert_eq!(
            controller.cache().get(WALLET).await,
            Some(TokenId::new(7u64))
        );
    }

    #[tokio::test]
    async fn test_cached_position_not_owned_is_dropped() {
        let chain = FakeChain::new(0, 1000.0, 1.0);
        chain.state.lock().foreign = Some(PositionState {
            token_id: TokenId::new(3u64),
            tick_lower: -400,
            tick_upper: 200,
            liquidity: 1_000,
        });
        let controller = controller(&chain);
        controller.cache().set(WALLET, TokenId::new(3u64)).await;

        let outcome = controller.evaluate(now()).await.unwrap();

        // Position 3 is live and in range, but belongs to another wallet.
        assert!(matches!(
            outcome,
            CycleOutcome::Entered {
                exited: None,
                token_id: Some(id),
                ..
            } if id == TokenId::new(101u64)
        ));
        assert_eq!(chain.state.lock().exits, 0);
        assert_eq!(
            controller.cache().get(WALLET).await,
            Some(TokenId::new(101u64))
        );
    }

    #[tokio::test]
    async fn test_trade_is_sized_in_whole_tokens() {
        let mut chain_config = ChainConfig::default();
        chain_config.quote_token = Token::new("0xaf88d065e77c8cc2239327c5edb3a432268e5831", "USDC", 6);
        chain_config.min_base_balance = 0.5;
        chain_config.min_quote_balance = 1.0;
        // 2000 USDC per ZRO is 2e-9 smallest units per smallest unit.
        let sqrt_price = U256::from((2e-9f64.sqrt() * 2f64.powi(96)) as u128);
        let chain = FakeChain::new(0, 1.0, 2000.0);
        chain.state.lock().sqrt_price_x96 = Some(sqrt_price);
        let controller = controller_on(&chain, &chain_config);

        let outcome = controller.evaluate(now()).await.unwrap();

        let CycleOutcome::Entered { proposal, .. } = outcome else {
            panic!("expected entry, got {outcome:?}");
        };
        let price = adjust_for_decimals(proposal.reference_price, 18, 6);
        assert!((price - 2000.0).abs() < 1e-3);

        let expected = size_trade(2000.0, 1.0, price, proposal.proportion).unwrap();
        let (sold, amount) = chain.state.lock().swap_requests[0].clone();
        let amount: f64 = amount.to_string().parse().unwrap();
        match expected.side {
            TradeSide::SellQuote => assert_eq!(sold, "USDC"),
            TradeSide::SellBase => assert_eq!(sold, "ZRO"),
        }
        assert!((amount - expected.amount).abs() < 1e-3);
        // Never more than the wallet's share of a 4000 USDC portfolio.
        assert!(amount < 2000.0);

        let trade = controller
            .lifecycle()
            .last_event(LifecycleEventType::TradeExecuted)
            .await
            .unwrap();
        let EventData::Trade(data) = trade.data else {
            panic!("expected trade data");
        };
        assert!((data.price - 2000.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_low_balances_skip_mint() {
        let chain = FakeChain::new(0, 50.0, 0.01);
        let controller = controller(&chain);

        let outcome = controller.evaluate(now()).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Skipped { exited: None, .. }));
        assert_eq!(chain.state.lock().mints, 0);
        assert_eq!(controller.state(), ControllerState::NoPosition);
    }

    #[tokio::test]
    async fn test_failed_swap_aborts_entry() {
        let chain = FakeChain::new(0, 1000.0, 1.0);
        chain.state.lock().fail_swap = true;
        let controller = controller(&chain);

        let result = controller.evaluate(now()).await;

        assert!(matches!(
            result,
            Err(ExecutionError::Protocol(ProtocolError::Reverted { .. }))
        ));
        assert_eq!(chain.state.lock().mints, 0);
        assert_eq!(controller.cooldown().last_trade(), None);
        assert_eq!(controller.state(), ControllerState::NoPosition);
        assert!(controller.pending().is_idle());
    }

    #[tokio::test]
    async fn test_transient_pool_read_is_retried() {
        let chain = FakeChain::new(505, 1000.0, 1.0).holding(0, 600);
        chain.state.lock().slot_failures = 2;
        let controller = controller(&chain);

        let outcome = controller.evaluate(now()).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Holding(_)));
    }
}
