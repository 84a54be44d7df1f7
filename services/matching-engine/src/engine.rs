//! Matching engine core
//!
//! One engine instance owns every symbol's book state; there are no
//! ambient singletons. Each symbol's state sits behind its own mutex so
//! submissions for the same symbol serialize while distinct symbols are
//! processed in parallel. Aggressive submissions match inline before
//! `submit_order` returns; [`MatchingEngine::sweep`] exists as a safety
//! net for resting crossable state and may be scheduled by the embedder.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use types::errors::{CoreError, LedgerError};
use types::ids::{OrderId, Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::{CancelReason, Order, OrderStatus, OrderType, RejectReason, Side, TimeInForce};
use types::trade::Trade;

use crate::book::{AskBook, BidBook, BookLevel};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EventSink};
use crate::ledger::{BalanceLedger, Settlement};
use crate::lifecycle::{self, OrderRequest};
use crate::matching::{crossing, TradeExecutor};

/// Per-symbol state: the two books plus the authoritative order store
struct Market {
    bids: BidBook,
    asks: AskBook,
    /// Authoritative order state; the books only index into it
    orders: HashMap<OrderId, Order>,
    /// Per-symbol arrival counter for deterministic time priority
    next_sequence: u64,
}

impl Market {
    fn new() -> Self {
        Self {
            bids: BidBook::new(),
            asks: AskBook::new(),
            orders: HashMap::new(),
            next_sequence: 0,
        }
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

/// Aggregated order book snapshot for external consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: Symbol,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Engine-level counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    /// Symbols with a live book
    pub markets: usize,
    /// Orders currently open across all symbols
    pub open_orders: usize,
    /// Trades executed since engine start
    pub trades_executed: u64,
}

/// The matching core
///
/// Shared by reference (`Arc<MatchingEngine>`); all methods take `&self`.
pub struct MatchingEngine {
    config: EngineConfig,
    ledger: Arc<dyn BalanceLedger>,
    sink: Arc<dyn EventSink>,
    markets: DashMap<Symbol, Mutex<Market>>,
    /// Routes order ids to their symbol shard
    order_symbols: DashMap<OrderId, Symbol>,
    user_orders: DashMap<UserId, Vec<OrderId>>,
    executor: TradeExecutor,
    trades_executed: AtomicU64,
}

impl MatchingEngine {
    /// Create an engine with the given configuration and collaborators
    pub fn new(config: EngineConfig, ledger: Arc<dyn BalanceLedger>, sink: Arc<dyn EventSink>) -> Self {
        let executor = TradeExecutor::new(1, config.fees.clone());
        Self {
            config,
            ledger,
            sink,
            markets: DashMap::new(),
            order_symbols: DashMap::new(),
            user_orders: DashMap::new(),
            executor,
            trades_executed: AtomicU64::new(0),
        }
    }

    /// Submit an order
    ///
    /// Validates, reserves funds, opens the order, and runs the inline
    /// matching pass, so the caller observes the final fill state. A
    /// well-formed order the venue cannot accept (insufficient funds,
    /// unfillable fill-or-kill, post-only that would cross) comes back
    /// with `Rejected` status and no side effects; malformed input is an
    /// error.
    pub fn submit_order(&self, request: OrderRequest) -> Result<Order, CoreError> {
        lifecycle::validate(&self.config, &request)?;

        let symbol = request.symbol.clone();
        self.markets
            .entry(symbol.clone())
            .or_insert_with(|| Mutex::new(Market::new()));
        let market_ref = self.markets.get(&symbol).expect("market exists after insert");
        let mut market = lock_market(&market_ref);

        let now = now_nanos();
        let sequence = market.next_sequence();
        let mut order = Order::new(
            request.user_id,
            request.symbol,
            request.side,
            request.order_type,
            request.amount,
            request.price,
            request.time_in_force,
            request.post_only,
            sequence,
            now,
        );

        // Post-only orders must rest untouched; reject before any ledger call.
        if order.post_only && self.would_cross(&market, &order) {
            order.reject(RejectReason::PostOnlyWouldCross, now);
            debug!(order_id = %order.id, "post-only order would cross, rejected");
            return Ok(order);
        }

        // Fill-or-kill: dry-run the crossable quantity before committing
        // anything, so a kill leaves zero trades and zero balance calls.
        if order.time_in_force == TimeInForce::Fok {
            let crossable = match order.side {
                Side::Buy => market.asks.crossable_quantity(&order.user_id, order.price),
                Side::Sell => market.bids.crossable_quantity(&order.user_id, order.price),
            };
            if crossable < order.amount.as_decimal() {
                order.reject(RejectReason::FillOrKillUnfillable, now);
                debug!(order_id = %order.id, "fill-or-kill cannot be fully satisfied, rejected");
                return Ok(order);
            }
        }

        // Reserve funds; failure aborts the submission with no book mutation.
        let (currency, reserve_amount) = lifecycle::reservation(&order, self.config.fees.taker_rate);
        if let Err(e) = self.ledger.reserve(order.user_id, &currency, reserve_amount) {
            let reason = match e {
                LedgerError::InsufficientFunds { .. } => RejectReason::InsufficientFunds,
                _ => RejectReason::LedgerUnavailable,
            };
            order.reject(reason, now);
            warn!(order_id = %order.id, error = %e, "reservation failed, order rejected");
            return Ok(order);
        }

        order.open(now);
        let order_id = order.id;
        self.order_symbols.insert(order_id, symbol.clone());
        self.user_orders.entry(order.user_id).or_default().push(order_id);
        market.orders.insert(order_id, order.clone());
        self.sink.notify(EngineEvent::OrderCreated(order.clone()));
        info!(
            order_id = %order_id,
            symbol = %symbol,
            side = ?order.side,
            amount = %order.amount,
            "order accepted"
        );

        // Inline matching pass: the new order is the taker.
        self.match_taker(&mut market, &symbol, order_id)?;

        // Disposition of any remainder.
        let (status, remaining) = {
            let o = market.orders.get(&order_id).expect("order in store");
            (o.status, o.remaining)
        };
        if status == OrderStatus::Open && !remaining.is_zero() {
            let rests = order.order_type == OrderType::Limit
                && order.time_in_force == TimeInForce::Gtc;
            if rests {
                let price = order.price.expect("limit orders carry a price");
                match order.side {
                    Side::Buy => market.bids.insert(price, order_id, order.user_id, remaining),
                    Side::Sell => market.asks.insert(price, order_id, order.user_id, remaining),
                }
            } else {
                // IOC semantics (market orders included): cancel the
                // remainder and release its reservation.
                self.release_remainder(&mut market, order_id, now)?;
            }
        }

        Ok(market.orders.get(&order_id).expect("order in store").clone())
    }

    /// Cancel an open order
    ///
    /// Releases the unfilled portion's reservation and removes the order
    /// from the book. Errors (`NotFound`, `NotOwner`, `InvalidState`)
    /// cause no side effects.
    pub fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<Order, CoreError> {
        let symbol = self
            .order_symbols
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or(CoreError::NotFound { order_id })?;
        let market_ref = self
            .markets
            .get(&symbol)
            .ok_or(CoreError::NotFound { order_id })?;
        let mut market = lock_market(&market_ref);

        {
            let order = market
                .orders
                .get(&order_id)
                .ok_or(CoreError::NotFound { order_id })?;
            if order.user_id != user_id {
                return Err(CoreError::NotOwner { order_id });
            }
            if order.status != OrderStatus::Open {
                return Err(CoreError::InvalidState {
                    order_id,
                    status: format!("{:?}", order.status),
                });
            }
        }

        let now = now_nanos();
        let (currency, release_amount) = {
            let order = market.orders.get(&order_id).expect("order in store");
            lifecycle::release_amount(order, self.config.fees.taker_rate)
        };
        if release_amount > Decimal::ZERO {
            self.ledger.release(user_id, &currency, release_amount)?;
        }

        let Market { orders, bids, asks, .. } = &mut *market;
        let order = orders.get_mut(&order_id).expect("order in store");
        order.cancel(CancelReason::UserRequested, now);
        if let Some(price) = order.price {
            match order.side {
                Side::Buy => bids.remove(&order_id, price),
                Side::Sell => asks.remove(&order_id, price),
            };
        }

        let cancelled = order.clone();
        self.sink.notify(EngineEvent::OrderCancelled(cancelled.clone()));
        info!(order_id = %order_id, "order cancelled");
        Ok(cancelled)
    }

    /// Sweep a symbol for resting crossable state
    ///
    /// Inline matching keeps the book uncrossed, so this normally finds
    /// nothing; it exists as a safety net the embedder may run on a
    /// cadence. Same-user pairs are skipped by advancing the scan, never
    /// by retrying.
    pub fn sweep(&self, symbol: &Symbol) -> Result<Vec<Trade>, CoreError> {
        let Some(market_ref) = self.markets.get(symbol) else {
            return Ok(Vec::new());
        };
        let mut market = lock_market(&market_ref);
        let now = now_nanos();

        let mut trades = Vec::new();
        loop {
            let Some((bid_id, ask_id)) = find_crossable_pair(&market) else {
                break;
            };

            let (bid_sequence, bid_price, bid_remaining) = {
                let bid = market.orders.get(&bid_id).expect("resting bid in store");
                (
                    bid.sequence,
                    bid.price.expect("resting orders carry a limit price"),
                    bid.remaining,
                )
            };
            let (ask_sequence, ask_price, ask_remaining) = {
                let ask = market.orders.get(&ask_id).expect("resting ask in store");
                (
                    ask.sequence,
                    ask.price.expect("resting orders carry a limit price"),
                    ask.remaining,
                )
            };

            // The earlier arrival's price is honored; the later one is
            // the taker for fee purposes.
            let (price, taker_side) = if bid_sequence <= ask_sequence {
                (bid_price, Side::Sell)
            } else {
                (ask_price, Side::Buy)
            };
            let quantity = bid_remaining.min(ask_remaining);

            let trade =
                self.execute_match(&mut market, symbol, bid_id, ask_id, taker_side, price, quantity, now)?;
            trades.push(trade);
        }

        if !trades.is_empty() {
            info!(symbol = %symbol, trades = trades.len(), "sweep matched resting orders");
        }
        Ok(trades)
    }

    /// Sweep every symbol with a live book
    pub fn sweep_all(&self) -> Result<Vec<Trade>, CoreError> {
        let symbols: Vec<Symbol> = self.markets.iter().map(|entry| entry.key().clone()).collect();
        let mut trades = Vec::new();
        for symbol in symbols {
            trades.extend(self.sweep(&symbol)?);
        }
        Ok(trades)
    }

    /// Look up an order by id
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        let symbol = self.order_symbols.get(&order_id)?.value().clone();
        let market_ref = self.markets.get(&symbol)?;
        let market = lock_market(&market_ref);
        market.orders.get(&order_id).cloned()
    }

    /// All orders ever accepted for a user, in submission order
    pub fn user_orders(&self, user_id: UserId) -> Vec<Order> {
        let ids = self
            .user_orders
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        ids.into_iter().filter_map(|id| self.order(id)).collect()
    }

    /// Aggregated depth snapshot for a symbol, top `depth` levels per side
    pub fn order_book_snapshot(&self, symbol: &Symbol, depth: usize) -> Option<OrderBookSnapshot> {
        let market_ref = self.markets.get(symbol)?;
        let market = lock_market(&market_ref);
        Some(OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: market.bids.depth_snapshot(depth),
            asks: market.asks.depth_snapshot(depth),
        })
    }

    /// Supported trading pairs
    pub fn symbols(&self) -> Vec<Symbol> {
        self.config.symbols.clone()
    }

    /// The engine's fee schedule
    pub fn fees(&self) -> types::fee::FeeSchedule {
        self.config.fees.clone()
    }

    /// Engine-level counters
    pub fn status(&self) -> EngineStatus {
        let mut open_orders = 0;
        for entry in self.markets.iter() {
            let market = lock_market(entry.value());
            open_orders += market
                .orders
                .values()
                .filter(|o| o.status == OrderStatus::Open)
                .count();
        }
        EngineStatus {
            markets: self.markets.len(),
            open_orders,
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
        }
    }

    /// Would this order execute immediately against the current book?
    fn would_cross(&self, market: &Market, order: &Order) -> bool {
        let best = match order.side {
            Side::Buy => market.asks.best_counterparty(&order.user_id),
            Side::Sell => market.bids.best_counterparty(&order.user_id),
        };
        best.map_or(false, |(price, _, _, _)| {
            crossing::taker_crosses(order.side, order.price, price)
        })
    }

    /// Match a just-opened order (the taker) against the opposite book
    fn match_taker(
        &self,
        market: &mut Market,
        symbol: &Symbol,
        taker_id: OrderId,
    ) -> Result<Vec<Trade>, CoreError> {
        let now = now_nanos();
        let mut trades = Vec::new();

        loop {
            let (taker_side, taker_user, taker_limit, taker_remaining, taker_status) = {
                let taker = market.orders.get(&taker_id).expect("taker in store");
                (
                    taker.side,
                    taker.user_id,
                    taker.price,
                    taker.remaining,
                    taker.status,
                )
            };
            if taker_status != OrderStatus::Open || taker_remaining.is_zero() {
                break;
            }

            // Best resting counterparty; the taker's own orders are
            // skipped and stay in the book.
            let best = match taker_side {
                Side::Buy => market.asks.best_counterparty(&taker_user),
                Side::Sell => market.bids.best_counterparty(&taker_user),
            };
            let Some((maker_price, maker_id, _, maker_remaining)) = best else {
                break;
            };
            if !crossing::taker_crosses(taker_side, taker_limit, maker_price) {
                break;
            }

            let quantity = taker_remaining.min(maker_remaining);
            let (buy_id, sell_id) = match taker_side {
                Side::Buy => (taker_id, maker_id),
                Side::Sell => (maker_id, taker_id),
            };

            // Trade executes at the resting order's price.
            let trade = self.execute_match(
                market, symbol, buy_id, sell_id, taker_side, maker_price, quantity, now,
            )?;
            trades.push(trade);
        }

        Ok(trades)
    }

    /// Execute one match: settle, mutate both orders, emit events
    ///
    /// Settlement runs before any order mutation; a ledger failure there
    /// aborts the match with both orders untouched.
    #[allow(clippy::too_many_arguments)]
    fn execute_match(
        &self,
        market: &mut Market,
        symbol: &Symbol,
        buy_id: OrderId,
        sell_id: OrderId,
        taker_side: Side,
        price: Price,
        quantity: Quantity,
        now: i64,
    ) -> Result<Trade, CoreError> {
        let (buy_user, buy_bound, buy_status) = {
            let buy = market.orders.get(&buy_id).expect("buy order in store");
            (buy.user_id, buy.price, buy.status)
        };
        let (sell_user, sell_status) = {
            let sell = market.orders.get(&sell_id).expect("sell order in store");
            (sell.user_id, sell.status)
        };
        // Checked immediately before mutating: under the symbol lock a
        // cancel cannot interleave, so anything else is store/book desync.
        if buy_status != OrderStatus::Open || sell_status != OrderStatus::Open {
            return Err(CoreError::SettlementInvariant {
                detail: format!("matched a non-open order ({buy_id} / {sell_id})"),
            });
        }

        let trade = self.executor.execute_trade(
            symbol.clone(),
            buy_id,
            sell_id,
            buy_user,
            sell_user,
            taker_side,
            price,
            quantity,
            now,
        )?;

        let quote_amount = quantity.as_decimal() * price.as_decimal();
        let settlement = Settlement {
            symbol: symbol.clone(),
            buy_user_id: buy_user,
            sell_user_id: sell_user,
            base_amount: quantity.as_decimal(),
            quote_amount,
            buyer_fee: trade.buyer_fee,
            seller_fee: trade.seller_fee,
        };
        self.ledger.settle(&settlement).map_err(|e| {
            error!(
                trade_id = %trade.id,
                error = %e,
                "settlement failed against an accepted reservation"
            );
            CoreError::SettlementInvariant { detail: e.to_string() }
        })?;

        // Release the buyer's per-fill surplus (price improvement plus
        // unused fee headroom) so the outstanding reservation stays at
        // remaining × bound × (1 + taker_rate).
        if let Some(bound) = buy_bound {
            let taker_rate = self.config.fees.taker_rate;
            let reserved_portion =
                quantity.as_decimal() * bound.as_decimal() * (Decimal::ONE + taker_rate);
            let surplus = reserved_portion - (quote_amount + trade.buyer_fee);
            if surplus > Decimal::ZERO {
                self.ledger
                    .release(buy_user, symbol.quote(), surplus)
                    .map_err(|e| CoreError::SettlementInvariant { detail: e.to_string() })?;
            }
        }

        let Market { orders, bids, asks, .. } = &mut *market;
        let buy = orders.get_mut(&buy_id).expect("buy order in store");
        buy.add_fill(quantity, price, now);
        if let Some(p) = buy.price {
            bids.reduce(&buy_id, p, quantity);
        }
        let buy_updated = buy.clone();

        let sell = orders.get_mut(&sell_id).expect("sell order in store");
        sell.add_fill(quantity, price, now);
        if let Some(p) = sell.price {
            asks.reduce(&sell_id, p, quantity);
        }
        let sell_updated = sell.clone();

        self.trades_executed.fetch_add(1, Ordering::Relaxed);
        self.sink.notify(EngineEvent::TradeExecuted(trade.clone()));
        self.sink.notify(EngineEvent::OrderUpdated(buy_updated));
        self.sink.notify(EngineEvent::OrderUpdated(sell_updated));
        debug!(
            trade_id = %trade.id,
            symbol = %symbol,
            price = %price,
            amount = %quantity,
            "trade executed"
        );

        Ok(trade)
    }

    /// Cancel an IOC/market remainder and release its reservation
    fn release_remainder(
        &self,
        market: &mut Market,
        order_id: OrderId,
        now: i64,
    ) -> Result<(), CoreError> {
        let (user_id, currency, amount) = {
            let order = market.orders.get(&order_id).expect("order in store");
            let (currency, amount) = lifecycle::release_amount(order, self.config.fees.taker_rate);
            (order.user_id, currency, amount)
        };
        if amount > Decimal::ZERO {
            self.ledger.release(user_id, &currency, amount)?;
        }

        let order = market.orders.get_mut(&order_id).expect("order in store");
        order.cancel(CancelReason::ImmediateOrCancel, now);
        let cancelled = order.clone();
        self.sink.notify(EngineEvent::OrderCancelled(cancelled));
        debug!(order_id = %order_id, "unfilled remainder cancelled");
        Ok(())
    }
}

/// First crossable (bid, ask) pair in price-time priority order
///
/// Same-user pairs are passed over by advancing the scan to the next
/// entry, so a user's own orders never block the rest of the book.
fn find_crossable_pair(market: &Market) -> Option<(OrderId, OrderId)> {
    let best_bid_price = market.bids.best_bid_price()?;
    for (ask_price, ask_id, ask_user, _) in market.asks.entries() {
        if ask_price > best_bid_price {
            break;
        }
        for (bid_price, bid_id, bid_user, _) in market.bids.entries() {
            if bid_price < ask_price {
                break;
            }
            if bid_user != ask_user {
                return Some((bid_id, ask_id));
            }
        }
    }
    None
}

fn lock_market(market: &Mutex<Market>) -> MutexGuard<'_, Market> {
    market.lock().expect("symbol lock poisoned")
}

fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
