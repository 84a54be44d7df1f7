//! Concurrency tests
//!
//! Verifies that one shared engine serializes work per symbol while
//! distinct symbols proceed in parallel, and that matching stays
//! deterministic under identical inputs.

use std::sync::Arc;
use std::thread;

use matching_engine::{EngineConfig, MatchingEngine, MemoryLedger, OrderRequest, RecordingSink};
use rust_decimal::Decimal;
use types::ids::{Symbol, UserId};
use types::numeric::{Price, Quantity};
use types::order::Side;

fn qty(s: &str) -> Quantity {
    Quantity::from_str(s).unwrap()
}

#[test]
fn test_parallel_symbols_one_engine() {
    let symbols = ["BTC/USDT", "ETH/USDT", "LINK/USDT", "UNI/USDT"];
    let ledger = Arc::new(MemoryLedger::new());
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(MatchingEngine::new(
        EngineConfig::default(),
        ledger.clone(),
        sink.clone(),
    ));

    let handles: Vec<_> = symbols
        .into_iter()
        .map(|sym| {
            let engine = engine.clone();
            let ledger = ledger.clone();
            thread::spawn(move || {
                let symbol = Symbol::new(sym);
                let maker = UserId::new();
                let taker = UserId::new();
                ledger.deposit(maker, symbol.base(), Decimal::from(1_000));
                ledger.deposit(taker, symbol.quote(), Decimal::from(100_000_000));

                // 200 matched pairs per symbol
                for _ in 0..200 {
                    engine
                        .submit_order(OrderRequest::limit(
                            maker,
                            symbol.clone(),
                            Side::Sell,
                            qty("1.0"),
                            Price::from_u64(50),
                        ))
                        .unwrap();
                    engine
                        .submit_order(OrderRequest::limit(
                            taker,
                            symbol.clone(),
                            Side::Buy,
                            qty("1.0"),
                            Price::from_u64(50),
                        ))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let status = engine.status();
    assert_eq!(status.markets, 4);
    assert_eq!(status.open_orders, 0);
    assert_eq!(status.trades_executed, 800); // 200 trades × 4 symbols
    assert_eq!(sink.trade_count(), 800);
}

#[test]
fn test_identical_inputs_identical_outcomes() {
    let run = || {
        let ledger = Arc::new(MemoryLedger::new());
        let sink = Arc::new(RecordingSink::new());
        let engine = MatchingEngine::new(EngineConfig::default(), ledger.clone(), sink.clone());

        let symbol = Symbol::new("BTC/USDT");
        let alice = UserId::new();
        let bob = UserId::new();
        ledger.deposit(alice, "BTC", Decimal::from(1_000));
        ledger.deposit(bob, "USDT", Decimal::from(10_000_000));

        // Laddered asks, then a buy that walks them
        for (price, amount) in [(100u64, "1.0"), (101, "2.0"), (102, "3.0")] {
            engine
                .submit_order(OrderRequest::limit(
                    alice,
                    symbol.clone(),
                    Side::Sell,
                    qty(amount),
                    Price::from_u64(price),
                ))
                .unwrap();
        }
        let buy = engine
            .submit_order(OrderRequest::limit(
                bob,
                symbol.clone(),
                Side::Buy,
                qty("4.0"),
                Price::from_u64(101),
            ))
            .unwrap();

        let snapshot = engine.order_book_snapshot(&symbol, 10).unwrap();
        (
            buy.filled,
            buy.average_price,
            sink.trade_count(),
            snapshot.bids.len(),
            snapshot.asks.len(),
        )
    };

    let h1 = thread::spawn(run);
    let h2 = thread::spawn(run);
    let r1 = h1.join().unwrap();
    let r2 = h2.join().unwrap();

    assert_eq!(r1, r2, "identical inputs must produce identical results");
    // 1.0 @ 100 + 2.0 @ 101 fills; 1.0 remains resting at 101
    assert_eq!(r1.0, qty("3.0"));
    assert_eq!(r1.2, 2);
}

#[test]
fn test_concurrent_submissions_same_symbol_conserve_quantity() {
    let ledger = Arc::new(MemoryLedger::new());
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(MatchingEngine::new(
        EngineConfig::default(),
        ledger.clone(),
        sink.clone(),
    ));
    let symbol = Symbol::new("BTC/USDT");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = engine.clone();
            let ledger = ledger.clone();
            let symbol = symbol.clone();
            thread::spawn(move || {
                let user = UserId::new();
                ledger.deposit(user, "BTC", Decimal::from(1_000));
                ledger.deposit(user, "USDT", Decimal::from(10_000_000));
                let side = if i % 2 == 0 { Side::Sell } else { Side::Buy };
                for _ in 0..100 {
                    engine
                        .submit_order(OrderRequest::limit(
                            user,
                            symbol.clone(),
                            side,
                            qty("1.0"),
                            Price::from_u64(100),
                        ))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Whatever interleaving happened, every order is internally
    // consistent and every trade has distinct parties.
    let mut total_buy_fills = Decimal::ZERO;
    let mut total_sell_fills = Decimal::ZERO;
    for event in sink.events() {
        if let matching_engine::EngineEvent::TradeExecuted(trade) = event {
            assert!(trade.validate_no_self_trade());
            total_buy_fills += trade.amount.as_decimal();
            total_sell_fills += trade.amount.as_decimal();
        }
    }
    assert_eq!(total_buy_fills, total_sell_fills);

    // 200 buys vs 200 sells at one price from four users: the book ends
    // with at most one side populated.
    let snapshot = engine.order_book_snapshot(&symbol, 100).unwrap();
    assert!(snapshot.bids.is_empty() || snapshot.asks.is_empty());
}
