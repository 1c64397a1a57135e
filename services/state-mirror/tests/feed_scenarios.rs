//! End-to-end feed scenarios for the State Mirror Service
//!
//! Drives a `FrameDispatcher` with frame sequences as the venue sends them
//! and checks mirrored state and callback delivery.
//!
//! Tests include:
//! - Channel lifecycle (subscribe, route, unsubscribe, drop)
//! - Keyed and raw order books from configuration
//! - Wallet snapshot + update
//! - Orders mirrored per trading pair
//! - Positions open and close
//! - Trade pass-through
//! - Decode errors and the override hook

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use state_mirror::config::{BookVariant, MirrorConfig, WalletFeed};
use state_mirror::dispatcher::FrameDispatcher;
use state_mirror::model::{ModelConfig, Parsed, StateRef};
use types::errors::MirrorError;
use types::kind::{EntityKind, Scope};

type Log = Rc<RefCell<Vec<Value>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn feed(dispatcher: &mut FrameDispatcher, frames: &[Value]) {
    for frame in frames {
        dispatcher.handle_frame(frame).unwrap();
    }
}

fn state_of(dispatcher: &FrameDispatcher, kind: EntityKind, filter: Option<&str>) -> Option<Value> {
    dispatcher.state(kind, filter).map(|state| state.to_value())
}

fn order_row(id: u64, symbol: &str, amount: f64) -> Value {
    json!([
        id, null, 1573000000, symbol, 1573000000000u64, 1573000000000u64,
        amount, amount, "EXCHANGE LIMIT", null, null, null, 0, "ACTIVE",
        null, null, 9000.5, 0, 0, 0
    ])
}

// ----- Channel lifecycle -----

#[test]
fn test_channel_lifecycle() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let updates = log();
    let sink = updates.clone();
    dispatcher.on_managed_orderbook(Some("BTCUSD"), move |_: &Parsed, state: StateRef<'_>| {
        sink.borrow_mut().push(state.to_value());
    });

    feed(
        &mut dispatcher,
        &[
            json!({ "event": "subscribed", "channel": "book", "chanId": 5, "symbol": "BTCUSD" }),
            json!([5, [["1.0", 2, "2.0"], ["2.2", 1, "-1.0"]]]),
            json!([5, ["2.3", 1, "0.3"]]),
        ],
    );

    assert_eq!(updates.borrow().len(), 2);
    assert_eq!(
        state_of(&dispatcher, EntityKind::Orderbook, Some("BTCUSD")),
        Some(json!([["1.0", 2, "2.0"], ["2.2", 1, "-1.0"], ["2.3", 1, "0.3"]]))
    );

    feed(
        &mut dispatcher,
        &[
            json!({ "event": "unsubscribed", "status": "OK", "chanId": 5 }),
            json!([5, ["2.4", 1, "0.1"]]),
        ],
    );

    assert!(dispatcher.channels().is_empty());
    assert!(dispatcher.state(EntityKind::Orderbook, Some("BTCUSD")).is_none());
    assert_eq!(dispatcher.stats().dropped_unbound, 1);
    assert_eq!(updates.borrow().len(), 2);
}

#[test]
fn test_two_symbols_are_isolated() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    feed(
        &mut dispatcher,
        &[
            json!({ "event": "subscribed", "channel": "book", "chanId": 5, "symbol": "tBTCUSD" }),
            json!({ "event": "subscribed", "channel": "book", "chanId": 6, "symbol": "tETHUSD" }),
            json!([5, [["9000", 1, "0.5"]]]),
            json!([6, [["200", 3, "-4"], ["199", 1, "2"]]]),
            json!({ "event": "unsubscribed", "channel": "book", "chanId": 6 }),
        ],
    );

    assert_eq!(dispatcher.state(EntityKind::Orderbook, Some("tBTCUSD")).unwrap().len(), 1);
    assert!(dispatcher.state(EntityKind::Orderbook, Some("tETHUSD")).is_none());
    assert_eq!(dispatcher.channels().len(), 1);
}

// ----- Order books from configuration -----

#[test]
fn test_keyed_price_level_book() {
    let config = MirrorConfig::default().with_component(EntityKind::Orderbook, ModelConfig::keyed());
    let mut dispatcher = FrameDispatcher::from_config(&config);

    feed(
        &mut dispatcher,
        &[
            json!({ "event": "subscribed", "channel": "book", "chanId": 5, "symbol": "BTCUSD" }),
            json!([5, [["1.0", 2, "2.0"], ["2.2", 1, "-1.0"], ["2.3", 1, "0.3"]]]),
        ],
    );

    assert_eq!(
        state_of(&dispatcher, EntityKind::Orderbook, Some("BTCUSD")),
        Some(json!({
            "bids": [
                { "price": "2.3", "count": 1, "amount": "0.3" },
                { "price": "1.0", "count": 2, "amount": "2.0" }
            ],
            "asks": [
                { "price": "2.2", "count": 1, "amount": "-1.0" }
            ]
        }))
    );
}

#[test]
fn test_raw_indexed_book_delete() {
    let config = MirrorConfig::default().with_book(BookVariant::Indexed);
    let mut dispatcher = FrameDispatcher::from_config(&config);

    feed(
        &mut dispatcher,
        &[
            json!({ "event": "subscribed", "channel": "book", "chanId": 8, "symbol": "tBTCUSD", "prec": "R0" }),
            json!([8, [[1001, 9000, 10000], [1002, 9001, -12000]]]),
            json!([8, [1001, 0, 0]]),
        ],
    );

    assert_eq!(
        state_of(&dispatcher, EntityKind::Orderbook, Some("tBTCUSD")),
        Some(json!([[1002, 9001, -12000]]))
    );
}

// ----- Account feeds -----

#[test]
fn test_wallet_update_fills_available_balance() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let updates = log();
    let sink = updates.clone();
    dispatcher.on_wallet(move |parsed: &Parsed| sink.borrow_mut().push(parsed.to_value()));

    feed(
        &mut dispatcher,
        &[
            json!([0, "ws", [["exchange", "ETH", 100, 0, 100]]]),
            json!([0, "wu", ["exchange", "ETH", 93.994, 0, null]]),
        ],
    );

    assert_eq!(
        state_of(&dispatcher, EntityKind::Wallet, None),
        Some(json!([["exchange", "ETH", 93.994, 0, 93.994]]))
    );
    assert_eq!(updates.borrow().len(), 2);
}

#[test]
fn test_keyed_wallet_feed() {
    let config = MirrorConfig {
        wallet_feed: WalletFeed::Keyed,
        ..MirrorConfig::default()
    };
    let mut dispatcher = FrameDispatcher::from_config(&config);

    feed(
        &mut dispatcher,
        &[json!([0, "ws", {
            "exchange:ETH": { "wallettype": "exchange", "currency": "ETH", "balance": "1.5", "unsettled_interest": "0" },
            "margin:USD": { "wallettype": "margin", "currency": "USD", "balance": 20 }
        }])],
    );

    assert_eq!(
        state_of(&dispatcher, EntityKind::Wallet, None),
        Some(json!([
            ["exchange", "ETH", "1.5", "0", null],
            ["margin", "USD", 20, null, null]
        ]))
    );
}

#[test]
fn test_orders_mirrored_per_pair() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let eth_updates = log();
    let sink = eth_updates.clone();
    dispatcher.on_orders(Some("tETHUSD"), move |parsed: &Parsed| {
        sink.borrow_mut().push(parsed.to_value())
    });

    feed(
        &mut dispatcher,
        &[json!([0, "os", [order_row(1, "tBTCUSD", 0.5), order_row(2, "tBTCUSD", -1.0)]])],
    );
    assert_eq!(dispatcher.state(EntityKind::Orders, None).unwrap().len(), 2);
    assert_eq!(dispatcher.state(EntityKind::Orders, Some("tBTCUSD")).unwrap().len(), 2);

    feed(&mut dispatcher, &[json!([0, "on", order_row(3, "tETHUSD", 2.0)])]);
    assert_eq!(dispatcher.state(EntityKind::Orders, None).unwrap().len(), 3);
    assert_eq!(dispatcher.state(EntityKind::Orders, Some("tETHUSD")).unwrap().len(), 1);
    assert_eq!(*eth_updates.borrow(), vec![order_row(3, "tETHUSD", 2.0)]);

    feed(&mut dispatcher, &[json!([0, "oc", order_row(1, "tBTCUSD", 0.5)])]);
    assert_eq!(dispatcher.state(EntityKind::Orders, None).unwrap().len(), 2);
    assert_eq!(dispatcher.state(EntityKind::Orders, Some("tBTCUSD")).unwrap().len(), 1);

    // An empty snapshot clears every pair scope.
    feed(&mut dispatcher, &[json!([0, "os", []])]);
    assert_eq!(
        dispatcher.registry().scopes(EntityKind::Orders),
        vec![Scope::Default, Scope::symbol("tBTCUSD"), Scope::symbol("tETHUSD")]
    );
    for filter in [None, Some("tBTCUSD"), Some("tETHUSD")] {
        assert!(dispatcher.state(EntityKind::Orders, filter).unwrap().is_empty());
    }
    assert_eq!(eth_updates.borrow().len(), 2);
}

#[test]
fn test_positions_open_and_close() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let position = json!(["tBTCUSD", "ACTIVE", 0.5, 9000, 0, 0, null, null, null, null]);

    feed(
        &mut dispatcher,
        &[
            json!([0, "ps", []]),
            json!([0, "pn", position]),
            json!([0, "pu", ["tBTCUSD", "ACTIVE", 0.75, 9010, 0, 0, null, null, null, null]]),
        ],
    );
    assert_eq!(
        state_of(&dispatcher, EntityKind::Positions, None),
        Some(json!([["tBTCUSD", "ACTIVE", 0.75, 9010, 0, 0, null, null, null, null]]))
    );

    feed(&mut dispatcher, &[json!([0, "pc", position])]);
    assert!(dispatcher.state(EntityKind::Positions, None).unwrap().is_empty());
}

// ----- Trades -----

#[test]
fn test_public_trades_reach_default_and_symbol() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let all = log();
    let btc = log();
    let (all_sink, btc_sink) = (all.clone(), btc.clone());
    dispatcher.on_public_trades(None, move |parsed: &Parsed| {
        all_sink.borrow_mut().push(parsed.to_value())
    });
    dispatcher.on_public_trades(Some("tBTCUSD"), move |parsed: &Parsed| {
        btc_sink.borrow_mut().push(parsed.to_value())
    });

    let tick = json!([7, "te", [401597393, 1574694475039u64, 0.005, 7244.9]]);
    feed(
        &mut dispatcher,
        &[
            json!({ "event": "subscribed", "channel": "trades", "chanId": 7, "symbol": "tBTCUSD" }),
            json!([7, [[401597393, 1574694475039u64, 0.005, 7244.9]]]),
            tick.clone(),
        ],
    );

    assert_eq!(all.borrow().len(), 2);
    assert_eq!(btc.borrow().len(), 2);
    assert_eq!(btc.borrow()[1], tick);
    assert!(dispatcher.registry().is_empty());
}

#[test]
fn test_trade_tick_on_unbound_channel_reaches_default_only() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let all = log();
    let sink = all.clone();
    dispatcher.on_public_trades(None, move |parsed: &Parsed| sink.borrow_mut().push(parsed.to_value()));

    feed(&mut dispatcher, &[json!([17, "tu", [1, 1574694475039u64, 0.1, 7000]])]);
    assert_eq!(all.borrow().len(), 1);
    assert_eq!(dispatcher.stats().dropped_unbound, 0);
}

#[test]
fn test_private_trades() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let fills = log();
    let sink = fills.clone();
    dispatcher.on_private_trades(move |parsed: &Parsed| sink.borrow_mut().push(parsed.to_value()));

    let fill = json!([0, "te", [1, "tBTCUSD", 1574694475039u64, 101, 0.01, 7200, "EXCHANGE LIMIT", 7200, 1, null, null, 1574694475000u64]]);
    feed(&mut dispatcher, &[fill.clone()]);
    assert_eq!(*fills.borrow(), vec![fill]);
}

// ----- Errors and hooks -----

#[test]
fn test_decode_error_keeps_state() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    dispatcher
        .handle_text(r#"{"event":"subscribed","channel":"book","chanId":5,"symbol":"BTCUSD"}"#)
        .unwrap();
    dispatcher.handle_text(r#"[5,[["1.0",2,"2.0"]]]"#).unwrap();

    let err = dispatcher.handle_text("[5,[[\"1.0\",").unwrap_err();
    match err {
        MirrorError::Decode { raw, .. } => assert_eq!(raw, "[5,[[\"1.0\","),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(dispatcher.state(EntityKind::Orderbook, Some("BTCUSD")).unwrap().len(), 1);
}

#[test]
fn test_override_hook_claims_frames() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    let claimed = log();
    let sink = claimed.clone();
    dispatcher.set_override(move |frame: &Value| {
        let ours = frame.get(1).and_then(Value::as_str) == Some("n");
        if ours {
            sink.borrow_mut().push(frame.clone());
        }
        ours
    });

    feed(
        &mut dispatcher,
        &[
            json!([0, "n", [1574694475039u64, "on-req", null, null, [], null, "SUCCESS", "Submitting"]]),
            json!([0, "ws", [["exchange", "USD", 10, 0, 10]]]),
        ],
    );

    assert_eq!(claimed.borrow().len(), 1);
    assert_eq!(dispatcher.stats().overridden, 1);
    assert_eq!(dispatcher.state(EntityKind::Wallet, None).unwrap().len(), 1);
}

#[test]
fn test_heartbeats_do_not_touch_state() {
    let mut dispatcher = FrameDispatcher::with_defaults();
    feed(
        &mut dispatcher,
        &[
            json!({ "event": "info", "version": 2 }),
            json!([0, "hb"]),
            json!([5, "hb"]),
        ],
    );

    let stats = dispatcher.stats();
    assert_eq!(stats.events, 1);
    assert_eq!(stats.heartbeats, 2);
    assert!(dispatcher.registry().is_empty());
}
