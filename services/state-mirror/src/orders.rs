//! Working orders reconciliation
//!
//! Frames are tagged: `os` snapshot, `on`/`ou` upsert by order id, `oc`
//! remove by order id. Raw mode keeps rows as received; keyed mode projects
//! them through the order field map and splits them by amount sign.

use serde_json::Value;
use tracing::{debug, trace};
use types::book::{Side, Sides};
use types::errors::MirrorError;
use types::frame::FrameBody;
use types::order::{OrderEntry, OrdersState};
use types::record::Record;
use types::scalar::Scalar;

use crate::model::{FrameClass, ModelConfig, Parsed, Reconcile, StateRef, Update};

/// Snapshot tag
pub const ORDERS_SNAPSHOT: &str = "os";
/// Cancel / close tag
pub const ORDERS_CLOSE: &str = "oc";

/// Working orders mirror.
#[derive(Debug, Clone)]
pub struct OrdersModel {
    config: ModelConfig,
    state: OrdersState,
}

impl OrdersModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            state: OrdersState::empty(config.keyed),
        }
    }

    pub fn boxed(config: ModelConfig) -> Box<dyn Reconcile> {
        Box::new(Self::new(config))
    }

    pub fn orders(&self) -> &OrdersState {
        &self.state
    }

    fn parse_snapshot(&self, body: FrameBody<'_>) -> Result<OrdersState, MirrorError> {
        let rows = body.payload.as_array().ok_or_else(|| {
            MirrorError::malformed("orders snapshot", format!("expected an array of rows, got {}", body.payload))
        })?;

        if !self.config.keyed {
            for row in rows {
                OrderEntry::id_of(row)?;
            }
            return Ok(OrdersState::Raw(rows.clone()));
        }

        let mut sides = Sides::default();
        for row in rows {
            let order = OrderEntry::from_row(row)?;
            sides.side_mut(order.side()).push(order);
        }
        Ok(OrdersState::Keyed(sides))
    }

    fn parse_delta(&self, body: FrameBody<'_>) -> Result<Record<OrderEntry>, MirrorError> {
        if self.config.keyed {
            return Ok(Record::Keyed(OrderEntry::from_row(body.payload)?));
        }

        OrderEntry::id_of(body.payload)?;
        Ok(Record::Raw(body.payload.clone()))
    }

    /// Drop the order named by a close payload. Each layout reads the
    /// payload the way its deltas are parsed.
    fn remove(&mut self, payload: &Value) -> Result<(), MirrorError> {
        let before = self.state.len();

        let id = match &mut self.state {
            OrdersState::Raw(rows) => {
                let id = OrderEntry::id_of(payload)?;
                rows.retain(|row| !has_id(row, &id));
                id
            }
            OrdersState::Keyed(sides) => {
                let id = OrderEntry::from_row(payload)?.id;
                sides.bids.retain(|order| order.id != id);
                sides.asks.retain(|order| order.id != id);
                id
            }
        };

        if self.state.len() == before {
            trace!(id = %id, "Close for unknown order id");
        }
        Ok(())
    }

    fn upsert(&mut self, payload: &Value) -> Result<(), MirrorError> {
        match &mut self.state {
            OrdersState::Raw(rows) => {
                let id = OrderEntry::id_of(payload)?;
                match rows.iter().position(|row| has_id(row, &id)) {
                    Some(idx) => rows[idx] = payload.clone(),
                    None => rows.push(payload.clone()),
                }
            }
            OrdersState::Keyed(sides) => {
                let order = OrderEntry::from_row(payload)?;
                let existing = [Side::Bid, Side::Ask].into_iter().find_map(|side| {
                    sides.side(side).iter().position(|o| o.id == order.id).map(|idx| (side, idx))
                });

                match existing {
                    Some((side, idx)) => sides.side_mut(side)[idx] = order,
                    None => sides.side_mut(order.side()).push(order),
                }
            }
        }
        Ok(())
    }
}

fn has_id(row: &Value, id: &Scalar) -> bool {
    OrderEntry::id_of(row).map(|row_id| &row_id == id).unwrap_or(false)
}

impl Reconcile for OrdersModel {
    fn name(&self) -> &'static str {
        "OrdersModel"
    }

    fn classify(&self, body: FrameBody<'_>) -> FrameClass {
        if body.tag == Some(ORDERS_SNAPSHOT) {
            FrameClass::Snapshot
        } else {
            FrameClass::Delta
        }
    }

    fn parse(&self, body: FrameBody<'_>) -> Result<Parsed, MirrorError> {
        let update = match self.classify(body) {
            FrameClass::Snapshot => Update::Snapshot(self.parse_snapshot(body)?),
            FrameClass::Delta => Update::Delta(self.parse_delta(body)?),
        };
        Ok(Parsed::Orders(update))
    }

    fn apply_snapshot(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        self.state = self.parse_snapshot(body)?;
        debug!(orders = self.state.len(), keyed = self.config.keyed, "Orders snapshot applied");
        Ok(())
    }

    fn apply_delta(&mut self, body: FrameBody<'_>) -> Result<(), MirrorError> {
        if body.tag == Some(ORDERS_CLOSE) {
            self.remove(body.payload)
        } else {
            self.upsert(body.payload)
        }
    }

    fn state(&self) -> StateRef<'_> {
        StateRef::Orders(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn order(id: u64, symbol: &str, amount: f64, status: &str) -> Value {
        json!([
            id, null, 1000 + id, symbol, 1573000000000u64, 1573000000001u64, amount, amount,
            "EXCHANGE LIMIT", null, null, null, 0, status, null, null, 7200, 0
        ])
    }

    fn snapshot() -> Value {
        json!([
            order(1, "tBTCUSD", 0.5, "ACTIVE"),
            order(2, "tBTCUSD", -0.25, "ACTIVE"),
            order(3, "tETHUSD", 2.0, "ACTIVE")
        ])
    }

    #[test]
    fn test_raw_snapshot_passes_rows_through() {
        let mut model = OrdersModel::new(ModelConfig::default());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();
        assert_eq!(model.state().to_value(), snapshot());
    }

    #[test]
    fn test_keyed_snapshot_splits_by_sign() {
        let mut model = OrdersModel::new(ModelConfig::keyed());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();

        let state = model.state().to_value();
        assert_eq!(state["bids"].as_array().unwrap().len(), 2);
        assert_eq!(state["asks"][0]["id"], json!(2));
        assert_eq!(state["asks"][0]["symbol"], json!("tBTCUSD"));
        assert_eq!(state["asks"][0]["amountOrig"], json!(-0.25));
    }

    #[test]
    fn test_raw_new_then_update_then_close() {
        let mut model = OrdersModel::new(ModelConfig::default());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();

        model.update(FrameBody::tagged("on", &order(4, "tBTCUSD", 1.0, "ACTIVE"))).unwrap();
        assert_eq!(model.orders().len(), 4);

        let partial = order(4, "tBTCUSD", 0.4, "PARTIALLY FILLED @ 7200(0.6)");
        model.update(FrameBody::tagged("ou", &partial)).unwrap();
        assert_eq!(model.orders().len(), 4);
        assert_eq!(model.state().to_value()[3], partial);

        model.update(FrameBody::tagged("oc", &order(4, "tBTCUSD", 0.0, "EXECUTED"))).unwrap();
        assert_eq!(model.state().to_value(), snapshot());
    }

    #[test]
    fn test_keyed_update_replaces_in_place_across_sides() {
        let mut model = OrdersModel::new(ModelConfig::keyed());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();

        // id 2 was an ask; an update with a zero remaining amount stays in place
        model.update(FrameBody::tagged("ou", &order(2, "tBTCUSD", 0.0, "ACTIVE"))).unwrap();

        let OrdersState::Keyed(sides) = model.orders() else {
            panic!("expected keyed state");
        };
        assert_eq!(sides.asks.len(), 1);
        assert_eq!(sides.asks[0].amount, Scalar::from_value(&json!(0.0)).unwrap());
        assert_eq!(sides.bids.len(), 2);
    }

    #[test]
    fn test_keyed_close_searches_both_sides() {
        let mut model = OrdersModel::new(ModelConfig::keyed());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();
        model.update(FrameBody::tagged("oc", &order(2, "tBTCUSD", 0.0, "CANCELED"))).unwrap();
        model.update(FrameBody::tagged("oc", &order(1, "tBTCUSD", 0.0, "CANCELED"))).unwrap();

        let state = model.state().to_value();
        assert_eq!(state["asks"], json!([]));
        assert_eq!(state["bids"].as_array().unwrap().len(), 1);
        assert_eq!(state["bids"][0]["symbol"], json!("tETHUSD"));
    }

    #[test]
    fn test_close_unknown_id_is_noop() {
        let mut model = OrdersModel::new(ModelConfig::default());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();
        model.update(FrameBody::tagged("oc", &order(99, "tBTCUSD", 0.0, "CANCELED"))).unwrap();
        assert_eq!(model.orders().len(), 3);
    }

    #[test]
    fn test_parse_keyed_delta_is_record() {
        let model = OrdersModel::new(ModelConfig::keyed());
        let parsed = model.parse(FrameBody::tagged("on", &order(7, "tBTCUSD", 1.0, "ACTIVE"))).unwrap();
        assert_eq!(parsed.to_value()["id"], json!(7));
        assert_eq!(parsed.to_value()["status"], json!("ACTIVE"));
    }

    #[test]
    fn test_row_without_id_is_malformed() {
        let mut model = OrdersModel::new(ModelConfig::default());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();
        let err = model.update(FrameBody::tagged("on", &json!([null, null]))).unwrap_err();
        assert!(matches!(err, MirrorError::MalformedFrame { .. }));
        assert_eq!(model.orders().len(), 3);
    }

    #[test]
    fn test_keyed_delta_needs_full_order() {
        let mut model = OrdersModel::new(ModelConfig::keyed());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();

        for tag in ["on", "ou", "oc"] {
            let err = model.update(FrameBody::tagged(tag, &json!(["2"]))).unwrap_err();
            assert!(matches!(err, MirrorError::MalformedFrame { .. }));
        }
        assert_eq!(model.orders().len(), 3);
    }

    #[test]
    fn test_raw_close_needs_only_id() {
        let mut model = OrdersModel::new(ModelConfig::default());
        model.update(FrameBody::tagged("os", &snapshot())).unwrap();
        model.update(FrameBody::tagged("oc", &json!([2]))).unwrap();
        assert_eq!(model.orders().len(), 2);
    }
}
