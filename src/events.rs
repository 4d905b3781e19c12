//! Outbound NATS events. Publishing is fire and forget, the order flow
//! never fails because the broker is down.

use rust_decimal::Decimal;
use serde::Serialize;

pub const ORDER_PLACED_SUBJECT: &str = "tshirtify.orders.placed";

#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub order_id: i64,
    pub user_id: i64,
    pub total_amount: Decimal,
    pub item_count: i64,
}

pub async fn publish_order_placed(
    nats: &Option<async_nats::Client>,
    order_id: i64,
    user_id: i64,
    total_amount: Decimal,
    item_count: i64,
) {
    let Some(client) = nats else { return };

    let event = OrderPlaced {
        order_id,
        user_id,
        total_amount,
        item_count,
    };
    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(order_id, error = %err, "failed to encode order event");
            return;
        }
    };
    if let Err(err) = client
        .publish(ORDER_PLACED_SUBJECT.to_string(), payload.into())
        .await
    {
        tracing::warn!(order_id, error = %err, "failed to publish order event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_event_serializes_amount_as_number() {
        let event = OrderPlaced {
            order_id: 7,
            user_id: 3,
            total_amount: Decimal::new(5998, 2),
            item_count: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["order_id"], 7);
        assert_eq!(json["total_amount"], 59.98);
    }
}
