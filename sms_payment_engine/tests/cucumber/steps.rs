use std::time::Duration;

use chrono::Utc;
use cucumber::{then, when};
use sms_payment_engine::{
    db_types::{Amount, NewOrder, OrderId, OrderStatusType, Provider},
    reconciliation_objects::IngestOutcome,
    StatisticsApi,
};

use crate::cucumber::ReconciliationWorld;

#[when(expr = "I receive an order with id {word} from '{word}' for {word} Tk via {word}, placed {int} minutes ago")]
async fn receive_order(
    world: &mut ReconciliationWorld,
    order_id: String,
    customer: String,
    amount: String,
    method: String,
    age: i64,
) {
    let amount = amount.parse::<Amount>().expect("Not a valid amount");
    let method = method.parse::<Provider>().expect("Not a valid provider");
    let created_at = Utc::now() - chrono::Duration::minutes(age);
    let order = NewOrder::new(OrderId::from(order_id), amount, method)
        .with_customer(&customer, "01700000000")
        .with_created_at(created_at);
    world.orders().create_order(order).await.expect("Error creating order");
}

#[when(expr = "I cancel order {word}")]
async fn cancel_order(world: &mut ReconciliationWorld, order_id: String) {
    world.orders().cancel_order(&OrderId::from(order_id)).await.expect("Error cancelling order");
}

#[when(expr = "an SMS from {string} reads {string}")]
async fn receive_sms(world: &mut ReconciliationWorld, sender: String, message: String) {
    let outcome = world.api().process_message(&message, &sender).await.expect("Error processing message");
    world.last_outcome = Some(outcome);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut ReconciliationWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the message is matched to order {word}")]
async fn message_matched(world: &mut ReconciliationWorld, order_id: String) {
    let IngestOutcome::Recorded { match_result, .. } = world.last_outcome() else {
        panic!("Message was not recorded: {:?}", world.last_outcome());
    };
    assert!(match_result.matched, "Message was not matched");
    let matched = match_result.order.as_ref().expect("Matched result has no order");
    assert_eq!(matched.order_id, OrderId::from(order_id));
}

#[then("the message is recorded without a match")]
async fn message_unmatched(world: &mut ReconciliationWorld) {
    let IngestOutcome::Recorded { match_result, .. } = world.last_outcome() else {
        panic!("Message was not recorded: {:?}", world.last_outcome());
    };
    assert!(!match_result.matched, "Message should not have matched");
}

#[then("the message is ignored as a duplicate")]
async fn message_duplicate(world: &mut ReconciliationWorld) {
    assert!(world.last_outcome().is_duplicate(), "Outcome was {:?}", world.last_outcome());
}

#[then("the message is rejected")]
async fn message_rejected(world: &mut ReconciliationWorld) {
    assert_eq!(world.last_outcome(), &IngestOutcome::Rejected);
}

#[then(expr = "the {word} message could not be read")]
async fn message_unreadable(world: &mut ReconciliationWorld, provider: String) {
    let provider = provider.parse::<Provider>().expect("Not a valid provider");
    assert_eq!(world.last_outcome(), &IngestOutcome::ExtractionFailed { provider });
}

#[then(expr = "order {word} is {word}")]
async fn order_status(world: &mut ReconciliationWorld, order_id: String, status: String) {
    let status = status.parse::<OrderStatusType>().expect("Not a valid order status");
    let order = world.orders().fetch_order(&OrderId::from(order_id)).await.expect("Error fetching order");
    let order = order.expect("Order does not exist");
    assert_eq!(order.status, status, "Order {} has the wrong status", order.order_id);
}

#[then(expr = "order {word} was paid by transaction {word}")]
async fn order_paid_by(world: &mut ReconciliationWorld, order_id: String, txid: String) {
    let order_id = OrderId::from(order_id);
    let order = world.orders().fetch_order(&order_id).await.expect("Error fetching order").expect("No such order");
    assert_eq!(order.transaction_id.as_deref(), Some(txid.as_str()));
    let transaction = world
        .orders()
        .transaction_for_order(&order_id)
        .await
        .expect("Error fetching transaction")
        .expect("Order has no transaction");
    assert_eq!(transaction.transaction_id, txid);
}

#[then(expr = "transaction {word} is recorded for {word} Tk from {word}")]
async fn transaction_recorded(world: &mut ReconciliationWorld, txid: String, amount: String, sender: String) {
    let amount = amount.parse::<Amount>().expect("Not a valid amount");
    let transaction = world.api().fetch_transaction(&txid).await.expect("Error fetching transaction");
    let transaction = transaction.expect("Transaction was not recorded");
    assert_eq!(transaction.amount, amount);
    assert_eq!(transaction.sender, sender);
}

#[then(expr = "there are {int} paid orders out of {int}, a match rate of {float}%")]
async fn statistics(world: &mut ReconciliationWorld, paid: i64, total: i64, rate: f64) {
    let stats = StatisticsApi::new(world.api().db().clone()).statistics().await.expect("Error fetching statistics");
    assert_eq!(stats.paid_orders, paid);
    assert_eq!(stats.total_orders, total);
    assert!((stats.match_rate - rate).abs() < 1e-9, "Match rate is {}", stats.match_rate);
}
