mod common;

use std::time::Duration;

use tether_bindables::*;

#[tokio::test]
async fn test_wait_value_from_bound_copy() {
    let ready = Bindable::new(false);
    let writer = ready.get_bound_copy();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        writer.set_value(true).unwrap();
    });

    tokio::time::timeout(Duration::from_secs(5), ready.wait_value(true)).await.expect("timed out waiting for ready");
    assert!(ready.value());
}

#[tokio::test]
async fn test_wait_for_aggregate_result() {
    let total = AggregateBindable::new(|a: &i64, b: &i64| a + b, Bindable::new(0));
    let a = Bindable::new(1i64);
    total.add_source(&a).unwrap();

    let result = total.result();
    let waiter = tokio::spawn(async move { result.wait_for(|value: &i64| *value > 10).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    a.set_value(20).unwrap();
    tokio::time::timeout(Duration::from_secs(5), waiter).await.expect("timed out").unwrap();
}
