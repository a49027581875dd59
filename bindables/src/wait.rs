use std::future::Future;

use crate::{
    bindable::{Bindable, BindableValue, ValueChanged},
    read::ReadBindable,
};

/// Helper trait for [`Wait::wait_for`] to allow flexible predicate return types.
///
/// - `true` / `Some(output)` stops waiting
/// - `false` / `None` keeps waiting for the next change
pub trait WaitResult {
    type Output;
    fn result(self) -> Option<Self::Output>;
}

impl WaitResult for bool {
    type Output = ();
    fn result(self) -> Option<()> { if self { Some(()) } else { None } }
}

impl<T> WaitResult for Option<T> {
    type Output = T;
    fn result(self) -> Option<T> { self }
}

/// Waiting on bindable values asynchronously
pub trait Wait<T> {
    /// Resolves once the value equals `target`
    fn wait_value(&self, target: T) -> impl Future<Output = ()> + Send;

    /// Resolves with the first value for which `predicate` stops the wait
    fn wait_for<F, R>(&self, predicate: F) -> impl Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult + Send,
        R::Output: Send;
}

impl<T: BindableValue> Wait<T> for ReadBindable<T> {
    fn wait_value(&self, target: T) -> impl Future<Output = ()> + Send { self.wait_for(move |value: &T| *value == target) }

    fn wait_for<F, R>(&self, predicate: F) -> impl Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult + Send,
        R::Output: Send,
    {
        async move {
            // Subscribe before checking so a change between the check and the subscription is not missed
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let _subscription = self.subscribe(move |_: &ValueChanged<T>| {
                let _ = tx.send(());
            });

            loop {
                if let Some(result) = self.with(|value| predicate(value).result()) {
                    return result;
                }
                if rx.recv().await.is_none() {
                    // Unreachable while the subscription holds the sender
                    tracing::warn!("bindable change channel closed while waiting");
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

impl<T: BindableValue> Wait<T> for Bindable<T> {
    fn wait_value(&self, target: T) -> impl Future<Output = ()> + Send {
        let read = self.read();
        async move { read.wait_value(target).await }
    }

    fn wait_for<F, R>(&self, predicate: F) -> impl Future<Output = R::Output> + Send
    where
        F: Fn(&T) -> R + Send + Sync + 'static,
        R: WaitResult + Send,
        R::Output: Send,
    {
        let read = self.read();
        async move { read.wait_for(predicate).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_value_already_matching() {
        let flag = Bindable::new(true);
        flag.wait_value(true).await;
    }

    #[tokio::test]
    async fn test_wait_for_later_change() {
        let counter = Bindable::new(0);
        let writer = counter.get_bound_copy();

        let handle = tokio::spawn(async move {
            for i in 1..=5 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                writer.set_value(i).unwrap();
            }
            writer
        });

        let seen = tokio::time::timeout(Duration::from_secs(5), counter.wait_for(|value: &i32| (*value >= 3).then_some(*value)))
            .await
            .expect("timed out");
        assert!(seen >= 3);
        let _writer = handle.await.unwrap();
    }
}
