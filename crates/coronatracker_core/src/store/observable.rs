//! Push-updated value views.
//!
//! An [`Observable`] is a read handle over a `tokio::sync::watch` channel
//! owned by the store. Consumers either read the latest value with
//! [`Observable::get`] or await changes; they never re-query storage.

use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::watch;

/// Returned when the store that owns a view has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewClosed;

impl Display for ViewClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "observable view closed: owning store was dropped")
    }
}

impl Error for ViewClosed {}

/// Read handle over a value that the store republishes on every change.
///
/// Clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct Observable<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> Observable<T> {
    pub(crate) fn new(rx: watch::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Returns a copy of the latest published value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Returns a raw receiver for consumers that drive their own select loops.
    ///
    /// The current value is marked as seen, so the first `changed()` on the
    /// returned receiver waits for the next publication.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Waits for the next publication and returns the new value.
    pub async fn changed(&mut self) -> Result<T, ViewClosed> {
        self.rx.changed().await.map_err(|_| ViewClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Resolves with the first value (current included) matching `predicate`.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> Result<T, ViewClosed> {
        let value = self
            .rx
            .wait_for(|value| predicate(value))
            .await
            .map_err(|_| ViewClosed)?;
        Ok(value.clone())
    }

    /// Whether both handles observe the same underlying channel.
    pub fn same_channel(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }
}

/// Replaces the published value only when it differs, so observers are not
/// woken for no-op writes.
pub(crate) fn publish_if_changed<T: PartialEq>(tx: &watch::Sender<T>, next: T) -> bool {
    tx.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    })
}

#[cfg(test)]
mod tests {
    use super::{publish_if_changed, Observable};
    use tokio::sync::watch;

    #[test]
    fn get_reads_latest_value() {
        let (tx, rx) = watch::channel(1_u64);
        let view = Observable::new(rx);
        assert!(publish_if_changed(&tx, 2));
        assert_eq!(view.get(), 2);
    }

    #[test]
    fn equal_values_are_not_republished() {
        let (tx, rx) = watch::channel(vec!["CA".to_string()]);
        let view = Observable::new(rx);
        let subscriber = view.subscribe();
        assert!(!publish_if_changed(&tx, vec!["CA".to_string()]));
        assert!(!subscriber.has_changed().unwrap());
    }

    #[test]
    fn clones_share_one_channel() {
        let (_tx, rx) = watch::channel(0_u8);
        let view = Observable::new(rx);
        let (_other_tx, other_rx) = watch::channel(0_u8);
        assert!(view.same_channel(&view.clone()));
        assert!(!view.same_channel(&Observable::new(other_rx)));
    }
}
