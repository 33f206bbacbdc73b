//! Change feed that fans committed snapshots out to observable views.
//!
//! # Invariants
//! - The full-table view and every per-code view are updated under one lock,
//!   so a per-code view is never seeded from a snapshot older than the one
//!   it will next receive.
//! - Per-code channels with no remaining observers are pruned on every
//!   lookup and publish, so the registry only holds observed codes.

use super::observable::{publish_if_changed, Observable};
use crate::model::country::Country;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::watch;

pub(crate) struct ChangeFeed {
    all_tx: watch::Sender<Vec<Country>>,
    all_view: Observable<Vec<Country>>,
    by_code: Mutex<HashMap<String, watch::Sender<Option<Country>>>>,
}

impl ChangeFeed {
    pub(crate) fn new(initial: Vec<Country>) -> Self {
        let (all_tx, all_rx) = watch::channel(initial);
        Self {
            all_tx,
            all_view: Observable::new(all_rx),
            by_code: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn all(&self) -> Observable<Vec<Country>> {
        self.all_view.clone()
    }

    pub(crate) fn by_code(&self, code: &str) -> Observable<Option<Country>> {
        let mut by_code = self.by_code.lock();
        by_code.retain(|_, tx| tx.receiver_count() > 0);
        if let Some(tx) = by_code.get(code) {
            return Observable::new(tx.subscribe());
        }

        let current = self
            .all_tx
            .borrow()
            .iter()
            .find(|country| country.code == code)
            .cloned();
        let (tx, rx) = watch::channel(current);
        by_code.insert(code.to_string(), tx);
        Observable::new(rx)
    }

    /// Publishes a committed table snapshot to every live view.
    pub(crate) fn publish(&self, snapshot: Vec<Country>) {
        let mut by_code = self.by_code.lock();
        by_code.retain(|_, tx| tx.receiver_count() > 0);

        let index: HashMap<&str, &Country> = snapshot
            .iter()
            .map(|country| (country.code.as_str(), country))
            .collect();
        let mut notified = 0_usize;
        for (code, tx) in by_code.iter() {
            let next = index.get(code.as_str()).map(|country| (*country).clone());
            if publish_if_changed(tx, next) {
                notified += 1;
            }
        }

        let count = snapshot.len();
        let all_changed = publish_if_changed(&self.all_tx, snapshot);
        debug!(
            "event=feed_publish module=store status=ok rows={count} all_changed={all_changed} code_views={} code_views_notified={notified}",
            by_code.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::ChangeFeed;
    use crate::model::country::Country;

    fn canada(confirmed: u64) -> Country {
        Country::new("Canada", "CA", confirmed, 9_248)
    }

    #[test]
    fn code_view_is_seeded_from_current_snapshot() {
        let feed = ChangeFeed::new(vec![canada(142_866)]);
        assert_eq!(feed.by_code("CA").get(), Some(canada(142_866)));
        assert_eq!(feed.by_code("DK").get(), None);
    }

    #[test]
    fn publish_updates_code_views_and_full_view() {
        let feed = ChangeFeed::new(Vec::new());
        let view = feed.by_code("CA");
        feed.publish(vec![canada(1)]);
        assert_eq!(view.get(), Some(canada(1)));
        assert_eq!(feed.all().get(), vec![canada(1)]);

        feed.publish(Vec::new());
        assert_eq!(view.get(), None);
    }

    #[test]
    fn views_for_same_code_share_a_channel() {
        let feed = ChangeFeed::new(Vec::new());
        let first = feed.by_code("CA");
        let second = feed.by_code("CA");
        assert!(first.same_channel(&second));
    }

    #[test]
    fn unobserved_code_views_are_pruned() {
        let feed = ChangeFeed::new(Vec::new());
        drop(feed.by_code("CA"));
        feed.publish(vec![canada(1)]);
        assert!(feed.by_code.lock().is_empty());
    }

    #[test]
    fn dropped_lookups_do_not_accumulate_without_writes() {
        let feed = ChangeFeed::new(Vec::new());
        for index in 0..100 {
            drop(feed.by_code(&format!("C{index}")));
            assert!(feed.by_code.lock().len() <= 1);
        }

        let kept = feed.by_code("CA");
        drop(feed.by_code("DK"));
        let registry = feed.by_code.lock();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains_key("CA"));
        drop(registry);
        drop(kept);
    }
}
