//! Single-writer / multi-reader value stores
//!
//! A store is created as a `(StoreWriter, StoreReader)` pair. The writer is
//! not `Clone`, so exactly one owner (the lifecycle controller) can mutate
//! it. Readers are cheap clones; each can wait for the next change.
//!
//! Writes always replace the whole value. Dropping the writer disposes the
//! store and wakes every waiting reader with [`StoreClosed`].

use audit_model::{AuditResult, VendorRisk};
use std::sync::Arc;
use tokio::sync::watch;

/// The writer side was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("store disposed")]
pub struct StoreClosed;

/// Create an empty store
#[must_use]
pub fn store<T>() -> (StoreWriter<T>, StoreReader<T>) {
    let (tx, rx) = watch::channel(None);
    (StoreWriter { tx }, StoreReader { rx })
}

/// Exclusive write handle
#[derive(Debug)]
pub struct StoreWriter<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> StoreWriter<T> {
    /// Replace the stored value
    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.tx.send_replace(Some(Arc::clone(&value)));
        value
    }

    /// Reset to empty
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Current value
    #[must_use]
    pub fn value(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    /// New reader for this store
    #[must_use]
    pub fn reader(&self) -> StoreReader<T> {
        StoreReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Shared read handle
#[derive(Debug)]
pub struct StoreReader<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Clone for StoreReader<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> StoreReader<T> {
    /// Current value
    #[must_use]
    pub fn value(&self) -> Option<Arc<T>> {
        self.rx.borrow().clone()
    }

    /// Whether a value is present
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Independent subscription starting from the current value
    #[must_use]
    pub fn subscribe(&self) -> Self {
        let mut rx = self.rx.clone();
        rx.borrow_and_update();
        Self { rx }
    }

    /// Wait for the next write or clear, then return the new value
    ///
    /// # Errors
    /// `StoreClosed` once the writer is dropped.
    pub async fn changed(&mut self) -> Result<Option<Arc<T>>, StoreClosed> {
        self.rx.changed().await.map_err(|_| StoreClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Whether the writer has been dropped
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// Reader over the last successful audit result
pub type AuditResultStore = StoreReader<AuditResult>;

/// Reader over the last vendor risk profile
pub type VendorRiskStore = StoreReader<VendorRisk>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_value() {
        let (_writer, reader) = store::<u32>();
        assert!(!reader.has_value());
        assert!(reader.value().is_none());
    }

    #[test]
    fn set_replaces_wholesale() {
        let (writer, reader) = store::<Vec<u32>>();
        writer.set(vec![1, 2, 3]);
        writer.set(vec![9]);
        assert_eq!(*reader.value().unwrap(), vec![9]);
    }

    #[test]
    fn clear_resets_to_empty() {
        let (writer, reader) = store::<u32>();
        writer.set(7);
        writer.clear();
        assert!(!reader.has_value());
        assert!(writer.value().is_none());
    }

    #[test]
    fn readers_share_the_same_allocation() {
        let (writer, reader) = store::<String>();
        let stored = writer.set("x".to_string());
        let other = reader.clone();
        assert!(Arc::ptr_eq(&stored, &reader.value().unwrap()));
        assert!(Arc::ptr_eq(&stored, &other.value().unwrap()));
    }

    #[tokio::test]
    async fn subscriber_sees_change() {
        let (writer, reader) = store::<u32>();
        let mut sub = reader.subscribe();

        let task = tokio::spawn(async move { sub.changed().await });
        tokio::task::yield_now().await;
        writer.set(42);

        let seen = task.await.unwrap().unwrap();
        assert_eq!(seen.as_deref(), Some(&42));
    }

    #[tokio::test]
    async fn dropping_writer_disposes() {
        let (writer, reader) = store::<u32>();
        let mut sub = reader.subscribe();
        drop(writer);

        assert!(reader.is_disposed());
        assert_eq!(sub.changed().await, Err(StoreClosed));
    }
}
