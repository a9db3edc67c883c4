//! Page scroll lock
//!
//! A `ScrollLock` holds the document's overflow at [`Overflow::Hidden`] for as
//! long as it lives. Holders are counted: the first acquisition saves the page
//! value, the last release puts it back, so overlapping locks never restore a
//! value captured while another lock was active.

use super::dom::{lock_document, Overflow, SharedDocument};
use tracing::debug;

/// Scoped scroll-lock guard; released on drop
#[derive(Debug)]
pub struct ScrollLock {
    document: SharedDocument,
}

impl ScrollLock {
    /// Lock page scrolling until the returned guard is dropped
    pub fn acquire(document: &SharedDocument) -> Self {
        let mut doc = lock_document(document);
        if doc.scroll_lock.holders == 0 {
            let previous = doc.overflow();
            doc.scroll_lock.saved = Some(previous);
            debug!(?previous, "Locking page scroll");
        }
        doc.scroll_lock.holders += 1;
        doc.set_overflow(Overflow::Hidden);
        drop(doc);

        Self {
            document: document.clone(),
        }
    }

    /// Number of live guards on this document
    pub fn holders(document: &SharedDocument) -> usize {
        lock_document(document).scroll_lock.holders
    }
}

impl Drop for ScrollLock {
    fn drop(&mut self) {
        let mut doc = lock_document(&self.document);
        doc.scroll_lock.holders = doc.scroll_lock.holders.saturating_sub(1);
        if doc.scroll_lock.holders == 0 {
            if let Some(previous) = doc.scroll_lock.saved.take() {
                debug!(?previous, "Restoring page scroll");
                doc.set_overflow(previous);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modal::dom::Document;

    fn document_with(overflow: Overflow) -> SharedDocument {
        let mut document = Document::new();
        document.set_overflow(overflow);
        document.shared()
    }

    fn overflow(document: &SharedDocument) -> Overflow {
        lock_document(document).overflow()
    }

    #[test]
    fn test_lock_and_restore() {
        for initial in [Overflow::Visible, Overflow::Auto, Overflow::Scroll, Overflow::Hidden] {
            let document = document_with(initial);
            {
                let _lock = ScrollLock::acquire(&document);
                assert_eq!(overflow(&document), Overflow::Hidden);
            }
            assert_eq!(overflow(&document), initial);
        }
    }

    #[test]
    fn test_overlapping_locks_restore_original_value() {
        let document = document_with(Overflow::Auto);

        let outer = ScrollLock::acquire(&document);
        let inner = ScrollLock::acquire(&document);
        assert_eq!(ScrollLock::holders(&document), 2);

        drop(outer);
        assert_eq!(overflow(&document), Overflow::Hidden);

        drop(inner);
        assert_eq!(overflow(&document), Overflow::Auto);
        assert_eq!(ScrollLock::holders(&document), 0);
    }

    #[test]
    fn test_released_on_unwind() {
        let document = document_with(Overflow::Scroll);
        let shared = document.clone();

        let result = std::panic::catch_unwind(move || {
            let _lock = ScrollLock::acquire(&shared);
            panic!("content blew up");
        });

        assert!(result.is_err());
        assert_eq!(overflow(&document), Overflow::Scroll);
    }
}
