//! Per-source buffer listener set
//!
//! Each hardware source owns one `BufferStream`. Its producer thread calls
//! [`BufferStream::broadcast`] for every buffer; listeners are invoked inline
//! on that thread, so they must return quickly.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::block::NativeBuffer;

/// Receives every buffer produced by a source
pub trait BufferListener: Send + Sync {
    fn receive(&self, buffer: &NativeBuffer);
}

/// Handle returned by [`BufferStream::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry for one hardware source.
pub struct BufferStream {
    listeners: RwLock<Arc<[(ListenerId, Arc<dyn BufferListener>)]>>,
    next_id: AtomicU64,
}

impl BufferStream {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Arc::from(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn BufferListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.write();
        let mut next: Vec<_> = listeners.iter().cloned().collect();
        next.push((id, listener));
        *listeners = next.into();
        id
    }

    /// Returns false if `id` was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        if !listeners.iter().any(|(lid, _)| *lid == id) {
            return false;
        }
        let next: Vec<_> = listeners
            .iter()
            .filter(|(lid, _)| *lid != id)
            .cloned()
            .collect();
        *listeners = next.into();
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver `buffer` to every listener registered at call time
    pub fn broadcast(&self, buffer: &NativeBuffer) {
        let listeners = self.listeners.read().clone();
        for (_, listener) in listeners.iter() {
            listener.receive(buffer);
        }
    }
}

impl Default for BufferStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::block::NativeSamples;
    use std::sync::atomic::AtomicUsize;

    struct Counting(AtomicUsize);

    impl BufferListener for Counting {
        fn receive(&self, _buffer: &NativeBuffer) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_add_remove_listener() {
        let stream = BufferStream::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        let buffer = NativeBuffer::new(NativeSamples::Complex(Vec::new()), 0);

        let id = stream.add_listener(listener.clone());
        stream.broadcast(&buffer);
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);

        assert!(stream.remove_listener(id));
        assert!(!stream.remove_listener(id));
        stream.broadcast(&buffer);
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
        assert_eq!(stream.listener_count(), 0);
    }
}
