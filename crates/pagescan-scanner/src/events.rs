//! Capture events and lifetime-scoped observers.

use std::cell::Cell;
use std::rc::Rc;

use pagescan_texture::TextureHandle;
use serde::{Deserialize, Serialize};

use crate::coordinator::ScanCoordinator;
use pagescan_core::MathProvider;

/// A target's cache slot was overwritten with a new rectified capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureEvent {
    pub target_name: String,
    pub texture: TextureHandle,
    pub score: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(&CaptureEvent)>;

/// Observer list owned by the coordinator.
///
/// Subscribers are called in subscription order on the tick that produced
/// the capture. Unsubscribe with the id returned by `subscribe`.
#[derive(Default)]
pub struct CaptureObservers {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Callback)>,
}

impl std::fmt::Debug for CaptureObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureObservers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl CaptureObservers {
    pub fn subscribe(&mut self, callback: impl FnMut(&CaptureEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &CaptureEvent) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

/// Keeps the newest captured texture for one target.
///
/// Binding seeds the handle from [`ScanCoordinator::captured_texture`] so a
/// consumer created after the first capture still picks it up. Call
/// [`PaintBinding::unbind`] when the consumer goes away.
#[derive(Debug)]
pub struct PaintBinding {
    target: String,
    texture: Rc<Cell<Option<TextureHandle>>>,
    updates: Rc<Cell<usize>>,
    subscription: Option<SubscriptionId>,
}

impl PaintBinding {
    pub fn bind<M: MathProvider>(scanner: &mut ScanCoordinator<M>, target: &str) -> Self {
        let texture = Rc::new(Cell::new(scanner.captured_texture(target)));
        let updates = Rc::new(Cell::new(0));
        let name = target.to_owned();
        let (slot, count) = (Rc::clone(&texture), Rc::clone(&updates));
        let subscription = scanner.subscribe(move |event| {
            if event.target_name == name {
                slot.set(Some(event.texture));
                count.set(count.get() + 1);
            }
        });
        Self {
            target: target.to_owned(),
            texture,
            updates,
            subscription: Some(subscription),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture.get()
    }

    /// Capture events received since binding.
    pub fn updates(&self) -> usize {
        self.updates.get()
    }

    pub fn is_bound(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn unbind<M: MathProvider>(&mut self, scanner: &mut ScanCoordinator<M>) {
        if let Some(id) = self.subscription.take() {
            scanner.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, id: u32) -> CaptureEvent {
        CaptureEvent {
            target_name: name.to_owned(),
            texture: TextureHandle(id),
            score: 0.5,
        }
    }

    #[test]
    fn unsubscribed_observer_stops_receiving() {
        let seen = Rc::new(Cell::new(0));
        let mut observers = CaptureObservers::default();
        let s = Rc::clone(&seen);
        let id = observers.subscribe(move |_| s.set(s.get() + 1));
        observers.emit(&event("A", 1));
        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.emit(&event("A", 1));
        assert_eq!(seen.get(), 1);
        assert!(observers.is_empty());
    }
}
