//! Keyboard routing with scoped subscriptions.
//!
//! The terminal has a single keyboard focus shared by every viewer. Each
//! viewer subscribes through a [`KeySubscription`] guard; dropping the guard
//! deregisters the listener, so a torn-down viewer never keeps receiving keys.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::types::SpinKey;

type Listener = Rc<RefCell<dyn FnMut(SpinKey)>>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Clone, Default)]
pub struct KeyRouter {
    inner: Rc<RefCell<Listeners>>,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl FnMut(SpinKey) + 'static) -> KeySubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        let listener: Listener = Rc::new(RefCell::new(listener));
        inner.entries.push((id, listener));
        KeySubscription {
            router: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Deliver `key` to every listener. Returns how many were called.
    pub fn dispatch(&self, key: SpinKey) -> usize {
        // Snapshot first so listeners may subscribe or unsubscribe re-entrantly.
        let listeners: Vec<Listener> = self
            .inner
            .borrow()
            .entries
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in &listeners {
            if let Ok(mut f) = listener.try_borrow_mut() {
                (*f)(key);
            }
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Keeps a listener registered for as long as it is alive.
#[must_use = "dropping the subscription unregisters the listener"]
pub struct KeySubscription {
    router: Weak<RefCell<Listeners>>,
    id: u64,
}

impl Drop for KeySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.router.upgrade() {
            inner.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn dropping_subscription_unregisters() {
        let router = KeyRouter::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = router.subscribe(move |_| h.set(h.get() + 1));
        assert_eq!(router.dispatch(SpinKey::StepLeft), 1);
        drop(sub);
        assert_eq!(router.listener_count(), 0);
        assert_eq!(router.dispatch(SpinKey::StepLeft), 0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn subscription_outliving_router_is_harmless() {
        let router = KeyRouter::new();
        let sub = router.subscribe(|_| {});
        drop(router);
        drop(sub);
    }

    #[test]
    fn listener_may_unsubscribe_itself() {
        let router = KeyRouter::new();
        let slot: Rc<RefCell<Option<KeySubscription>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let sub = router.subscribe(move |_| {
            s.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(sub);
        router.dispatch(SpinKey::StepRight);
        assert_eq!(router.listener_count(), 0);
    }
}
