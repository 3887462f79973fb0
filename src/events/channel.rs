use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;

use log::trace;
use uuid::Uuid;

use crate::model::GenerationEvent;

pub type Callback<T> = Rc<dyn Fn(&T)>;
pub type SubscriptionId = u64;

/// Events that belong to one generation run.
pub trait RunScoped {
    fn run_id(&self) -> Uuid;
}

impl RunScoped for GenerationEvent {
    fn run_id(&self) -> Uuid {
        GenerationEvent::run_id(self)
    }
}

/// Single-threaded fan-out. Listeners run in subscription order.
pub struct Channel<T: Debug> {
    listeners: Rc<RefCell<BTreeMap<SubscriptionId, Callback<T>>>>,
    next_id: Rc<Cell<SubscriptionId>>,
}

impl<T: Debug> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
            next_id: Rc::clone(&self.next_id),
        }
    }
}

/// Sending half of a [`Channel`].
pub struct EventEmitter<T: Debug> {
    channel: Channel<T>,
}

impl<T: Debug> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// Receiving half of a [`Channel`].
pub struct EventObserver<T: Debug> {
    channel: Channel<T>,
}

impl<T: Debug> Clone for EventObserver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T: Debug + 'static> Channel<T> {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventEmitter<T>, EventObserver<T>) {
        let channel = Channel {
            listeners: Rc::new(RefCell::new(BTreeMap::new())),
            next_id: Rc::new(Cell::new(0)),
        };
        (
            EventEmitter {
                channel: channel.clone(),
            },
            EventObserver { channel },
        )
    }

    fn subscribe(&self, callback: Callback<T>) -> SubscriptionId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, callback);
        id
    }

    fn emit(&self, event: &T) {
        // listeners may subscribe or unsubscribe while handling an event
        let listeners: Vec<Callback<T>> = self.listeners.borrow().values().cloned().collect();
        trace!(target: "events", "{:?} -> {} listener(s)", event, listeners.len());
        for listener in listeners {
            listener(event);
        }
    }
}

impl<T: Debug + 'static> EventEmitter<T> {
    pub fn emit(&self, event: &T) {
        self.channel.emit(event);
    }
}

impl<T: Debug + 'static> EventObserver<T> {
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.channel.subscribe(Rc::new(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.channel.listeners.borrow_mut().remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.channel.listeners.borrow().len()
    }
}

impl<T: Debug + RunScoped + 'static> EventObserver<T> {
    /// Like [`EventObserver::subscribe`], but only sees events of `run_id`.
    pub fn subscribe_run<F>(&self, run_id: Uuid, callback: F) -> SubscriptionId
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe(move |event: &T| {
            if event.run_id() == run_id {
                callback(event);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GenerationPhase;

    fn recorder(
        observer: &EventObserver<GenerationEvent>,
    ) -> (SubscriptionId, Rc<RefCell<Vec<GenerationEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let id = observer.subscribe(move |event: &GenerationEvent| sink.borrow_mut().push(event.clone()));
        (id, seen)
    }

    #[test]
    fn test_every_listener_sees_every_event() {
        let (emitter, observer) = Channel::new();
        let (_, first) = recorder(&observer);
        let (_, second) = recorder(&observer.clone());
        let run_id = Uuid::new_v4();

        emitter.clone().emit(&GenerationEvent::Started { run_id });
        emitter.emit(&GenerationEvent::Cancelled { run_id });

        assert_eq!(first.borrow().len(), 2);
        assert_eq!(*first.borrow(), *second.borrow());
        assert_eq!(observer.listener_count(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (emitter, observer) = Channel::new();
        let (id, seen) = recorder(&observer);
        let run_id = Uuid::new_v4();

        emitter.emit(&GenerationEvent::Started { run_id });
        assert!(observer.unsubscribe(id));
        assert!(!observer.unsubscribe(id));
        emitter.emit(&GenerationEvent::Cancelled { run_id });

        assert_eq!(*seen.borrow(), vec![GenerationEvent::Started { run_id }]);
    }

    #[test]
    fn test_subscribe_run_filters_other_runs() {
        let (emitter, observer) = Channel::new();
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        observer.subscribe_run(mine, move |_| counter.set(counter.get() + 1));

        emitter.emit(&GenerationEvent::Started { run_id: other });
        emitter.emit(&GenerationEvent::PhaseStarted {
            run_id: mine,
            phase: GenerationPhase::Obscure,
        });
        emitter.emit(&GenerationEvent::Yielded { run_id: mine, steps: 3 });

        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let (emitter, observer) = Channel::<GenerationEvent>::new();
        let own_id = Rc::new(Cell::new(None));
        let handle = observer.clone();
        let id_slot = own_id.clone();
        let id = observer.subscribe(move |_| {
            if let Some(id) = id_slot.get() {
                handle.unsubscribe(id);
            }
        });
        own_id.set(Some(id));

        emitter.emit(&GenerationEvent::Started {
            run_id: Uuid::new_v4(),
        });
        assert_eq!(observer.listener_count(), 0);
    }
}
