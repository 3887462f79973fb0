mod channel;

pub use channel::{Channel, EventEmitter, EventObserver, RunScoped, SubscriptionId};
