//! Change notification for module registration and removal.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use command_registry_core::ModuleDescriptor;
use tracing::error;

/// Observer of module add/remove events.
///
/// Callbacks run after the registry has released its lock, on the thread
/// that performed the mutation. They may call back into the registry, but
/// by the time a callback runs the registry can already reflect later
/// changes than the event it describes. A panicking callback is logged and
/// does not stop delivery to the remaining listeners.
pub trait ChangeListener: Send + Sync {
    fn module_registered(&self, module: &ModuleDescriptor);

    fn module_unregistered(&self, module: &ModuleDescriptor);
}

/// A registry change, carrying the descriptor it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Registered(ModuleDescriptor),
    Unregistered(ModuleDescriptor),
}

impl ChangeEvent {
    pub fn module(&self) -> &ModuleDescriptor {
        match self {
            Self::Registered(module) | Self::Unregistered(module) => module,
        }
    }
}

/// Delivers every event to every listener, isolating panics per callback.
pub(crate) fn notify(listeners: &[Arc<dyn ChangeListener>], events: &[ChangeEvent]) {
    for event in events {
        for listener in listeners {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| match event {
                ChangeEvent::Registered(module) => listener.module_registered(module),
                ChangeEvent::Unregistered(module) => listener.module_unregistered(module),
            }));
            if delivered.is_err() {
                error!(
                    package = %event.module().package_id,
                    "Change listener panicked; continuing with remaining listeners"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counter(AtomicUsize);

    impl ChangeListener for Counter {
        fn module_registered(&self, _module: &ModuleDescriptor) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn module_unregistered(&self, _module: &ModuleDescriptor) {
            self.0.fetch_add(10, Ordering::SeqCst);
        }
    }

    struct Panicker;

    impl ChangeListener for Panicker {
        fn module_registered(&self, _module: &ModuleDescriptor) {
            panic!("listener failure");
        }

        fn module_unregistered(&self, _module: &ModuleDescriptor) {}
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let listeners: Vec<Arc<dyn ChangeListener>> = vec![Arc::new(Panicker), counter.clone()];
        let module = ModuleDescriptor::new("p", "P");

        notify(
            &listeners,
            &[
                ChangeEvent::Unregistered(module.clone()),
                ChangeEvent::Registered(module),
            ],
        );

        assert_eq!(counter.0.load(Ordering::SeqCst), 11);
    }
}
