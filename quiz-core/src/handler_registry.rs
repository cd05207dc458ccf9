use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Identifies one registered handler so it can be removed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Named-event subscription table.
///
/// Any number of handlers may be registered per event name; all of them are
/// invoked, in registration order.
pub struct HandlerRegistry<E> {
    handlers: HashMap<String, Vec<(HandlerId, Handler<E>)>>,
    next_id: u64,
}

impl<E> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn on<F>(&mut self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove one handler, or every handler for `event` when `id` is `None`.
    /// Returns how many were removed.
    pub fn off(&mut self, event: &str, id: Option<HandlerId>) -> usize {
        match id {
            Some(id) => {
                let Some(list) = self.handlers.get_mut(event) else {
                    return 0;
                };
                let before = list.len();
                list.retain(|(existing, _)| *existing != id);
                let removed = before - list.len();
                if list.is_empty() {
                    self.handlers.remove(event);
                }
                removed
            }
            None => self.handlers.remove(event).map(|l| l.len()).unwrap_or(0),
        }
    }

    /// Snapshot of the handlers for `event`, so callers can invoke them
    /// without holding whatever lock guards the registry.
    pub fn handlers_for(&self, event: &str) -> Vec<Handler<E>> {
        self.handlers
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub fn dispatch(&self, event_name: &str, event: &E) -> usize {
        let handlers = self.handlers_for(event_name);
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(Vec::len).unwrap_or(0)
    }

    pub fn total_handlers(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<E> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_multiple_handlers_all_invoked_in_order() {
        let mut registry: HandlerRegistry<u32> = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        registry.on("game:scores", move |v| first.lock().unwrap().push(("first", *v)));
        let second = seen.clone();
        registry.on("game:scores", move |v| second.lock().unwrap().push(("second", *v)));

        assert_eq!(registry.dispatch("game:scores", &7), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7)]
        );
    }

    #[test]
    fn test_off_with_id_removes_only_that_handler() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        let a = registry.on("room:updated", |_| {});
        let _b = registry.on("room:updated", |_| {});

        assert_eq!(registry.off("room:updated", Some(a)), 1);
        assert_eq!(registry.handler_count("room:updated"), 1);

        // Removing again is a no-op
        assert_eq!(registry.off("room:updated", Some(a)), 0);
    }

    #[test]
    fn test_off_without_id_removes_all_for_event() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        registry.on("notification:new", |_| {});
        registry.on("notification:new", |_| {});
        registry.on("room:updated", |_| {});

        assert_eq!(registry.off("notification:new", None), 2);
        assert_eq!(registry.handler_count("notification:new"), 0);
        assert_eq!(registry.handler_count("room:updated"), 1);
    }

    #[test]
    fn test_dispatch_unknown_event_and_clear() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        assert_eq!(registry.dispatch("nothing", &()), 0);

        registry.on("a", |_| {});
        registry.on("b", |_| {});
        assert_eq!(registry.total_handlers(), 2);

        registry.clear();
        assert_eq!(registry.total_handlers(), 0);
    }

    #[test]
    fn test_handler_ids_are_unique() {
        let mut registry: HandlerRegistry<()> = HandlerRegistry::new();
        let a = registry.on("x", |_| {});
        let b = registry.on("y", |_| {});
        assert_ne!(a, b);
    }

    #[test]
    fn test_default_registry_is_empty() {
        let mut registry: HandlerRegistry<u32> = HandlerRegistry::default();
        assert_eq!(registry.total_handlers(), 0);
        assert_eq!(registry.dispatch("x", &1), 0);

        let id = registry.on("x", |_| {});
        assert_eq!(registry.off("x", Some(id)), 1);
    }
}
