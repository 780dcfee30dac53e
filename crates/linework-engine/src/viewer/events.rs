use core::fmt;
use core::str::FromStr;

use crate::coords::Vec2;
use crate::input::MouseButton;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Pointer position reported with `pointerdown`/`pointerup`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerEvent {
    pub button: MouseButton,
    /// Canvas pixels, origin top-left.
    pub canvas: Vec2,
    /// Scene units, relative to the document origin.
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Loaded,
    Cleared,
    Destroyed,
    Resized { width: u32, height: u32 },
    PointerDown(PointerEvent),
    PointerUp(PointerEvent),
    ViewChanged,
    Message { text: String, level: MessageLevel },
}

impl ViewerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Loaded => EventKind::Loaded,
            Self::Cleared => EventKind::Cleared,
            Self::Destroyed => EventKind::Destroyed,
            Self::Resized { .. } => EventKind::Resized,
            Self::PointerDown(_) => EventKind::PointerDown,
            Self::PointerUp(_) => EventKind::PointerUp,
            Self::ViewChanged => EventKind::ViewChanged,
            Self::Message { .. } => EventKind::Message,
        }
    }
}

/// Subscription topic. Parses from the event names used by hosts
/// (`"loaded"`, `"pointerdown"`, `"viewChanged"`, ...).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventKind {
    Loaded,
    Cleared,
    Destroyed,
    Resized,
    PointerDown,
    PointerUp,
    ViewChanged,
    Message,
}

impl EventKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Cleared => "cleared",
            Self::Destroyed => "destroyed",
            Self::Resized => "resized",
            Self::PointerDown => "pointerdown",
            Self::PointerUp => "pointerup",
            Self::ViewChanged => "viewChanged",
            Self::Message => "message",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnknownEvent(pub String);

impl fmt::Display for UnknownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown viewer event: {}", self.0)
    }
}

impl std::error::Error for UnknownEvent {}

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "loaded" => Self::Loaded,
            "cleared" => Self::Cleared,
            "destroyed" => Self::Destroyed,
            "resized" => Self::Resized,
            "pointerdown" => Self::PointerDown,
            "pointerup" => Self::PointerUp,
            "viewChanged" => Self::ViewChanged,
            "message" => Self::Message,
            other => return Err(UnknownEvent(other.to_owned())),
        })
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&ViewerEvent)>;

/// Callback registry owned by one viewer. Dispatch is synchronous and in
/// subscription order.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: u64,
    handlers: Vec<(EventKind, SubscriptionId, Handler)>,
}

impl EventBus {
    pub(crate) fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&ViewerEvent) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((kind, id, Box::new(handler)));
        id
    }

    /// Returns false if no such subscription exists for `kind`.
    pub(crate) fn unsubscribe(&mut self, kind: EventKind, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(k, i, _)| !(*k == kind && *i == id));
        self.handlers.len() != before
    }

    pub(crate) fn emit(&mut self, event: ViewerEvent) {
        let kind = event.kind();
        log::trace!("event {}", kind.name());
        for (k, _, handler) in self.handlers.iter_mut() {
            if *k == kind {
                handler(&event);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn event_names_round_trip() {
        for kind in [
            EventKind::Loaded,
            EventKind::Cleared,
            EventKind::Destroyed,
            EventKind::Resized,
            EventKind::PointerDown,
            EventKind::PointerUp,
            EventKind::ViewChanged,
            EventKind::Message,
        ] {
            assert_eq!(kind.name().parse::<EventKind>(), Ok(kind));
        }
        assert!("viewchanged".parse::<EventKind>().is_err());
    }

    #[test]
    fn emit_reaches_only_matching_handlers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::default();

        let s = seen.clone();
        bus.subscribe(EventKind::Loaded, move |e| s.borrow_mut().push(e.clone()));
        let s = seen.clone();
        bus.subscribe(EventKind::Cleared, move |e| s.borrow_mut().push(e.clone()));

        bus.emit(ViewerEvent::Loaded);
        bus.emit(ViewerEvent::ViewChanged);
        assert_eq!(*seen.borrow(), vec![ViewerEvent::Loaded]);
    }

    #[test]
    fn unsubscribe_needs_matching_kind() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::default();
        let c = count.clone();
        let id = bus.subscribe(EventKind::Loaded, move |_| *c.borrow_mut() += 1);

        assert!(!bus.unsubscribe(EventKind::Cleared, id));
        bus.emit(ViewerEvent::Loaded);
        assert!(bus.unsubscribe(EventKind::Loaded, id));
        bus.emit(ViewerEvent::Loaded);
        assert_eq!(*count.borrow(), 1);
    }
}
