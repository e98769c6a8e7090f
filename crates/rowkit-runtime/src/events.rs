#![forbid(unsafe_code)]

//! Event routing from row views back to handlers.
//!
//! Row views never hold a reference to the coordinator. Instead each view is
//! handed a [`RowEmitter`] (an [`EventSink`] bound to the row's identity) when
//! it is configured. Events queue in the sink and are dispatched by
//! `Coordinator::dispatch_events` once no cycle is in flight, against the
//! latest applied snapshot.
//!
//! Events are keyed by identity rather than index path so a row that moved
//! between emission and dispatch still reaches the right model.
//!
//! # Failure Modes
//!
//! - Event for an identity that is no longer displayed: dropped.
//! - No handler registered for the row's renderer: ignored.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use rowkit_core::Identity;

/// Something a row view reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowEvent<E> {
    /// The row was tapped or selected.
    Tap,
    /// A view-specific event.
    Custom(E),
}

/// A queued event and the row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent<E> {
    pub row: Identity,
    pub event: RowEvent<E>,
}

/// Shared queue of row events.
///
/// Clones share the same queue.
pub struct EventSink<E> {
    queue: Rc<RefCell<VecDeque<QueuedEvent<E>>>>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<E> Default for EventSink<E> {
    fn default() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}

impl<E> EventSink<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a tap on `row`.
    pub fn tap(&self, row: impl Into<Identity>) {
        self.push(row.into(), RowEvent::Tap);
    }

    /// Queue a custom event from `row`.
    pub fn emit(&self, row: impl Into<Identity>, event: E) {
        self.push(row.into(), RowEvent::Custom(event));
    }

    /// A sink handle bound to one row.
    #[must_use]
    pub fn for_row(&self, row: Identity) -> RowEmitter<E> {
        RowEmitter {
            sink: self.clone(),
            row,
        }
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<QueuedEvent<E>> {
        self.queue.borrow_mut().drain(..).collect()
    }

    fn push(&self, row: Identity, event: RowEvent<E>) {
        self.queue.borrow_mut().push_back(QueuedEvent { row, event });
    }
}

/// An [`EventSink`] handle bound to a single row identity.
///
/// This is what a row view keeps to report taps and custom events.
pub struct RowEmitter<E> {
    sink: EventSink<E>,
    row: Identity,
}

impl<E> Clone for RowEmitter<E> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            row: self.row.clone(),
        }
    }
}

impl<E> fmt::Debug for RowEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEmitter").field("row", &self.row).finish()
    }
}

impl<E> RowEmitter<E> {
    /// The row this emitter reports for.
    #[must_use]
    pub fn row(&self) -> &Identity {
        &self.row
    }

    pub fn tap(&self) {
        self.sink.push(self.row.clone(), RowEvent::Tap);
    }

    pub fn emit(&self, event: E) {
        self.sink.push(self.row.clone(), RowEvent::Custom(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_queue_in_order() {
        let sink: EventSink<&str> = EventSink::new();
        sink.tap("a");
        sink.emit("b", "liked");
        assert_eq!(sink.len(), 2);

        let events = sink.drain();
        assert!(sink.is_empty());
        assert_eq!(
            events,
            vec![
                QueuedEvent {
                    row: Identity::new("a"),
                    event: RowEvent::Tap,
                },
                QueuedEvent {
                    row: Identity::new("b"),
                    event: RowEvent::Custom("liked"),
                },
            ]
        );
    }

    #[test]
    fn emitter_shares_sink() {
        let sink: EventSink<u8> = EventSink::new();
        let emitter = sink.for_row(Identity::new("row-7"));
        emitter.clone().emit(3);
        emitter.tap();
        assert_eq!(emitter.row().as_str(), "row-7");

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.row.as_str() == "row-7"));
        assert_eq!(events[0].event, RowEvent::Custom(3));
    }
}
