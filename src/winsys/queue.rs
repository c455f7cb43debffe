use crate::event::Event;
use crate::event::EventFlags;
use crate::win32::message::NativeMessage;
use crate::window::Window;

use std::cell::Cell;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub type FilterId = u32;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterReturn {
    Continue,
    Translate(Event),
    Remove,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum FilterScope {
    Global,
    Window(Window),
    Message(u32),
}

type FilterFn = Box<dyn FnMut(&NativeMessage) -> FilterReturn>;

struct FilterEntry {
    id: FilterId,
    scope: FilterScope,
    func: RefCell<FilterFn>,
    ref_count: Cell<u32>,
    removed: Cell<bool>,
}

#[derive(Debug, Clone)]
struct QueuedEvent {
    seq: u64,
    event: Event,
}

pub struct EventQueue {
    events: VecDeque<QueuedEvent>,
    next_seq: u64,
    paused: u32,
    filters: Vec<Rc<FilterEntry>>,
    next_filter: FilterId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::new(),
            next_seq: 0,
            paused: 0,
            filters: Vec::new(),
            next_filter: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The sequence number the next queued event will receive.
    pub fn mark(&self) -> u64 {
        self.next_seq
    }

    pub fn push(
        &mut self,
        event: Event,
    ) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push_back(QueuedEvent {
            seq,
            event,
        });

        seq
    }

    /// Queues `event` so it stays invisible to dispatch until its batch
    /// is released.
    pub fn push_pending(
        &mut self,
        event: Event,
    ) -> u64 {
        self.push(event.with_flags(EventFlags::PENDING))
    }

    /// Releases every pending event queued since `mark`.
    pub fn release_pending(
        &mut self,
        mark: u64,
    ) {
        self.events
            .iter_mut()
            .filter(|queued| queued.seq >= mark)
            .for_each(|queued| queued.event.flags.remove(EventFlags::PENDING));
    }

    /// The oldest event that is not pending, left in place.
    pub fn find_first(&self) -> Option<&Event> {
        self.events
            .iter()
            .find(|queued| !queued.event.is_pending())
            .map(|queued| &queued.event)
    }

    /// Removes and returns the oldest event that is not pending.
    pub fn unqueue(&mut self) -> Option<Event> {
        if self.is_paused() {
            return None;
        }

        let index = self
            .events
            .iter()
            .position(|queued| !queued.event.is_pending())?;

        self.events.remove(index).map(|queued| queued.event)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|queued| &queued.event)
    }

    pub fn retain<F>(
        &mut self,
        mut keep: F,
    ) where
        F: FnMut(&Event) -> bool,
    {
        self.events.retain(|queued| keep(&queued.event));
    }

    pub fn pause(&mut self) {
        self.paused += 1;
    }

    pub fn unpause(&mut self) {
        if self.paused == 0 {
            warn!("unbalanced event queue unpause");
            return;
        }

        self.paused -= 1;
    }

    pub fn is_paused(&self) -> bool {
        self.paused > 0
    }

    pub fn add_filter<F>(
        &mut self,
        scope: FilterScope,
        func: F,
    ) -> FilterId
    where
        F: FnMut(&NativeMessage) -> FilterReturn + 'static,
    {
        let id = self.next_filter;
        self.next_filter += 1;

        self.filters.push(Rc::new(FilterEntry {
            id,
            scope,
            func: RefCell::new(Box::new(func)),
            ref_count: Cell::new(0),
            removed: Cell::new(false),
        }));

        id
    }

    /// A filter that is running is only flagged, and dropped once it returns.
    pub fn remove_filter(
        &mut self,
        id: FilterId,
    ) {
        if let Some(entry) = self.filters.iter().find(|entry| entry.id == id) {
            entry.removed.set(true);
        }

        self.filters
            .retain(|entry| !(entry.removed.get() && entry.ref_count.get() == 0));
    }

    pub fn remove_window_filters(
        &mut self,
        window: Window,
    ) {
        let ids: Vec<FilterId> = self
            .filters
            .iter()
            .filter(|entry| entry.scope == FilterScope::Window(window))
            .map(|entry| entry.id)
            .collect();

        ids.into_iter().for_each(|id| self.remove_filter(id));
    }

    pub fn filter_count(&self) -> usize {
        self.filters.iter().filter(|entry| !entry.removed.get()).count()
    }

    /// Runs the global filters, then those of `window`, then those
    /// registered for the message id, stopping at the first verdict.
    pub fn apply_filters(
        &mut self,
        msg: &NativeMessage,
        window: Option<Window>,
    ) -> FilterReturn {
        let scopes = [
            Some(FilterScope::Global),
            window.map(FilterScope::Window),
            Some(FilterScope::Message(msg.message)),
        ];

        let mut verdict = FilterReturn::Continue;

        'scopes: for scope in scopes.iter().flatten() {
            let entries: Vec<Rc<FilterEntry>> = self
                .filters
                .iter()
                .filter(|entry| entry.scope == *scope)
                .cloned()
                .collect();

            for entry in entries {
                if entry.removed.get() {
                    continue;
                }

                entry.ref_count.set(entry.ref_count.get() + 1);
                let result = match entry.func.try_borrow_mut() {
                    Ok(mut func) => (&mut *func)(msg),
                    Err(_) => FilterReturn::Continue,
                };
                entry.ref_count.set(entry.ref_count.get() - 1);

                if result != FilterReturn::Continue {
                    verdict = result;
                    break 'scopes;
                }
            }
        }

        self.filters
            .retain(|entry| !(entry.removed.get() && entry.ref_count.get() == 0));

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::EventKind;
    use crate::win32::message::WM_KEYDOWN;
    use crate::win32::message::WM_MOUSEMOVE;

    fn event(window: Window) -> Event {
        Event::new(EventKind::Map, Some(window))
    }

    #[test]
    fn pending_events_are_skipped_until_released() {
        let mut queue = EventQueue::new();

        let mark = queue.mark();
        queue.push_pending(event(1));
        queue.push(event(2));

        assert_eq!(queue.find_first().and_then(|e| e.window), Some(2));
        assert_eq!(queue.unqueue().and_then(|e| e.window), Some(2));
        assert!(queue.unqueue().is_none());

        queue.release_pending(mark);
        assert_eq!(queue.unqueue().and_then(|e| e.window), Some(1));
    }

    #[test]
    fn paused_queue_dispatches_nothing_but_keeps_events() {
        let mut queue = EventQueue::new();

        queue.pause();
        queue.push(event(1));
        assert!(queue.unqueue().is_none());
        assert_eq!(queue.len(), 1);

        queue.unpause();
        assert!(queue.unqueue().is_some());
    }

    #[test]
    fn filters_run_global_then_window_then_message() {
        let mut queue = EventQueue::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for (scope, name) in vec![
            (FilterScope::Message(WM_KEYDOWN), "message"),
            (FilterScope::Window(4), "window"),
            (FilterScope::Global, "global"),
        ] {
            let order = order.clone();
            queue.add_filter(scope, move |_| {
                order.borrow_mut().push(name);
                FilterReturn::Continue
            });
        }

        let msg = NativeMessage::new(1, WM_KEYDOWN, 0, 0);
        assert_eq!(queue.apply_filters(&msg, Some(4)), FilterReturn::Continue);
        assert_eq!(*order.borrow(), vec!["global", "window", "message"]);
    }

    #[test]
    fn first_verdict_wins() {
        let mut queue = EventQueue::new();

        queue.add_filter(FilterScope::Global, |msg| {
            if msg.message == WM_MOUSEMOVE {
                FilterReturn::Remove
            } else {
                FilterReturn::Continue
            }
        });
        queue.add_filter(FilterScope::Global, |_| FilterReturn::Translate(Event::new(EventKind::Nothing, None)));

        let motion = NativeMessage::new(1, WM_MOUSEMOVE, 0, 0);
        let key = NativeMessage::new(1, WM_KEYDOWN, 0, 0);

        assert_eq!(queue.apply_filters(&motion, None), FilterReturn::Remove);
        assert_eq!(
            queue.apply_filters(&key, None),
            FilterReturn::Translate(Event::new(EventKind::Nothing, None))
        );
    }

    #[test]
    fn removed_filters_stop_running() {
        let mut queue = EventQueue::new();
        let id = queue.add_filter(FilterScope::Global, |_| FilterReturn::Remove);

        queue.remove_filter(id);

        let msg = NativeMessage::new(1, WM_KEYDOWN, 0, 0);
        assert_eq!(queue.apply_filters(&msg, None), FilterReturn::Continue);
        assert_eq!(queue.filter_count(), 0);
    }
}
