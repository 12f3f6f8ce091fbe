use crate::core::constants::MAX_PENDING_EVENTS;
use crate::core::geo::LatLng;
use crate::prelude::HashMap;
use crate::tiles::provider::MapLayerKind;
use crate::ui::status::MapStatus;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::VecDeque;

/// Things a mounted map reports to its host
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Selection changed by the user on the map
    SelectionChanged { record_id: Option<String> },
    /// Tile failover moved to another provider
    ProviderSwitched {
        layer: MapLayerKind,
        from: String,
        to: String,
    },
    /// The last provider of a layer keeps failing
    ProvidersExhausted { layer: MapLayerKind },
    LayerChanged { layer: MapLayerKind },
    StatusChanged(MapStatus),
    ViewChanged { center: LatLng, zoom: f64 },
    LocationFound(LatLng),
    /// Records excluded by validation on the last refresh
    RecordsDropped { count: usize },
}

impl MapEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MapEvent::SelectionChanged { .. } => "selectionchanged",
            MapEvent::ProviderSwitched { .. } => "providerswitched",
            MapEvent::ProvidersExhausted { .. } => "providersexhausted",
            MapEvent::LayerChanged { .. } => "layerchanged",
            MapEvent::StatusChanged(_) => "statuschanged",
            MapEvent::ViewChanged { .. } => "viewchanged",
            MapEvent::LocationFound(_) => "locationfound",
            MapEvent::RecordsDropped { .. } => "recordsdropped",
        }
    }
}

/// Event callback type
pub type EventCallback = Box<dyn Fn(&MapEvent) + Send + Sync>;

/// Queues map events and fans them out to listeners and channel subscribers
#[derive(Default)]
pub struct EventManager {
    /// Event listeners by event kind, `"*"` receives everything
    listeners: HashMap<String, Vec<EventCallback>>,
    event_queue: VecDeque<MapEvent>,
    subscribers: Vec<Sender<MapEvent>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event listener
    pub fn on<F>(&mut self, event_kind: &str, callback: F)
    where
        F: Fn(&MapEvent) + Send + Sync + 'static,
    {
        self.listeners
            .entry(event_kind.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Channel receiving every processed event
    pub fn subscribe(&mut self) -> Receiver<MapEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Queues an event. A view change replaces a pending view change, and
    /// once [`MAX_PENDING_EVENTS`] are waiting the oldest is dropped.
    pub fn emit(&mut self, event: MapEvent) {
        if matches!(event, MapEvent::ViewChanged { .. }) {
            if let Some(last) = self.event_queue.back_mut() {
                if matches!(last, MapEvent::ViewChanged { .. }) {
                    *last = event;
                    return;
                }
            }
        }
        if self.event_queue.len() >= MAX_PENDING_EVENTS {
            if let Some(dropped) = self.event_queue.pop_front() {
                log::trace!("event queue full, dropping {}", dropped.kind());
            }
        }
        self.event_queue.push_back(event);
    }

    /// Dispatches all queued events and returns them
    pub fn process_events(&mut self) -> Vec<MapEvent> {
        let events: Vec<_> = self.event_queue.drain(..).collect();

        for event in &events {
            for kind in [event.kind(), "*"] {
                if let Some(callbacks) = self.listeners.get(kind) {
                    for callback in callbacks {
                        callback(event);
                    }
                }
            }
            // Dropped receivers unsubscribe
            self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }

        events
    }

    pub fn clear_events(&mut self) {
        self.event_queue.clear();
    }

    pub fn pending_events(&self) -> usize {
        self.event_queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_listeners_by_kind_and_wildcard() {
        let mut events = EventManager::new();
        let selections = Arc::new(AtomicUsize::new(0));
        let everything = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&selections);
        events.on("selectionchanged", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&everything);
        events.on("*", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        events.emit(MapEvent::SelectionChanged {
            record_id: Some("a".into()),
        });
        events.emit(MapEvent::LayerChanged {
            layer: MapLayerKind::Satellite,
        });
        assert_eq!(events.pending_events(), 2);

        let processed = events.process_events();
        assert_eq!(processed.len(), 2);
        assert_eq!(selections.load(Ordering::SeqCst), 1);
        assert_eq!(everything.load(Ordering::SeqCst), 2);
        assert_eq!(events.pending_events(), 0);
    }

    #[test]
    fn test_subscribers_receive_and_unsubscribe_on_drop() {
        let mut events = EventManager::new();
        let rx = events.subscribe();
        let dropped = events.subscribe();
        drop(dropped);

        events.emit(MapEvent::RecordsDropped { count: 3 });
        events.process_events();

        assert_eq!(rx.try_recv().unwrap(), MapEvent::RecordsDropped { count: 3 });
        assert_eq!(events.subscribers.len(), 1);
    }

    #[test]
    fn test_undrained_queue_stays_bounded() {
        let mut events = EventManager::new();
        for i in 0..1000 {
            events.emit(MapEvent::ViewChanged {
                center: LatLng::new(41.0, 19.0 + i as f64 * 0.001),
                zoom: 13.0,
            });
        }
        assert_eq!(events.pending_events(), 1);

        for count in 0..MAX_PENDING_EVENTS + 10 {
            events.emit(MapEvent::RecordsDropped { count });
        }
        assert_eq!(events.pending_events(), MAX_PENDING_EVENTS);

        let processed = events.process_events();
        assert_eq!(processed[0], MapEvent::RecordsDropped { count: 10 });
        assert_eq!(
            processed.last(),
            Some(&MapEvent::RecordsDropped {
                count: MAX_PENDING_EVENTS + 9
            })
        );
    }
}
