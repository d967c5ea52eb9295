use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

struct StationSlot<L> {
    producers: usize,
    listener: Option<L>,
}

/// Per-station producer refcount owning one listener per station.
///
/// The first registration on a station starts its listener and the last
/// unregistration stops it. Both run under the station's lock, so concurrent
/// callers on the same station serialize while other stations proceed.
pub struct ProducerStationRegistry<L> {
    stations: DashMap<String, Arc<Mutex<StationSlot<L>>>>,
}

impl<L> ProducerStationRegistry<L> {
    pub fn new() -> Self {
        Self {
            stations: DashMap::new(),
        }
    }

    fn slot(&self, station: &str) -> Arc<Mutex<StationSlot<L>>> {
        let entry = self.stations.entry(station.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(StationSlot {
                producers: 0,
                listener: None,
            }))
        });
        Arc::clone(entry.value())
    }

    /// Count a new producer on `station`.
    ///
    /// For the first producer `start` runs and its listener is kept. If
    /// `start` fails the count stays at zero and the error is returned.
    /// Returns whether this was the first producer.
    pub async fn register_producer<F, Fut, E>(&self, station: &str, start: F) -> Result<bool, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<L, E>>,
    {
        let slot = self.slot(station);
        let mut guard = slot.lock().await;
        if guard.producers > 0 {
            guard.producers += 1;
            return Ok(false);
        }

        match start().await {
            Ok(listener) => {
                guard.listener = Some(listener);
                guard.producers = 1;
                Ok(true)
            }
            Err(err) => {
                drop(guard);
                drop(slot);
                self.prune(station);
                Err(err)
            }
        }
    }

    /// Drop a producer from `station`.
    ///
    /// When the count reaches zero the listener is handed to `stop`, which
    /// completes before any new registration on the station can proceed.
    /// Returns whether this was the last producer. Unknown stations are a
    /// no-op.
    pub async fn unregister_producer<F, Fut>(&self, station: &str, stop: F) -> bool
    where
        F: FnOnce(L) -> Fut,
        Fut: Future<Output = ()>,
    {
        let Some(slot) = self
            .stations
            .get(station)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return false;
        };

        let mut guard = slot.lock().await;
        if guard.producers == 0 {
            drop(guard);
            drop(slot);
            self.prune(station);
            return false;
        }

        guard.producers -= 1;
        if guard.producers > 0 {
            return false;
        }

        if let Some(listener) = guard.listener.take() {
            stop(listener).await;
        }
        drop(guard);
        drop(slot);
        self.prune(station);
        true
    }

    // Only idle slots nobody else holds are removed.
    fn prune(&self, station: &str) {
        self.stations.remove_if(station, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .map(|slot| slot.producers == 0)
                    .unwrap_or(false)
        });
    }

    /// Live producers on `station`.
    pub async fn producer_count(&self, station: &str) -> usize {
        let Some(slot) = self
            .stations
            .get(station)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return 0;
        };
        let guard = slot.lock().await;
        guard.producers
    }

    /// Run `f` against the station's listener, if one is running.
    pub async fn with_listener<R>(&self, station: &str, f: impl FnOnce(&L) -> R) -> Option<R> {
        let slot = self
            .stations
            .get(station)
            .map(|entry| Arc::clone(entry.value()))?;
        let guard = slot.lock().await;
        guard.listener.as_ref().map(f)
    }

    /// Stations with at least one slot, sorted.
    pub fn stations(&self) -> Vec<String> {
        let mut stations: Vec<String> = self.stations.iter().map(|e| e.key().clone()).collect();
        stations.sort_unstable();
        stations
    }

    /// Reset every station and hand back the running listeners.
    pub async fn clear(&self) -> Vec<L> {
        let slots: Vec<Arc<Mutex<StationSlot<L>>>> = self
            .stations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut listeners = Vec::with_capacity(slots.len());
        for slot in slots {
            let mut guard = slot.lock().await;
            guard.producers = 0;
            listeners.extend(guard.listener.take());
        }
        self.stations.clear();
        listeners
    }
}

impl<L> Default for ProducerStationRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}
