use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::{Error, Reservation};

/// Signature of a user-supplied diagnostics sink. Receives one formatted line per pool event.
pub type DiagnosticsSink = dyn Fn(&str) + Send + Sync;

const TARGET: &str = "slot_pool";

/// Emits pool events as `tracing` events and, if configured, as text lines to a user sink.
///
/// The sink is user code, so none of these methods may be called while the pool bookkeeping is
/// being accessed.
pub(crate) struct Diagnostics {
    sink: Option<Arc<DiagnosticsSink>>,
    item_type: &'static str,
}

impl Diagnostics {
    #[must_use]
    pub(crate) fn new<T>(sink: Option<Arc<DiagnosticsSink>>) -> Self {
        Self {
            sink,
            item_type: type_name::<T>(),
        }
    }

    fn emit(&self, message: impl FnOnce() -> String) {
        if let Some(sink) = &self.sink {
            sink(&message());
        }
    }

    pub(crate) fn pool_created(&self, capacity: usize, slot_size: usize, size_in_bytes: usize) {
        debug!(
            target: TARGET,
            item_type = self.item_type,
            capacity,
            slot_size,
            size_in_bytes,
            "pool created"
        );

        self.emit(|| {
            format!(
                "pool created: {capacity} slots of {slot_size} bytes ({size_in_bytes} bytes) for {}",
                self.item_type
            )
        });
    }

    pub(crate) fn slot_reserved(&self, reservation: Reservation) {
        match reservation {
            Reservation::Reused(index) => {
                trace!(target: TARGET, index, "reserved slot from free-list");
                self.emit(|| format!("slot {index} reserved (reused)"));
            }
            Reservation::Fresh(index) => {
                trace!(target: TARGET, index, "reserved never-used slot");
                self.emit(|| format!("slot {index} reserved (fresh)"));
            }
        }
    }

    pub(crate) fn object_constructed(&self, index: usize) {
        trace!(target: TARGET, index, "object constructed");
        self.emit(|| format!("slot {index} object constructed"));
    }

    pub(crate) fn construction_failed(&self, index: usize) {
        debug!(target: TARGET, index, "object construction failed, slot returned");
        self.emit(|| format!("slot {index} construction failed, slot returned"));
    }

    pub(crate) fn object_destroyed(&self, index: usize) {
        trace!(target: TARGET, index, "object destroyed");
        self.emit(|| format!("slot {index} object destroyed"));
    }

    pub(crate) fn slot_freed(&self, index: usize) {
        trace!(target: TARGET, index, "slot freed");
        self.emit(|| format!("slot {index} freed"));
    }

    pub(crate) fn error_reported(&self, error: &Error) {
        warn!(
            target: TARGET,
            item_type = self.item_type,
            code = error.code(),
            %error,
            "pool error"
        );

        self.emit(|| format!("error {}: {error}", error.code()));
    }

    pub(crate) fn pool_dropped(&self, used: usize, high_water: usize) {
        debug!(
            target: TARGET,
            item_type = self.item_type,
            used,
            high_water,
            "pool dropped"
        );

        self.emit(|| format!("pool dropped: {used} used, high-water mark {high_water}"));
    }
}

impl fmt::Debug for Diagnostics {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.as_ref().map(|_| ".."))
            .field("item_type", &self.item_type)
            .finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recording() -> (Diagnostics, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));

        let diagnostics = Diagnostics::new::<u64>(Some(Arc::new({
            let lines = Arc::clone(&lines);
            move |line: &str| lines.lock().unwrap().push(line.to_owned())
        })));

        (diagnostics, lines)
    }

    #[test]
    fn without_sink_nothing_is_formatted() {
        let diagnostics = Diagnostics::new::<u64>(None);

        // Must not panic or do anything observable.
        diagnostics.pool_created(4, 8, 32);
        diagnostics.slot_freed(0);
    }

    #[test]
    fn sink_receives_one_line_per_event() {
        let (diagnostics, lines) = recording();

        diagnostics.pool_created(4, 8, 32);
        diagnostics.slot_reserved(Reservation::Fresh(0));
        diagnostics.object_constructed(0);
        diagnostics.object_destroyed(0);
        diagnostics.slot_freed(0);
        diagnostics.slot_reserved(Reservation::Reused(0));
        diagnostics.construction_failed(0);
        diagnostics.error_reported(&Error::PoolExhausted { capacity: 4 });
        diagnostics.pool_dropped(0, 1);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 9);
        assert!(lines[0].contains("u64"), "{}", lines[0]);
        assert!(lines[1].contains("fresh"), "{}", lines[1]);
        assert!(lines[5].contains("reused"), "{}", lines[5]);
        assert!(lines[7].starts_with("error 1"), "{}", lines[7]);
    }
}
