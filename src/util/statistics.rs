use std::sync::atomic::{AtomicUsize, Ordering};

use enum_map::EnumMap;

use crate::plan::StoreValMode;

/// Counters of barrier events.
///
/// The counters are relaxed and only approximate while mutators are running.  Barriers only
/// count when the `barrier_stats` option is set.
#[derive(Default)]
pub struct BarrierStats {
    enabled: bool,
    pub evacuations_won: Counter,
    pub evacuations_lost: Counter,
    pub evacuations_failed: Counter,
    pub spurious_cas_retries: Counter,
    pub satb_enqueued: Counter,
    pub connections_recorded: Counter,
    pub arraycopy_fast: Counter,
    pub arraycopy_slow: EnumMap<StoreValMode, Counter>,
}

/// A relaxed event counter.
#[derive(Default)]
pub struct Counter(AtomicUsize);

impl Counter {
    #[inline(always)]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

impl BarrierStats {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    #[inline(always)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count an event if statistics are enabled.
    #[inline(always)]
    pub fn count(&self, counter: &Counter) {
        if self.enabled {
            counter.inc();
        }
    }

    fn counters(&self) -> impl Iterator<Item = &Counter> {
        [
            &self.evacuations_won,
            &self.evacuations_lost,
            &self.evacuations_failed,
            &self.spurious_cas_retries,
            &self.satb_enqueued,
            &self.connections_recorded,
            &self.arraycopy_fast,
        ]
        .into_iter()
        .chain(self.arraycopy_slow.values())
    }

    pub fn reset(&self) {
        self.counters().for_each(Counter::reset);
    }

    /// Log a summary of the counters.
    pub fn report(&self) {
        if !self.enabled {
            return;
        }
        info!(
            "evacuation: won={} lost={} failed={}",
            self.evacuations_won.get(),
            self.evacuations_lost.get(),
            self.evacuations_failed.get()
        );
        info!(
            "satb enqueued={} connections recorded={} spurious cas retries={}",
            self.satb_enqueued.get(),
            self.connections_recorded.get(),
            self.spurious_cas_retries.get()
        );
        let slow = self
            .arraycopy_slow
            .iter()
            .map(|(mode, counter)| format!("{:?}={}", mode, counter.get()))
            .collect::<Vec<_>>()
            .join(" ");
        info!(
            "arraycopy: fast={} slow: {}",
            self.arraycopy_fast.get(),
            slow
        );
    }
}
