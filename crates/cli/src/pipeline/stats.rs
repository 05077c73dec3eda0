//! Run statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;

/// Statistics from one bridge run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Event counters at shutdown
    pub events: MetricsSnapshot,

    /// Events still in flight when the drain timeout expired
    pub abandoned: usize,

    /// Time spent in `Running`
    pub duration: Duration,
}

impl RunSummary {
    /// Persisted records per second
    pub fn write_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events.records_persisted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of received events that were dropped, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.events.decode_failures + self.events.persist_failures;
        let data_events = self.events.events_received.saturating_sub(self.events.heartbeats);
        if data_events > 0 {
            (dropped as f64 / data_events as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Bridge Statistics ===\n");
        println!("  Duration:          {:.2}s", self.duration.as_secs_f64());
        println!("  Events received:   {}", self.events.events_received);
        println!("  Heartbeats:        {}", self.events.heartbeats);
        println!("  Records persisted: {}", self.events.records_persisted);
        println!("  Decode failures:   {}", self.events.decode_failures);
        println!("  Persist failures:  {}", self.events.persist_failures);
        println!("  Drop rate:         {:.2}%", self.drop_rate());
        println!("  Write rate:        {:.2}/s", self.write_rate());
        if self.abandoned > 0 {
            println!("  Abandoned at shutdown: {}", self.abandoned);
        }
        println!();
    }
}
