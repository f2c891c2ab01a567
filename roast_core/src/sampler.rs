//! Background probe sampling.
//!
//! Spawns a thread that owns the `TemperatureProbe`, publishes whole
//! `SensorSnapshot` values over a bounded channel, and tracks the last-ok
//! timestamp for stall detection. The consumer only ever sees complete
//! snapshots, so there are no torn multi-field reads.
//!
//! Each `Sampler` spawns exactly one thread that is shut down and joined when
//! the `Sampler` is dropped.
use crossbeam_channel as xch;
use roast_traits::TemperatureProbe;
use roast_traits::clock::Clock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Result, RoastError};
use crate::hw_error::map_probe_error;

/// One probe reading as published by the sampler thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub raw_value: f64,
    pub is_valid: bool,
    /// Seconds since the sampler epoch at which the reading was taken.
    pub last_update_s: f64,
    pub source_label: &'static str,
}

impl SensorSnapshot {
    /// The same reading with its timestamp shifted into a later time base.
    pub fn rebased(self, origin_s: f64) -> Self {
        Self {
            last_update_s: self.last_update_s - origin_s,
            ..self
        }
    }
}

const CHANNEL_CAPACITY: usize = 4;

pub struct Sampler {
    rx: xch::Receiver<SensorSnapshot>,
    cached: Option<SensorSnapshot>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn<P, C>(mut probe: P, hz: f64, timeout: Duration, clock: C) -> Result<Self>
    where
        P: TemperatureProbe + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded(CHANNEL_CAPACITY);
        // Producer-side handle used to evict the oldest snapshot when the consumer lags.
        let evict = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let period = Duration::from_micros(crate::util::period_us(hz));
        let epoch = clock.now();
        let label = probe.label();

        let join_handle = std::thread::Builder::new()
            .name("roast-sampler".into())
            .spawn(move || {
                loop {
                    if shutdown_clone.load(Ordering::Relaxed) {
                        tracing::debug!("sampler thread received shutdown signal");
                        break;
                    }

                    let snap = match probe.read(timeout) {
                        Ok(v) => {
                            last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                            SensorSnapshot {
                                raw_value: v,
                                is_valid: true,
                                last_update_s: clock.secs_since(epoch),
                                source_label: label,
                            }
                        }
                        Err(e) => {
                            let err = map_probe_error(e.as_ref());
                            tracing::debug!(error = %err, "probe read failed");
                            SensorSnapshot {
                                raw_value: f64::NAN,
                                is_valid: false,
                                last_update_s: clock.secs_since(epoch),
                                source_label: label,
                            }
                        }
                    };

                    match tx.try_send(snap) {
                        Ok(()) => {}
                        Err(xch::TrySendError::Full(snap)) => {
                            let _ = evict.try_recv();
                            let _ = tx.try_send(snap);
                        }
                        Err(xch::TrySendError::Disconnected(_)) => {
                            tracing::debug!("sampler consumer disconnected, exiting thread");
                            break;
                        }
                    }

                    // Check shutdown before sleep to avoid unnecessary delay
                    if shutdown_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    clock.sleep(period);
                }
                tracing::trace!("sampler thread exiting cleanly");
            })
            .map_err(|e| RoastError::Io(format!("spawn sampler thread: {e}")))?;

        Ok(Self {
            rx,
            cached: None,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Newest snapshot published so far (drains the channel, caches the result).
    pub fn latest(&mut self) -> Option<SensorSnapshot> {
        if let Some(s) = self.rx.try_iter().last() {
            self.cached = Some(s);
        }
        self.cached
    }

    /// Instant the snapshot timestamps are measured from.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Milliseconds since the last successful read, given `now_ms` since the epoch.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, or after the current probe.read()
        // returns (bounded by the read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("sampler thread joined successfully");
                }
                Err(e) => {
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}
