//! client.rs
//! Background receiver wrapping a `Decoder`.
//!
//! The receive thread is the only owner of the decoder. Consumers see its
//! output two ways: notifications on a bounded channel, and the latest
//! tracker snapshot through a shared handle.
//!
//! `stop()` joins the thread, then drains and closes the channel, so no
//! notification is observable after it returns.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use log::{debug, info, warn};

use crate::config::ClientConfig;
use crate::decoder::Decoder;
use crate::reassembly::ReassemblyEvent;
use crate::store::TrackerMap;
use crate::telemetry::TelemetrySnapshot;
use crate::transport::{Transport, TransportError, UdpMulticastTransport};
use crate::types::PsnError;

#[derive(Debug, Default)]
struct Latest {
    trackers: Arc<TrackerMap>,
    system_name: Option<String>,
}

pub struct Client {
    events: Receiver<ReassemblyEvent>,
    latest: Arc<Mutex<Latest>>,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<Decoder>>,
    final_telemetry: Option<TelemetrySnapshot>,
}

impl Client {
    /// Validate `config`, join the multicast group and start receiving.
    pub fn bind(config: ClientConfig) -> Result<Self, PsnError> {
        config.validate()?;
        let transport = UdpMulticastTransport::receiver(&config)?;
        Self::start(config, transport)
    }

    /// Start receiving from any transport. The transport moves into the
    /// receive thread.
    pub fn start<T: Transport + 'static>(config: ClientConfig, transport: T) -> Result<Self, PsnError> {
        config.validate()?;
        let (event_tx, events) = bounded(config.event_capacity);
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let latest = Arc::new(Mutex::new(Latest::default()));

        let ctx = RecvLoop {
            transport,
            event_tx,
            stop_rx,
            latest: Arc::clone(&latest),
            buf: vec![0u8; config.max_datagram_len],
            backoff: config.recv_timeout(),
        };
        let worker = thread::Builder::new().name("psn-recv".into()).spawn(move || ctx.run())?;
        info!("[CLIENT] listening on {}:{}", config.multicast_group, config.port);

        Ok(Self { events, latest, stop_tx: Some(stop_tx), worker: Some(worker), final_telemetry: None })
    }

    /// Notifications in arrival order.
    pub fn events(&self) -> &Receiver<ReassemblyEvent> {
        &self.events
    }

    /// Tracker map as of the most recent completed frame.
    pub fn trackers(&self) -> Arc<TrackerMap> {
        Arc::clone(&self.latest.lock().unwrap_or_else(PoisonError::into_inner).trackers)
    }

    pub fn system_name(&self) -> Option<String> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).system_name.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop receiving and join the thread.
    ///
    /// # Returns
    /// Telemetry of the whole run. Later calls return the same snapshot.
    pub fn stop(&mut self) -> Result<TelemetrySnapshot, PsnError> {
        drop(self.stop_tx.take());
        if let Some(worker) = self.worker.take() {
            let decoder = worker.join().map_err(|_| PsnError::WorkerPanicked("psn-recv"))?;
            let dropped = self.events.try_iter().count();
            debug!("[CLIENT] stopped, {dropped} undelivered notifications discarded");
            self.final_telemetry = Some(decoder.telemetry());
        }
        match &self.final_telemetry {
            Some(t) => Ok(t.clone()),
            None => Err(PsnError::WorkerPanicked("psn-recv")),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!("[CLIENT] stop on drop: {e}");
            }
        }
    }
}

struct RecvLoop<T> {
    transport: T,
    event_tx: Sender<ReassemblyEvent>,
    stop_rx: Receiver<()>,
    latest: Arc<Mutex<Latest>>,
    buf: Vec<u8>,
    backoff: Duration,
}

impl<T: Transport> RecvLoop<T> {
    fn run(mut self) -> Decoder {
        let mut decoder = Decoder::new();
        loop {
            match self.stop_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }

            match self.transport.recv(&mut self.buf) {
                Ok(Some(n)) => {
                    let events = decoder.on_received(&self.buf[..n]);
                    self.publish(&mut decoder, events);
                }
                Ok(None) => {}
                Err(TransportError::Closed) => {
                    warn!("[CLIENT] transport closed");
                    break;
                }
                Err(e) => {
                    warn!("[CLIENT] receive failed: {e}");
                    // wait out the error, but wake up for stop
                    match self.stop_rx.recv_timeout(self.backoff) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }
                }
            }
        }
        debug!("[CLIENT] receive loop exiting");
        decoder
    }

    fn publish(&self, decoder: &mut Decoder, events: Vec<ReassemblyEvent>) {
        for event in events {
            if let ReassemblyEvent::Update { trackers, .. } = &event {
                let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
                latest.trackers = Arc::clone(trackers);
                latest.system_name = decoder.system_name().map(str::to_owned);
            }
            match self.event_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    decoder.record_dropped_event();
                    debug!("[CLIENT] notification channel full, dropping");
                }
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
    }
}
