//! server.rs
//! Periodic sender: one thread per frame kind.
//!
//! ```text
//! tick(data period) ──▶ Encoder::encode_data ──▶ Transport::send ─┐
//! tick(info period) ──▶ Encoder::encode_info ──▶ Transport::send ─┴─▶ group
//! ```
//!
//! Each thread `select!`s between its ticker and a shared stop channel.
//! Dropping the stop sender disconnects the channel and both loops exit after
//! finishing the frame in hand.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, select, tick, Receiver, Sender};
use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::encoder::Encoder;
use crate::fragment::FragmentError;
use crate::packet::PacketKind;
use crate::telemetry::{Stage, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::tracker::Tracker;
use crate::transport::{Transport, UdpMulticastTransport};
use crate::types::PsnError;

type SenderReport = (TelemetryCounters, TelemetryTimer);

pub struct Server {
    encoder: Arc<Encoder>,
    stop_tx: Option<Sender<()>>,
    workers: Vec<(&'static str, JoinHandle<SenderReport>)>,
}

impl Server {
    /// Validate `config`, open a multicast socket and start sending.
    pub fn bind(config: ServerConfig) -> Result<Self, PsnError> {
        config.validate()?;
        let transport = Arc::new(UdpMulticastTransport::sender(&config)?);
        Self::start(config, transport)
    }

    /// Start sending over any transport.
    pub fn start<T: Transport + 'static>(config: ServerConfig, transport: Arc<T>) -> Result<Self, PsnError> {
        config.validate()?;
        let encoder = Arc::new(Encoder::from_config(&config));
        let destination = config.destination();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let epoch = Instant::now();

        let mut workers = Vec::with_capacity(2);
        for (name, kind, period) in [
            ("psn-data", PacketKind::Data, config.data_period()),
            ("psn-info", PacketKind::Info, config.info_period()),
        ] {
            let ctx = SendLoop {
                kind,
                period,
                destination,
                epoch,
                encoder: Arc::clone(&encoder),
                transport: Arc::clone(&transport),
                stop_rx: stop_rx.clone(),
            };
            let handle = thread::Builder::new().name(name.into()).spawn(move || ctx.run())?;
            workers.push((name, handle));
        }

        info!(
            "[SERVER] '{}' sending to {destination} (data {} Hz, info {} Hz)",
            config.system_name, config.data_rate_hz, config.info_rate_hz
        );
        Ok(Self { encoder, stop_tx: Some(stop_tx), workers })
    }

    /// Replace the tracker set published from the next frame on.
    pub fn set_trackers(&self, trackers: Vec<Tracker>) -> Result<(), FragmentError> {
        self.encoder.set_trackers(trackers)
    }

    pub fn encoder(&self) -> &Arc<Encoder> {
        &self.encoder
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Stop both timers and join their threads. Nothing is sent after this
    /// returns. Calling it twice returns an empty report.
    pub fn stop(&mut self) -> Result<TelemetrySnapshot, PsnError> {
        drop(self.stop_tx.take());

        let mut counters = TelemetryCounters::default();
        let mut timer = TelemetryTimer::new();
        let mut panicked = None;
        for (name, handle) in self.workers.drain(..) {
            match handle.join() {
                Ok((c, t)) => {
                    counters.merge(&c);
                    timer.stage_times.merge(&t.stage_times);
                    if t.start_time < timer.start_time {
                        timer.start_time = t.start_time;
                    }
                }
                Err(_) => panicked = Some(name),
            }
        }
        if let Some(name) = panicked {
            return Err(PsnError::WorkerPanicked(name));
        }
        debug!("[SERVER] stopped after {} frames", counters.frames_sent);
        Ok(TelemetrySnapshot::from(&counters, &timer))
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!("[SERVER] stop on drop: {e}");
            }
        }
    }
}

struct SendLoop<T> {
    kind: PacketKind,
    period: Duration,
    destination: SocketAddr,
    epoch: Instant,
    encoder: Arc<Encoder>,
    transport: Arc<T>,
    stop_rx: Receiver<()>,
}

impl<T: Transport> SendLoop<T> {
    fn run(self) -> SenderReport {
        let mut counters = TelemetryCounters::default();
        let mut timer = TelemetryTimer::new();
        let ticker = tick(self.period);
        debug!("[SERVER] {} timer every {:?}", self.kind, self.period);

        loop {
            select! {
                recv(self.stop_rx) -> _ => break,
                recv(ticker) -> _ => self.send_frame(&mut counters, &mut timer),
            }
        }
        debug!("[SERVER] {} timer stopped", self.kind);
        (counters, timer)
    }

    fn send_frame(&self, counters: &mut TelemetryCounters, timer: &mut TelemetryTimer) {
        // microseconds since the server started
        let timestamp = u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX);
        let encoded = timer.time(Stage::Encode, || match self.kind {
            PacketKind::Info => self.encoder.encode_info(timestamp),
            _ => self.encoder.encode_data(timestamp),
        });
        let packets = match encoded {
            Ok(p) => p,
            Err(e) => {
                counters.send_failures += 1;
                warn!("[SERVER] {} frame not encoded: {e}", self.kind);
                return;
            }
        };

        let started = Instant::now();
        let mut bytes = 0;
        for packet in &packets {
            match self.transport.send(packet, self.destination) {
                Ok(n) => bytes += n,
                Err(e) => {
                    counters.send_failures += 1;
                    warn!("[SERVER] {} send to {} failed: {e}", self.kind, self.destination);
                    return;
                }
            }
        }
        timer.add_stage_time(Stage::Send, started.elapsed());
        counters.add_sent_frame(packets.len(), bytes);
    }
}
