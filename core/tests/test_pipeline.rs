// Server → loopback → client, end to end with real threads.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crossbeam::channel::TryRecvError;

    use psn_core::prelude::*;

    fn server_config() -> ServerConfig {
        ServerConfig {
            system_name: "loopback rig".into(),
            data_rate_hz: 200,
            info_rate_hz: 50,
            ..ServerConfig::default()
        }
    }

    fn client_config() -> ClientConfig {
        ClientConfig { recv_timeout_ms: 5, ..ClientConfig::default() }
    }

    fn trackers() -> Vec<Tracker> {
        (0..40u16)
            .map(|i| Tracker::new(i).with_name(format!("T{i}")).with_pos([i as f32, 0.0, 1.0]).with_validity(1.0))
            .collect()
    }

    /// Wait until both a data and an info update covering every tracker arrived.
    fn wait_for_full_state(client: &Client, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        let (mut data, mut info) = (false, false);
        while Instant::now() < deadline && !(data && info) {
            if let Ok(ReassemblyEvent::Update { kind, trackers, .. }) =
                client.events().recv_timeout(Duration::from_millis(50))
            {
                let complete = trackers.len() == expected;
                match kind {
                    PacketKind::Data => data |= complete && trackers.values().all(|t| t.data_timestamp.is_some()),
                    PacketKind::Info => info |= complete && trackers.values().all(|t| t.name.is_some()),
                    PacketKind::Unknown(_) => {}
                }
            }
        }
        data && info
    }

    #[test]
    fn server_state_reaches_client() {
        let bus = LoopbackTransport::new(Duration::from_millis(5));
        let mut client = Client::start(client_config(), bus.clone()).unwrap();
        let mut server = Server::start(server_config(), Arc::new(bus)).unwrap();
        server.set_trackers(trackers()).unwrap();

        assert!(wait_for_full_state(&client, 40));

        let snapshot = client.trackers();
        assert_eq!(snapshot[&7].name.as_deref(), Some("T7"));
        assert_eq!(snapshot[&7].pos, Some(Float3::new(7.0, 0.0, 1.0)));
        assert_eq!(client.system_name().as_deref(), Some("loopback rig"));

        let sent = server.stop().unwrap();
        assert!(sent.counters.frames_sent > 0);
        assert_eq!(sent.counters.send_failures, 0);

        let received = client.stop().unwrap();
        assert!(received.counters.frames_completed > 0);
        assert_eq!(received.counters.decode_failures, 0);
    }

    #[test]
    fn nothing_is_delivered_after_stop() {
        let bus = LoopbackTransport::new(Duration::from_millis(5));
        let mut client = Client::start(client_config(), bus.clone()).unwrap();
        let mut server = Server::start(server_config(), Arc::new(bus.clone())).unwrap();
        server.set_trackers(trackers()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        client.stop().unwrap();
        assert!(!client.is_running());
        assert!(matches!(client.events().try_recv(), Err(TryRecvError::Disconnected)));

        // the server keeps sending into the bus; the stopped client never sees it
        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(client.events().try_recv(), Err(TryRecvError::Disconnected)));

        server.stop().unwrap();
        let queued = bus.pending();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(bus.pending(), queued);
    }

    #[test]
    fn stop_is_idempotent() {
        let bus = LoopbackTransport::new(Duration::from_millis(5));
        let mut server = Server::start(server_config(), Arc::new(bus.clone())).unwrap();
        let mut client = Client::start(client_config(), bus).unwrap();

        server.stop().unwrap();
        assert!(!server.is_running());
        assert_eq!(server.stop().unwrap().counters.frames_sent, 0);

        let first = client.stop().unwrap();
        let second = client.stop().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn invalid_config_is_refused_before_spawning() {
        let bus = LoopbackTransport::new(Duration::from_millis(5));
        let cfg = ServerConfig { data_rate_hz: 0, ..server_config() };
        assert!(matches!(Server::start(cfg, Arc::new(bus)), Err(PsnError::Config(_))));
    }

    #[test]
    fn duplicate_ids_are_refused_by_server() {
        let bus = LoopbackTransport::new(Duration::from_millis(5));
        let server = Server::start(server_config(), Arc::new(bus)).unwrap();
        let err = server.set_trackers(vec![Tracker::new(1), Tracker::new(1)]).unwrap_err();
        assert_eq!(err, psn_core::fragment::FragmentError::DuplicateTrackerId(1));
    }
}
