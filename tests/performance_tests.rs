use sipline::core::engine::EngineEvent;
use sipline::core::session::{CallState, RemoteIdentity, Session, SessionRegistry};
use sipline::{CallClient, ClientDelegate, ClientOptions, SessionId, SipLineConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Performance and stress tests
#[cfg(test)]
mod performance_tests {
    use super::*;

    #[test]
    fn test_registry_lookup_performance() {
        let mut registry = SessionRegistry::new(64);
        for i in 0..64 {
            let mut session = Session::incoming(SessionId::new(format!("s{}", i)), RemoteIdentity::default());
            if i % 2 == 0 {
                session.advance(CallState::Established).unwrap();
            }
            registry.add(session).unwrap();
        }

        let start = Instant::now();
        for i in 0..10_000 {
            let id = SessionId::new(format!("s{}", i % 64));
            assert!(registry.find(&id).is_some());
        }
        assert_eq!(registry.filter_by_state(CallState::Established).count(), 32);
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_secs(1), "Registry lookups too slow: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_event_throughput() {
        let hangups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hangups);
        let delegate = ClientDelegate::new().on_call_hangup(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let options = ClientOptions {
            max_sessions: 1,
            ..ClientOptions::default()
        };
        let (client, engine) = CallClient::with_loopback(options, delegate).unwrap();
        client.connect().await.unwrap();

        let start = Instant::now();
        for i in 0..1_000 {
            let id = SessionId::new(format!("s{}", i));
            engine.ring(id.as_str(), RemoteIdentity::uri("sip:load@example.com"));
            engine.emit(EngineEvent::CallAnswered { id: id.clone() });
            engine.remote_hangup(&id);
        }

        timeout(Duration::from_secs(5), async {
            while hangups.load(Ordering::SeqCst) < 1_000 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("events not drained in time");

        assert_eq!(client.session_count().await, 0);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_config_serialization_performance() {
        let config = SipLineConfig::default();

        let start = Instant::now();
        for _ in 0..1000 {
            let serialized = toml::to_string(&config).expect("Serialization failed");
            let _: SipLineConfig = toml::from_str(&serialized).expect("Deserialization failed");
        }
        let elapsed = start.elapsed();

        assert!(elapsed < Duration::from_millis(2000), "Config serialization too slow: {:?}", elapsed);
    }
}
