//! Property test: any sequence of accepted publishes echoes back in the
//! exact order it was submitted.

use std::time::Duration;

use bytes::Bytes;
use mqtt_courier::{ClientEvent, CourierClient, QoS};
use proptest::prelude::*;

async fn next_event(client: &mut CourierClient) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(2), client.next_event())
        .await
        .expect("timed out waiting for event")
        .expect("event stream ended")
}

proptest! {
    // Each case spins up a worker and real timers; keep the case count low.
    #![proptest_config(ProptestConfig { cases: 16, ..ProptestConfig::default() })]

    #[test]
    fn echo_preserves_submission_order(
        payloads in proptest::collection::vec("[a-z0-9]{1,16}", 1..12)
    ) {
        tokio_test::block_on(async move {
            let mut client = CourierClient::new();
            client.connect("127.0.0.1", 1883, false);

            for (i, payload) in payloads.iter().enumerate() {
                assert!(client.publish(
                    &format!("prop/{i}"),
                    payload.clone().into_bytes(),
                    QoS::AtMostOnce,
                    false,
                ));
            }

            assert_eq!(next_event(&mut client).await, ClientEvent::Connected);
            for (i, payload) in payloads.iter().enumerate() {
                assert_eq!(
                    next_event(&mut client).await,
                    ClientEvent::Message {
                        topic: format!("prop/{i}"),
                        payload: Bytes::from(payload.clone().into_bytes()),
                    }
                );
            }

            client.shutdown().await;
        });
    }
}
