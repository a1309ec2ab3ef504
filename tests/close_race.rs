use sfu_metadata::conn;
use sfu_metadata::{ClientId, LifecycleState, MetadataTransport, SimpleTrack, TrackKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_stream::StreamExt;

/// Regression test for the close/teardown deadlock class.
///
/// Scenario:
/// 1. Create an endpoint pair and start hammering one side with add_track
///    calls from a separate task
/// 2. Call close() while those sends are in flight, racing the write loop's
///    shutdown against callers blocked on the outbound hand-off
/// 3. Assert close() returns within bounded time
/// 4. Assert the consumer event stream is closed afterwards
/// 5. Assert late senders get an error instead of hanging
#[tokio::test]
async fn test_close_races_inflight_sends_without_deadlock() {
    let (a, b) = conn::pair(1);
    let e1 = Arc::new(MetadataTransport::new(
        Arc::new(a),
        ClientId::from("client-2"),
    ));
    let e2 = MetadataTransport::new(Arc::new(b), ClientId::from("client-1"));
    let mut e2_events = e2.track_events().unwrap();

    // Nobody drains e2's consumer stream while the sender task runs, so the
    // forwarding path is under backpressure when close() lands.
    let sender = {
        let e1 = e1.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                let track =
                    SimpleTrack::new(TrackKind::Audio, format!("stream-{}", i), "mic");
                if e1.add_track(track).await.is_err() {
                    // Write loop is gone; that is the expected way out
                    return i;
                }
            }
            200
        })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;

    // Close must return within bounded time despite the in-flight sends
    timeout(Duration::from_secs(2), e1.close())
        .await
        .expect("close() deadlocked against in-flight add_track calls")
        .unwrap();
    assert_eq!(e1.state(), LifecycleState::Closed);

    // The blocked sender task must also unwind, not hang forever
    let sent = timeout(Duration::from_secs(2), sender)
        .await
        .expect("sender task hung after close")
        .unwrap();
    assert!(sent <= 200);

    // E2 saw the connection die: drain whatever was delivered, then the
    // stream must be closed
    loop {
        match timeout(Duration::from_secs(2), e2_events.next()).await {
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(_) => panic!("e2 event stream neither yielded nor closed"),
        }
    }

    e2.close().await.unwrap();

    // Late sends fail fast
    let track = SimpleTrack::new(TrackKind::Video, "late", "cam");
    assert!(e1.add_track(track).await.is_err());
}
