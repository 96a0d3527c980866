//! Flow control between the relay and the realtime adapter
//!
//! The engine floods response audio while the caller floods media, with
//! small queues on every hop. The relay must keep making progress both ways.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use ai_speech::RealtimeConfig;
use application::{
    ApplicationError, CallRelay, RelayConfig, SpeechEngineConnector, TelephonyOutletPort,
};
use async_trait::async_trait;
use domain::{CallId, CallSession, StreamId, TelephonyCommand, TelephonyEvent};
use futures::{SinkExt, StreamExt};
use infrastructure::adapters::RealtimeSpeechEngineAdapter;
use secrecy::SecretString;
use serde_json::Value;
use tokio::{
    net::TcpListener,
    sync::{Notify, mpsc, watch},
    time::timeout,
};
use tokio_tungstenite::tungstenite::Message;

const QUEUE: usize = 8;
const RESPONSE_CHUNKS: usize = 5_000;
const CALLER_FRAMES: u64 = 2_000;

/// Outlet that only counts what the relay writes
#[derive(Default)]
struct CountingOutlet {
    sent: AtomicUsize,
}

#[async_trait]
impl TelephonyOutletPort for CountingOutlet {
    async fn send(&self, _command: TelephonyCommand) -> Result<(), ApplicationError> {
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn close(&self) -> Result<(), ApplicationError> {
        Ok(())
    }
}

/// Engine that reads and writes independently, flooding audio once the
/// first append arrives
async fn start_flooding_engine(appends: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut source) = ws.split();
        let first_append = Arc::new(Notify::new());

        let flood_start = Arc::clone(&first_append);
        tokio::spawn(async move {
            flood_start.notified().await;
            for n in 0..RESPONSE_CHUNKS {
                let frame = format!(
                    r#"{{"type":"response.audio.delta","item_id":"item_1","delta":"chunk{n}"}}"#
                );
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
        });

        while let Some(Ok(frame)) = source.next().await {
            let Message::Text(text) = frame else {
                continue;
            };
            let value: Value = serde_json::from_str(text.as_str()).unwrap();
            if value["type"] == "input_audio_buffer.append"
                && appends.fetch_add(1, Ordering::Relaxed) == 0
            {
                first_append.notify_one();
            }
        }
    });

    format!("ws://{addr}/v1/realtime")
}

#[tokio::test]
async fn relay_keeps_flowing_when_both_sides_flood() {
    let appends = Arc::new(AtomicUsize::new(0));
    let url = start_flooding_engine(Arc::clone(&appends)).await;
    let adapter = RealtimeSpeechEngineAdapter::new(RealtimeConfig {
        url,
        api_key: Some(SecretString::from("sk-test")),
        settle_delay_ms: 0,
        ..Default::default()
    })
    .unwrap()
    .with_command_buffer(QUEUE);

    let (engine_tx, engine_rx) = mpsc::channel(QUEUE);
    let (telephony_tx, telephony_rx) = mpsc::channel(QUEUE);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let outlet = Arc::new(CountingOutlet::default());

    let session = CallSession::new();
    let port = adapter.open(CallId::new(), engine_tx);
    let relay = CallRelay::new(
        session,
        port,
        Arc::clone(&outlet) as Arc<dyn TelephonyOutletPort>,
        RelayConfig {
            event_buffer: QUEUE,
            ..RelayConfig::default()
        },
    );
    let relay = tokio::spawn(relay.run(telephony_rx, engine_rx, shutdown_rx));

    let feed = async {
        telephony_tx
            .send(TelephonyEvent::Start {
                stream_id: StreamId::new("MZ1").unwrap(),
                call_sid: Some("CA1".to_string()),
            })
            .await
            .unwrap();

        // Frames sent before the engine connects are dropped; trickle until
        // one gets through, then flood.
        let mut timestamp_ms = 0;
        while appends.load(Ordering::Relaxed) == 0 {
            timestamp_ms += 20;
            telephony_tx
                .send(TelephonyEvent::Media {
                    timestamp_ms,
                    payload: "AAAA".to_string(),
                })
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for _ in 0..CALLER_FRAMES {
            timestamp_ms += 20;
            telephony_tx
                .send(TelephonyEvent::Media {
                    timestamp_ms,
                    payload: "AAAA".to_string(),
                })
                .await
                .unwrap();
        }
    };
    timeout(Duration::from_secs(10), feed)
        .await
        .expect("relay stopped accepting caller audio");

    drop(telephony_tx);
    let stats = timeout(Duration::from_secs(10), relay)
        .await
        .expect("relay did not finish")
        .unwrap();

    assert!(stats.forwarded_frames >= CALLER_FRAMES);
    assert!(stats.outbound_chunks > 0);
    assert!(outlet.sent.load(Ordering::Relaxed) > 0);
}
