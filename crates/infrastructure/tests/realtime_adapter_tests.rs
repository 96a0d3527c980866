//! Integration tests for the realtime speech engine adapter
//!
//! A local WebSocket server plays the speech engine.

use std::time::Duration;

use ai_speech::RealtimeConfig;
use application::SpeechEngineConnector;
use domain::{CallId, SpeechEngineCommand, SpeechEngineEvent, UtteranceId};
use futures::{SinkExt, StreamExt};
use infrastructure::adapters::RealtimeSpeechEngineAdapter;
use secrecy::SecretString;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

struct FakeEngine {
    url: String,
    received: mpsc::UnboundedReceiver<Value>,
    outgoing: mpsc::UnboundedSender<Message>,
}

async fn start_fake_engine() -> FakeEngine {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (received_tx, received) = mpsc::unbounded_channel();
    let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut source) = ws.split();

        loop {
            tokio::select! {
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let value: Value = serde_json::from_str(text.as_str()).unwrap();
                        let _ = received_tx.send(value);
                    },
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {},
                },
                out = outgoing_rx.recv() => match out {
                    Some(message) => {
                        let is_close = matches!(message, Message::Close(_));
                        let _ = sink.send(message).await;
                        if is_close {
                            break;
                        }
                    },
                    None => break,
                },
            }
        }
    });

    FakeEngine {
        url: format!("ws://{addr}/v1/realtime"),
        received,
        outgoing,
    }
}

fn config(url: String) -> RealtimeConfig {
    RealtimeConfig {
        url,
        api_key: Some(SecretString::from("sk-test")),
        settle_delay_ms: 0,
        ..Default::default()
    }
}

async fn next_event(events: &mut mpsc::Receiver<SpeechEngineEvent>) -> SpeechEngineEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn next_frame(received: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("fake engine stopped")
}

#[tokio::test]
async fn relays_commands_and_events() {
    let mut engine = start_fake_engine().await;
    let adapter = RealtimeSpeechEngineAdapter::new(config(engine.url.clone())).unwrap();
    let (events_tx, mut events) = mpsc::channel(16);

    let port = adapter.open(CallId::new(), events_tx);

    assert_eq!(next_event(&mut events).await, SpeechEngineEvent::Connected);
    assert_eq!(next_frame(&mut engine.received).await["type"], "session.update");

    port.send(SpeechEngineCommand::AppendAudio {
        payload: "AAAA".to_string(),
    })
    .await
    .unwrap();
    let frame = next_frame(&mut engine.received).await;
    assert_eq!(frame["type"], "input_audio_buffer.append");
    assert_eq!(frame["audio"], "AAAA");

    engine
        .outgoing
        .send(Message::Text(
            r#"{"type":"session.updated","session":{}}"#.into(),
        ))
        .unwrap();
    engine
        .outgoing
        .send(Message::Text(
            r#"{"type":"response.audio.delta","item_id":"item_1","delta":"UklG"}"#.into(),
        ))
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        SpeechEngineEvent::AudioDelta {
            utterance_id: UtteranceId::new("item_1").unwrap(),
            payload: "UklG".to_string(),
        }
    );

    port.send(SpeechEngineCommand::Truncate {
        utterance_id: UtteranceId::new("item_1").unwrap(),
        content_index: 0,
        audio_end_ms: 450,
    })
    .await
    .unwrap();
    let frame = next_frame(&mut engine.received).await;
    assert_eq!(frame["type"], "conversation.item.truncate");
    assert_eq!(frame["item_id"], "item_1");
    assert_eq!(frame["audio_end_ms"], 450);

    port.close().await.unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SpeechEngineEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn engine_hangup_reports_closed() {
    let engine = start_fake_engine().await;
    let adapter = RealtimeSpeechEngineAdapter::new(config(engine.url.clone())).unwrap();
    let (events_tx, mut events) = mpsc::channel(16);

    let port = adapter.open(CallId::new(), events_tx);
    assert_eq!(next_event(&mut events).await, SpeechEngineEvent::Connected);

    engine.outgoing.send(Message::Close(None)).unwrap();
    assert!(matches!(
        next_event(&mut events).await,
        SpeechEngineEvent::Closed { .. }
    ));

    // Commands are refused once the connection has reported its end.
    let sent = port
        .send(SpeechEngineCommand::AppendAudio {
            payload: "AAAA".to_string(),
        })
        .await;
    assert!(matches!(sent, Err(e) if e.is_connection_closed()));
}

#[tokio::test]
async fn close_before_connect_skips_connected() {
    // Accepts TCP but never completes the handshake.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let adapter = RealtimeSpeechEngineAdapter::new(config(format!("ws://{addr}"))).unwrap();
    let (events_tx, mut events) = mpsc::channel(16);
    let port = adapter.open(CallId::new(), events_tx);

    port.send(SpeechEngineCommand::AppendAudio {
        payload: "AAAA".to_string(),
    })
    .await
    .unwrap();
    port.close().await.unwrap();

    assert!(matches!(
        next_event(&mut events).await,
        SpeechEngineEvent::Closed { .. }
    ));
}

#[tokio::test]
async fn unreachable_engine_reports_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = RealtimeSpeechEngineAdapter::new(config(format!("ws://{addr}"))).unwrap();
    let (events_tx, mut events) = mpsc::channel(16);
    let _port = adapter.open(CallId::new(), events_tx);

    assert!(matches!(
        next_event(&mut events).await,
        SpeechEngineEvent::Closed { .. }
    ));
}
