// tests/reload_channel.rs

use std::path::PathBuf;

use assetdag::reload::{BroadcastReloadChannel, ReloadChannel, ReloadMessage, ReloadOptions};
use assetdag_test_utils::with_timeout;

#[test]
fn reload_message_serializes_with_type_tag() {
    let msg: ReloadMessage = ReloadOptions::stylesheets([PathBuf::from(".tmp/styles/a.css")]).into();
    let json = serde_json::to_string(&msg).unwrap();
    assert_eq!(
        json,
        r#"{"type":"reload","stream":true,"files":[".tmp/styles/a.css"]}"#
    );
}

#[tokio::test]
async fn broadcast_channel_delivers_in_order() {
    with_timeout(async {
        let channel = BroadcastReloadChannel::new(8, "/index.html");
        let mut rx = channel.subscribe();

        channel.notify("reloading now...");
        channel.reload_clients(ReloadOptions::full_page());

        assert_eq!(
            rx.recv().await.unwrap(),
            ReloadMessage::Notify {
                message: "reloading now...".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ReloadMessage::Reload {
                stream: false,
                files: vec![]
            }
        );
    })
    .await;
}

#[test]
fn sending_without_subscribers_is_not_an_error() {
    let channel = BroadcastReloadChannel::new(1, "/index.html");
    channel.notify("nobody listens");
    channel.reload_clients(ReloadOptions::full_page());
    assert_eq!(channel.start_path(), "/index.html");
}
