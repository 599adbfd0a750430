//! Session channel integration tests over the replay transport.

use std::time::Duration;

use promptwire::channel::{ChannelConfig, SendOptions, SessionChannel};
use promptwire::transport::ReplayTransport;

fn config(prompt: &str) -> ChannelConfig {
    ChannelConfig {
        prompt_pattern: prompt.to_string(),
        timeout_ops: Duration::from_secs(2),
        ..ChannelConfig::default()
    }
}

#[tokio::test]
async fn byte_at_a_time_delivery_yields_clean_output() {
    // The transport delivers the whole exchange one byte per read; the
    // channel still assembles, echo-strips, and prompt-strips correctly.
    let transport = ReplayTransport::new()
        .feed(&b"show version\nSoftware 1.2.3\nrouter#"[..])
        .chunk_size(1);

    let mut channel =
        SessionChannel::new(Box::new(transport), config(r"(?m)^router#\s?$")).unwrap();
    channel.open().await.unwrap();

    let out = channel
        .send_input("show version", &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(out.processed, "Software 1.2.3");

    channel.close().await.unwrap();
}

#[tokio::test]
async fn small_search_window_still_finds_tail_prompt() {
    // 10k bytes of filler followed by a prompt; the search window is far
    // smaller than the filler but larger than the prompt plus one line.
    let mut output = vec![b'x'; 10_000];
    output.extend_from_slice(b"\nrouter#");
    let transport = ReplayTransport::new().feed(output);

    let mut channel = SessionChannel::new(
        Box::new(transport),
        ChannelConfig {
            search_depth: 100,
            ..config(r"(?m)^router#\s?$")
        },
    )
    .unwrap();
    channel.open().await.unwrap();

    let bytes = channel.read_until_prompt(None).await.unwrap();
    assert_eq!(bytes.len(), 10_008);
    assert!(bytes.ends_with(b"router#"));

    channel.close().await.unwrap();
}

#[tokio::test]
async fn exact_echo_mode_waits_for_verbatim_input() {
    let transport = ReplayTransport::new().feed(&b"show clock\n12:00:00 UTC\nrouter#"[..]);

    let mut channel =
        SessionChannel::new(Box::new(transport), config(r"(?m)^router#\s?$")).unwrap();
    channel.open().await.unwrap();

    let opts = SendOptions {
        echo: Some(promptwire::EchoCheck::Exact),
        ..SendOptions::default()
    };
    let out = channel.send_input("show clock", &opts).await.unwrap();
    assert_eq!(out.processed, "12:00:00 UTC");

    channel.close().await.unwrap();
}

#[tokio::test]
async fn strip_prompt_can_be_disabled_per_call() {
    let transport = ReplayTransport::new().feed(&b"show clock\n12:00:00 UTC\nrouter#"[..]);

    let mut channel =
        SessionChannel::new(Box::new(transport), config(r"(?m)^router#\s?$")).unwrap();
    channel.open().await.unwrap();

    let opts = SendOptions {
        strip_prompt: Some(false),
        ..SendOptions::default()
    };
    let out = channel.send_input("show clock", &opts).await.unwrap();
    assert_eq!(out.processed, "12:00:00 UTC\nrouter#");

    channel.close().await.unwrap();
}
