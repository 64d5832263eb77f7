//! Image and speech generation, including secondary asset downloads.

mod support;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64_STANDARD;
use demeterics_nodes::auth::VendorKeySlot;
use demeterics_nodes::nodes::image::ImageNode;
use demeterics_nodes::nodes::speech::SpeechNode;
use demeterics_nodes::nodes::{Node, NodeContext};
use mockito::Matcher;
use serde_json::json;

#[tokio::test]
async fn image_url_is_downloaded_in_both_mode() {
    let mut server = support::start().await;
    let asset_url = format!("{}/files/cat.png", server.url());
    let generate = server
        .mock("POST", "/imagen/v1/generate")
        .match_header("authorization", "Bearer dmt_test_key_123;sk-openai")
        .match_body(Matcher::PartialJson(json!({
            "provider": "openai",
            "model": "gpt-image-1",
            "prompt": "a cat",
            "quality": "medium"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "img_1",
                "provider": "openai",
                "model": "gpt-image-1",
                "cost_usd": 0.04,
                "images": [{"url": asset_url, "width": 1024, "height": 1024}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let download = server
        .mock("GET", "/files/cat.png")
        .with_status(200)
        .with_header("content-type", "image/png")
        .with_body(b"\x89PNG-bytes")
        .create_async()
        .await;

    let settings = support::byok_settings(&server, VendorKeySlot::OpenAI, "sk-openai");
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = ImageNode
        .execute(
            &ctx,
            json!({"provider": "openai", "prompt": "a cat", "output_type": "both"}),
        )
        .await
        .unwrap();

    generate.assert_async().await;
    download.assert_async().await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].json["image_url"], asset_url.as_str());
    assert_eq!(out[0].json["cost_usd"], 0.04);
    assert!(out[0].json.get("binary_fetch_error").is_none());
    let binary = out[0].binary.as_ref().unwrap();
    assert_eq!(binary.data, b"\x89PNG-bytes");
    assert_eq!(binary.file_name, "image.png");
}

#[tokio::test]
async fn failed_download_is_partial_success() {
    let mut server = support::start().await;
    let asset_url = format!("{}/files/gone.png", server.url());
    let _generate = server
        .mock("POST", "/imagen/v1/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"id": "img_2", "images": [{"url": asset_url}]}).to_string())
        .create_async()
        .await;
    let _download = server
        .mock("GET", "/files/gone.png")
        .with_status(404)
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = ImageNode
        .execute(&ctx, json!({"provider": "stability", "prompt": "a dog"}))
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    assert!(out[0].binary.is_none());
    assert_eq!(out[0].json["image_url"], asset_url.as_str());
    assert_eq!(out[0].json["binary_fetch_error"], "Failed to download image from URL");
}

#[tokio::test]
async fn speech_inline_audio_becomes_binary() {
    let mut server = support::start().await;
    let audio = b"ID3-audio-bytes";
    let _mock = server
        .mock("POST", "/tts/v1/generate")
        .match_body(Matcher::PartialJson(json!({
            "provider": "openai",
            "model": "gpt-4o-mini-tts",
            "voice": "alloy",
            "input": "Hello world",
            "format": "mp3"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "tts_1",
                "provider": "openai",
                "voice": "alloy",
                "audio_url": "https://cdn.example.com/tts_1.mp3",
                "audio_base64": B64_STANDARD.encode(audio),
                "duration_seconds": 1.2
            })
            .to_string(),
        )
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = SpeechNode
        .execute(
            &ctx,
            json!({"provider": "openai", "text": "Hello world", "output_type": "binary"}),
        )
        .await
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].json["audio_url"], "https://cdn.example.com/tts_1.mp3");
    let binary = out[0].binary.as_ref().unwrap();
    assert_eq!(binary.data, audio);
    assert_eq!(binary.mime_type, "audio/mpeg");
    assert_eq!(binary.file_name, "audio.mp3");
}

#[tokio::test]
async fn speech_url_mode_skips_download() {
    let mut server = support::start().await;
    let _mock = server
        .mock("POST", "/tts/v1/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"tts_2","audio_url":"https://cdn.example.com/tts_2.mp3"}"#)
        .create_async()
        .await;

    let settings = support::settings(&server);
    let catalog = support::catalog();
    let ctx = NodeContext::new(&settings, &catalog);
    let out = SpeechNode
        .execute(&ctx, json!({"provider": "murf", "text": "Hi"}))
        .await
        .unwrap();

    assert!(out[0].binary.is_none());
    assert_eq!(out[0].json["id"], "tts_2");
}
