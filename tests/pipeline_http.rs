use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wa_sticker::config::{Config, GetProviderConfig, LinkProviderConfig, TemplateProviderConfig};
use wa_sticker::pipeline::StickerPipeline;
use wa_sticker::provider::MediaFamily;
use wa_sticker::{Source, StickerError, read_sticker_metadata};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

fn tiny_webp() -> Vec<u8> {
    let mut v = b"RIFF".to_vec();
    v.extend_from_slice(&14u32.to_le_bytes());
    v.extend_from_slice(b"WEBP");
    v.extend_from_slice(b"VP8L");
    v.extend_from_slice(&1u32.to_le_bytes());
    v.extend_from_slice(&[0x2f, 0x00]);
    v
}

/// Default config with every chain pointed at `server`.
fn mock_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    let uri = server.uri();

    for (i, p) in config.providers.convert.iter_mut().enumerate() {
        p.url = format!("{uri}/convert/{i}");
    }
    for (i, p) in config.providers.to_image.iter_mut().enumerate() {
        p.url = format!("{uri}/to-image/{i}");
    }
    config.providers.watermark[0].url = format!("{uri}/stamp");

    config.providers.text = vec![GetProviderConfig::Direct(TemplateProviderConfig {
        name: "brat".into(),
        url: format!("{uri}/brat"),
        query: vec![("text".into(), "{text}".into())],
        accept: MediaFamily::Image,
        enabled: true,
    })];
    config.providers.animated_text = vec![GetProviderConfig::Direct(TemplateProviderConfig {
        name: "bratvid".into(),
        url: format!("{uri}/bratvid"),
        query: vec![("text".into(), "{text}".into())],
        accept: MediaFamily::Animated,
        enabled: true,
    })];
    config.providers.emoji = vec![
        GetProviderConfig::Direct(TemplateProviderConfig {
            name: "kitchen".into(),
            url: format!("{uri}/kitchen/u{{cp1}}_u{{cp2}}.png"),
            query: Vec::new(),
            accept: MediaFamily::Image,
            enabled: true,
        }),
        GetProviderConfig::Link(LinkProviderConfig {
            name: "search".into(),
            url: format!("{uri}/search"),
            query: vec![("q".into(), "{emoji1}_{emoji2}".into())],
            pointer: "/results/0/url".into(),
            accept: MediaFamily::Image,
            enabled: true,
        }),
    ];
    config.http.timeout_secs = 5;
    config
}

fn image(body: &[u8], content_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body)
        .insert_header("content-type", content_type)
}

#[tokio::test]
async fn text_sticker_generates_converts_and_stamps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/brat"))
        .and(query_param("text", "hello world"))
        .respond_with(image(PNG, "image/png"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/convert/0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/convert/1"))
        .respond_with(image(&tiny_webp(), "image/webp"))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);
    let meta = config.sticker.metadata();

    let outcome = pipeline.text_sticker("hello world", &meta).await.unwrap();
    assert_eq!(outcome.source, Source::Provider("cloudconvert".into()));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].provider, "ezgif");

    let stamped = read_sticker_metadata(&outcome.bytes).unwrap().unwrap();
    assert_eq!(stamped.pack_name, "Bot Sticker");
}

#[tokio::test]
async fn emoji_mix_follows_search_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/kitchen/u1f602_u1f60d.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "😂_😍"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{ "url": format!("{}/mixed.webp", server.uri()) }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mixed.webp"))
        .respond_with(image(&tiny_webp(), "image/webp"))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);
    let meta = config.sticker.metadata().renamed("Emoji", "Kitchen");

    let outcome = pipeline.emoji_mix("😂+😍", &meta).await.unwrap();
    assert_eq!(outcome.source, Source::Provider("search".into()));
    let stamped = read_sticker_metadata(&outcome.bytes).unwrap().unwrap();
    assert_eq!(stamped.publisher, "Kitchen");
}

#[tokio::test]
async fn animated_text_fails_without_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bratvid"))
        .respond_with(image(PNG, "image/png"))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);

    // a static PNG is not an animation
    match pipeline.animated_text_sticker("hi", &config.sticker.metadata()).await {
        Err(StickerError::AllProvidersFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].reason.contains("image/png"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn watermark_prefers_online_stamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stamp"))
        .respond_with(image(b"STAMPED", "image/webp"))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);
    let outcome = pipeline
        .watermark(tiny_webp(), &config.sticker.metadata())
        .await
        .unwrap();
    assert_eq!(outcome.bytes, b"STAMPED");
    assert_eq!(outcome.source.name(), "sticker-tools");
}

#[tokio::test]
async fn watermark_falls_back_to_local_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);
    let meta = config.sticker.metadata().renamed("Local", "Embed");
    let outcome = pipeline.watermark(tiny_webp(), &meta).await.unwrap();

    assert_eq!(outcome.source.name(), "local-exif");
    let stamped = read_sticker_metadata(&outcome.bytes).unwrap().unwrap();
    assert_eq!(stamped.pack_name, "Local");
}

#[tokio::test]
async fn to_image_exhaustion_returns_still_frame() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = mock_config(&server);
    let pipeline = StickerPipeline::from_config(&config);
    let outcome = pipeline.to_image(tiny_webp()).await.unwrap();

    assert!(outcome.source.is_fallback());
    assert_eq!(outcome.failures.len(), 3);
    assert_eq!(outcome.bytes, tiny_webp());
}
