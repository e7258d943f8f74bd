//! Client for the MyMemory translation API.
//!
//! `GET {base_url}/get?q=<text>&langpair=<src>|<dst>[&de=<email>]`
//!
//! The service answers HTTP 200 even for most failures and reports the real
//! outcome in `responseStatus` (a number, or sometimes a numeric string) with
//! a human-readable `responseDetails`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use livetrans_core::{TranslateError, Translator};

const DEFAULT_BASE_URL: &str = "https://api.mymemory.translated.net";

/// Settings for [`MyMemoryTranslator`].
#[derive(Clone, Debug)]
pub struct MyMemoryConfig {
    pub base_url: String,
    pub source_lang: String,
    pub target_lang: String,
    pub contact_email: Option<String>,
    /// Longer queries are cut at a character boundary before sending.
    pub max_query_bytes: usize,
}

impl Default for MyMemoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            source_lang: "en".to_string(),
            target_lang: "es".to_string(),
            contact_email: None,
            max_query_bytes: 500,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    response_data: Option<ResponseData>,
    #[serde(default)]
    response_status: Value,
    #[serde(default)]
    response_details: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    translated_text: Option<String>,
}

/// HTTP translator backed by MyMemory.
pub struct MyMemoryTranslator {
    config: MyMemoryConfig,
    client: reqwest::Client,
    langpair: String,
}

impl MyMemoryTranslator {
    pub fn new(config: MyMemoryConfig) -> Self {
        let langpair = format!("{}|{}", config.source_lang, config.target_lang);
        info!(base_url = %config.base_url, langpair = %langpair, "MyMemory translator initialized");
        Self {
            config,
            client: reqwest::Client::new(),
            langpair,
        }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    fn name(&self) -> &str {
        "mymemory"
    }

    async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }
        let query = truncate_to_bytes(text, self.config.max_query_bytes);
        if query.len() < text.len() {
            debug!(
                original_bytes = text.len(),
                sent_bytes = query.len(),
                "query truncated"
            );
        }

        let url = format!("{}/get", self.config.base_url.trim_end_matches('/'));
        let mut params = vec![("q", query), ("langpair", self.langpair.as_str())];
        if let Some(email) = &self.config.contact_email {
            params.push(("de", email.as_str()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::from_status(status.as_u16(), body));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

        interpret(body)
    }
}

fn interpret(body: ApiResponse) -> Result<String, TranslateError> {
    let status = match &body.response_status {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(200);

    if status != 200 {
        let details = match body.response_details {
            Value::String(s) if !s.is_empty() => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        return Err(match u16::try_from(status) {
            Ok(code) => TranslateError::from_status(code, details),
            Err(_) => TranslateError::Engine(format!("unexpected status {status}: {details}")),
        });
    }

    body.response_data
        .and_then(|d| d.translated_text)
        .ok_or_else(|| TranslateError::MalformedResponse("missing responseData.translatedText".into()))
}

fn map_transport_error(e: reqwest::Error) -> TranslateError {
    if e.is_decode() {
        TranslateError::MalformedResponse(e.to_string())
    } else {
        TranslateError::Network(e.to_string())
    }
}

/// Longest prefix of `text` no longer than `max` bytes that ends on a char boundary.
pub fn truncate_to_bytes(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator(server: &MockServer) -> MyMemoryTranslator {
        MyMemoryTranslator::new(MyMemoryConfig {
            base_url: server.uri(),
            ..MyMemoryConfig::default()
        })
    }

    #[tokio::test]
    async fn translates_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("q", "Hello there."))
            .and(query_param("langpair", "en|es"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseData": {"translatedText": "Hola.", "match": 1},
                "responseStatus": 200,
                "responseDetails": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = translator(&server);
        assert_eq!(t.translate("Hello there.").await.unwrap(), "Hola.");
    }

    #[tokio::test]
    async fn sends_contact_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("de", "ops@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseData": {"translatedText": "Sí."},
                "responseStatus": 200
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = MyMemoryTranslator::new(MyMemoryConfig {
            base_url: format!("{}/", server.uri()),
            contact_email: Some("ops@example.com".into()),
            ..MyMemoryConfig::default()
        });
        assert_eq!(t.translate("Yes.").await.unwrap(), "Sí.");
    }

    #[tokio::test]
    async fn api_level_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responseData": {"translatedText": "INVALID LANGUAGE PAIR"},
                "responseStatus": "403",
                "responseDetails": "INVALID LANGUAGE PAIR SPECIFIED"
            })))
            .mount(&server)
            .await;

        let err = translator(&server).translate("Hello.").await.unwrap_err();
        match err {
            TranslateError::AuthenticationFailed(details) => {
                assert_eq!(details, "INVALID LANGUAGE PAIR SPECIFIED");
            }
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn quota_exceeded_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = translator(&server).translate("Hello.").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn server_error_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = translator(&server).translate("Hello.").await.unwrap_err();
        assert!(matches!(err, TranslateError::ServerError { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = translator(&server).translate("Hello.").await.unwrap_err();
        assert!(matches!(err, TranslateError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_translation_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseStatus": 200})))
            .mount(&server)
            .await;

        let err = translator(&server).translate("Hello.").await.unwrap_err();
        assert!(err.to_string().contains("translatedText"));
    }

    #[tokio::test]
    async fn empty_input_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        assert_eq!(translator(&server).translate("   ").await.unwrap(), "");
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let t = MyMemoryTranslator::new(MyMemoryConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..MyMemoryConfig::default()
        });
        let err = t.translate("Hello.").await.unwrap_err();
        assert!(matches!(err, TranslateError::Network(_)));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_to_bytes("hello", 10), "hello");
        assert_eq!(truncate_to_bytes("hello", 3), "hel");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate_to_bytes("aé", 2), "a");
        assert_eq!(truncate_to_bytes("", 0), "");
    }

    #[test]
    fn out_of_range_api_status_is_an_engine_error() {
        // 65965 wraps to 429 if narrowed to u16.
        let body: ApiResponse = serde_json::from_value(json!({
            "responseStatus": 65965,
            "responseDetails": "bogus"
        }))
        .unwrap();
        let err = interpret(body).unwrap_err();
        assert!(matches!(err, TranslateError::Engine(ref msg) if msg.contains("65965")));
        assert!(!err.is_retryable());
    }

    #[test]
    fn langpair_format() {
        let t = MyMemoryTranslator::new(MyMemoryConfig {
            source_lang: "de".into(),
            target_lang: "it".into(),
            ..MyMemoryConfig::default()
        });
        assert_eq!(t.langpair, "de|it");
        assert_eq!(t.name(), "mymemory");
    }
}
