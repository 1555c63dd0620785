use callflow_core::{LlmResponder, LlmResponderConfig, Responder, Result, NO_INPUT};
use serial_test::serial;

fn clear_env() {
    std::env::remove_var("LLM_BASE_URL");
    std::env::remove_var("LLM_MODEL");
    std::env::remove_var("LLM_API_KEY");
    std::env::remove_var("GROQ_API_KEY");
    std::env::remove_var("REQUEST_TIMEOUT_MS");
    std::env::remove_var("LLM_TEMPERATURE");
}

#[test]
#[serial]
fn config_loads_from_defaults() {
    clear_env();
    let cfg = LlmResponderConfig::default();
    assert_eq!(cfg.base_url, "https://api.groq.com/openai/v1");
    assert_eq!(cfg.model, "llama-3.3-70b-versatile");
    assert_eq!(cfg.api_key, None);
    assert_eq!(cfg.request_timeout_ms, 10_000);
    assert_eq!(cfg.temperature, 0.7);
}

#[test]
#[serial]
fn config_loads_from_env() {
    clear_env();
    std::env::set_var("LLM_BASE_URL", "http://test:9000/v1");
    std::env::set_var("LLM_MODEL", "test-model");
    std::env::set_var("GROQ_API_KEY", "groq-key");
    std::env::set_var("REQUEST_TIMEOUT_MS", "2500");
    std::env::set_var("LLM_TEMPERATURE", "0.3");

    let cfg = LlmResponderConfig::default();
    assert_eq!(cfg.base_url, "http://test:9000/v1");
    assert_eq!(cfg.model, "test-model");
    assert_eq!(cfg.api_key.as_deref(), Some("groq-key"));
    assert_eq!(cfg.request_timeout_ms, 2500);
    assert_eq!(cfg.temperature, 0.3);

    // An explicit key wins over the Groq one
    std::env::set_var("LLM_API_KEY", "explicit-key");
    assert_eq!(
        LlmResponderConfig::default().api_key.as_deref(),
        Some("explicit-key")
    );

    clear_env();
}

fn unreachable() -> Result<LlmResponder> {
    LlmResponder::new(LlmResponderConfig {
        base_url: "http://127.0.0.1:9/v1".into(),
        model: "test".into(),
        api_key: Some("k".into()),
        request_timeout_ms: 500,
        temperature: 0.7,
    })
}

#[tokio::test]
async fn unreachable_endpoint_is_an_error() -> Result<()> {
    let responder = unreachable()?;
    assert!(responder.reply("I have a headache", "en-IN").await.is_err());
    Ok(())
}

#[tokio::test]
async fn silence_never_reaches_the_network() -> Result<()> {
    let responder = unreachable()?;
    for text in [NO_INPUT, "", "   "] {
        let reply = responder.reply(text, "ta-IN").await?;
        assert_eq!(reply, "I didn't catch that, please say again.");
    }
    Ok(())
}
