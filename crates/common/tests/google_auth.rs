//! Token source selection from configuration.

use busalert_common::config::AppConfig;
use busalert_common::error::AppError;
use busalert_common::google_auth::{EMULATOR_TOKEN, firestore_tokens, messaging_tokens};

fn config(vars: &[(&str, &str)]) -> AppConfig {
    AppConfig::from_lookup(|key| {
        vars.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .or_else(|| (key == "GOOGLE_CLOUD_PROJECT").then(|| "bus-app".to_string()))
    })
    .unwrap()
}

#[tokio::test]
async fn test_firestore_emulator_uses_fixed_bearer() {
    let config = config(&[("FIRESTORE_EMULATOR_HOST", "127.0.0.1:8080")]);
    let tokens = firestore_tokens(&config);
    assert_eq!(tokens.access_token().await.unwrap(), EMULATOR_TOKEN);
}

#[tokio::test]
async fn test_messaging_ignores_firestore_emulator() {
    // A broken key file makes the real credential path observable without network access.
    let config = config(&[
        ("FIRESTORE_EMULATOR_HOST", "127.0.0.1:8080"),
        ("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/busalert-key.json"),
    ]);

    let result = messaging_tokens(&config).access_token().await;
    assert!(matches!(result, Err(AppError::Credentials(_))));
}

#[tokio::test]
async fn test_firestore_without_emulator_uses_real_credentials() {
    let config = config(&[("GOOGLE_APPLICATION_CREDENTIALS", "/nonexistent/busalert-key.json")]);

    let result = firestore_tokens(&config).access_token().await;
    assert!(matches!(result, Err(AppError::Credentials(_))));
}
