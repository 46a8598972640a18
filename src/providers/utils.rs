use anyhow::{Result, anyhow};
use serde_json::Value;

/// Pull the assistant text out of an OpenAI-style chat completion body.
pub fn extract_completion(response_json: &Value) -> Result<String> {
    // Gateways report failures with a 200 and an `error` object.
    if let Some(error) = response_json.get("error") {
        return Err(anyhow!("API returned error: {}", error));
    }

    response_json
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let debug_json = serde_json::to_string_pretty(response_json).unwrap_or_default();
            anyhow!("Invalid response format. Response JSON: {}", debug_json)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_completion() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "It opens at 9am." } }]
        });
        assert_eq!(extract_completion(&body).unwrap(), "It opens at 9am.");
    }

    #[test]
    fn test_error_object_is_reported() {
        let body = json!({ "error": { "message": "invalid api key" } });
        let err = extract_completion(&body).unwrap_err();
        assert!(err.to_string().contains("invalid api key"));
    }

    #[test]
    fn test_missing_choices() {
        assert!(extract_completion(&json!({ "choices": [] })).is_err());
    }
}
