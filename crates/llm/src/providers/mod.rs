//! LLM provider implementations.

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Build the shared HTTP client with a per-call timeout.
pub(crate) fn http_client(timeout: std::time::Duration) -> rulegate_core::AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| rulegate_core::AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Read a non-success response into a backend error.
pub(crate) async fn api_error(provider: &str, response: reqwest::Response) -> rulegate_core::AppError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    rulegate_core::AppError::backend(
        "llm",
        format!("{} API error ({}): {}", provider, status, error_text),
    )
}
