//! WhatsApp gateway adapter.

use serde::{Deserialize, Serialize};

use super::DispatchError;

const GATEWAY_URL: &str = "https://api.fonnte.com/send";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    target: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub async fn send(
    http: &reqwest::Client,
    token: &str,
    to: &str,
    message: &str,
) -> Result<(), DispatchError> {
    let response = http
        .post(GATEWAY_URL)
        .header("Authorization", token)
        .json(&SendRequest {
            target: to,
            message,
        })
        .send()
        .await?
        .error_for_status()?;

    let body: SendResponse = response.json().await?;
    if !body.status {
        return Err(DispatchError::ProviderRejected(
            body.reason.unwrap_or_else(|| "unknown reason".into()),
        ));
    }
    Ok(())
}
