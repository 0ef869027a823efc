//! Transactional email adapter.

use serde::Serialize;

use super::DispatchError;
use super::templates::EmailContent;

const API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

pub async fn send(
    http: &reqwest::Client,
    api_key: &str,
    from: &str,
    to: &str,
    content: &EmailContent,
) -> Result<(), DispatchError> {
    http.post(API_URL)
        .bearer_auth(api_key)
        .json(&SendRequest {
            from,
            to: [to],
            subject: &content.subject,
            html: &content.html,
            text: &content.text,
        })
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
