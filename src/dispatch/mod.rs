//! Fire-and-forget dispatch to external channels.
//!
//! Every send runs as its own spawned task with a bounded timeout, so a
//! hung provider can neither delay the HTTP response that triggered it nor
//! leak a task forever. Failures are logged and swallowed; the order and
//! notification mutations that triggered a dispatch have already committed
//! and stay valid regardless of the outcome here. Channels fail
//! independently: a WhatsApp failure never stops the email attempt.
//!
//! Channel enablement (settings flag + provider credential) is evaluated at
//! send time, so toggling notifications takes effect without a restart.

pub mod email;
pub mod templates;
pub mod whatsapp;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::AppConfig;
use crate::db::OrmConn;
use crate::entity::orders;
use crate::settings;

pub use templates::{EmailContent, EventContext, OrderEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("provider request failed: {0}")]
    Provider(#[from] reqwest::Error),

    #[error("provider rejected message: {0}")]
    ProviderRejected(String),

    #[error("provider timed out")]
    Timeout,

    #[error("settings lookup failed: {0}")]
    Settings(#[from] sea_orm::DbErr),
}

/// Recipient-and-content facts captured from an order before the dispatch
/// task is spawned; templating never touches the store.
#[derive(Debug, Clone)]
pub struct OrderFacts {
    pub order_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub total: i64,
}

impl OrderFacts {
    pub fn from_order(order: &orders::Model) -> Self {
        Self {
            order_code: order.order_code.clone(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_email: order.customer_email.clone(),
            total: order.total,
        }
    }
}

struct Inner {
    http: reqwest::Client,
    orm: OrmConn,
    whatsapp_token: Option<String>,
    email_api_key: Option<String>,
    email_from: String,
    timeout: Duration,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    pub fn new(orm: OrmConn, config: &AppConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                orm,
                whatsapp_token: config.whatsapp_api_token.clone(),
                email_api_key: config.email_api_key.clone(),
                email_from: config.email_from.clone(),
                timeout: config.dispatch_timeout,
            }),
        }
    }

    /// Announce `event` to the customer on every enabled channel.
    pub fn notify_customer(&self, event: OrderEvent, facts: OrderFacts) {
        self.spawn_whatsapp(facts.customer_phone.clone(), event.clone(), facts.clone());
        self.spawn_email(facts.customer_email.clone(), event, facts);
    }

    /// Email-only confirmation to the customer (used for proof receipt,
    /// where the WhatsApp channel is reserved for the admin alert).
    pub fn email_customer(&self, event: OrderEvent, facts: OrderFacts) {
        self.spawn_email(facts.customer_email.clone(), event, facts);
    }

    /// WhatsApp ping to the shop admin that a proof awaits review.
    pub fn alert_admin_proof_uploaded(&self, facts: OrderFacts) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = async {
                let Some(phone) =
                    settings::get_setting(&inner.orm, settings::ADMIN_PHONE).await?
                else {
                    tracing::debug!("admin_phone not configured; skipping admin alert");
                    return Ok(());
                };
                let ctx = inner.event_context(facts).await?;
                let message = templates::admin_proof_alert(&ctx);
                inner.send_whatsapp(&phone, &message).await
            }
            .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, channel = "whatsapp", "admin alert dispatch failed");
            }
        });
    }

    fn spawn_whatsapp(&self, to: String, event: OrderEvent, facts: OrderFacts) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = async {
                let ctx = inner.event_context(facts).await?;
                let message = templates::whatsapp_message(&event, &ctx);
                inner.send_whatsapp(&to, &message).await
            }
            .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, channel = "whatsapp", to = %to, "dispatch failed");
            }
        });
    }

    fn spawn_email(&self, to: String, event: OrderEvent, facts: OrderFacts) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = async {
                let ctx = inner.event_context(facts).await?;
                let content = templates::email_content(&event, &ctx);
                inner.send_email(&to, &content).await
            }
            .await;
            if let Err(err) = result {
                tracing::warn!(error = %err, channel = "email", to = %to, "dispatch failed");
            }
        });
    }
}

impl Inner {
    async fn event_context(&self, facts: OrderFacts) -> Result<EventContext, DispatchError> {
        let site_url = settings::get_setting(&self.orm, settings::SITE_URL)
            .await?
            .unwrap_or_default();
        Ok(EventContext {
            order_code: facts.order_code,
            customer_name: facts.customer_name,
            total: facts.total,
            site_url,
        })
    }

    async fn send_whatsapp(&self, to: &str, message: &str) -> Result<(), DispatchError> {
        if !self.whatsapp_ready().await? {
            return Ok(());
        }
        let token = self.whatsapp_token.as_deref().unwrap_or_default();
        tokio::time::timeout(self.timeout, whatsapp::send(&self.http, token, to, message))
            .await
            .map_err(|_| DispatchError::Timeout)?
    }

    async fn send_email(&self, to: &str, content: &EmailContent) -> Result<(), DispatchError> {
        if !self.email_ready().await? {
            return Ok(());
        }
        let api_key = self.email_api_key.as_deref().unwrap_or_default();
        tokio::time::timeout(
            self.timeout,
            email::send(&self.http, api_key, &self.email_from, to, content),
        )
        .await
        .map_err(|_| DispatchError::Timeout)?
    }

    async fn whatsapp_ready(&self) -> Result<bool, DispatchError> {
        if self.whatsapp_token.is_none() {
            tracing::debug!("whatsapp credential missing; channel disabled");
            return Ok(false);
        }
        let enabled =
            settings::channel_enabled(&self.orm, settings::WHATSAPP_ENABLED).await?;
        if !enabled {
            tracing::debug!("whatsapp channel disabled by setting");
        }
        Ok(enabled)
    }

    async fn email_ready(&self) -> Result<bool, DispatchError> {
        if self.email_api_key.is_none() {
            tracing::debug!("email credential missing; channel disabled");
            return Ok(false);
        }
        let enabled = settings::channel_enabled(&self.orm, settings::EMAIL_ENABLED).await?;
        if !enabled {
            tracing::debug!("email channel disabled by setting");
        }
        Ok(enabled)
    }
}
