//! Message templates for outbound customer and admin notifications.
//!
//! Templates are pure functions of event data; nothing here touches the
//! store. Each event type maps to exactly one template per channel.

/// The order event being announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    Created,
    ProofUploaded,
    ProofApproved,
    ProofRejected { notes: Option<String> },
    Shipped {
        courier: Option<String>,
        tracking_number: Option<String>,
    },
    Completed,
    Cancelled,
}

/// Everything a template may interpolate.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub order_code: String,
    pub customer_name: String,
    pub total: i64,
    pub site_url: String,
}

impl EventContext {
    fn order_link(&self) -> String {
        format!("{}/orders/{}", self.site_url.trim_end_matches('/'), self.order_code)
    }
}

#[derive(Debug, Clone)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Amounts are stored in minor units (sen); shown as whole rupiah with
/// dot separators.
pub fn format_amount(minor_units: i64) -> String {
    let whole = minor_units / 100;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

pub fn whatsapp_message(event: &OrderEvent, ctx: &EventContext) -> String {
    let code = &ctx.order_code;
    let name = &ctx.customer_name;
    match event {
        OrderEvent::Created => format!(
            "Hi {name}, thank you for your order {code} ({total}). Please \
             transfer and upload your payment proof here: {link}",
            total = format_amount(ctx.total),
            link = ctx.order_link(),
        ),
        OrderEvent::ProofUploaded => format!(
            "Hi {name}, we received your payment proof for order {code}. \
             We'll verify it shortly and let you know."
        ),
        OrderEvent::ProofApproved => format!(
            "Good news {name}! Your payment for order {code} is confirmed. \
             We're getting your handmade goods ready."
        ),
        OrderEvent::ProofRejected { notes } => {
            let mut msg = format!(
                "Hi {name}, we couldn't verify your payment proof for order \
                 {code}."
            );
            if let Some(notes) = notes.as_deref().filter(|n| !n.is_empty()) {
                msg.push_str(&format!(" Reason: {notes}."));
            }
            msg.push_str(&format!(
                " Please upload a new proof here: {}",
                ctx.order_link()
            ));
            msg
        }
        OrderEvent::Shipped {
            courier,
            tracking_number,
        } => {
            let mut msg = format!("Hi {name}, your order {code} is on its way!");
            if let Some(courier) = courier.as_deref().filter(|c| !c.is_empty()) {
                msg.push_str(&format!(" Courier: {courier}."));
            }
            if let Some(tracking) = tracking_number.as_deref().filter(|t| !t.is_empty()) {
                msg.push_str(&format!(" Tracking number: {tracking}."));
            }
            msg
        }
        OrderEvent::Completed => format!(
            "Hi {name}, order {code} is complete. Thank you for supporting \
             our little workshop — we hope you love it!"
        ),
        OrderEvent::Cancelled => format!(
            "Hi {name}, your order {code} has been cancelled. If this is \
             unexpected, just reply to this message."
        ),
    }
}

pub fn email_content(event: &OrderEvent, ctx: &EventContext) -> EmailContent {
    let code = &ctx.order_code;
    let (subject, body) = match event {
        OrderEvent::Created => (
            format!("Order {code} received"),
            format!(
                "Thank you for your order {code} totalling {}. Transfer and \
                 upload your payment proof at {} to get it moving.",
                format_amount(ctx.total),
                ctx.order_link(),
            ),
        ),
        OrderEvent::ProofUploaded => (
            format!("Payment proof received for {code}"),
            format!(
                "We received your payment proof for order {code} and will \
                 verify it shortly."
            ),
        ),
        OrderEvent::ProofApproved => (
            format!("Payment confirmed for {code}"),
            format!(
                "Your payment for order {code} has been verified. We're \
                 preparing your order now."
            ),
        ),
        OrderEvent::ProofRejected { notes } => (
            format!("Payment proof needs another look — {code}"),
            {
                let mut body = format!(
                    "We couldn't verify the payment proof for order {code}."
                );
                if let Some(notes) = notes.as_deref().filter(|n| !n.is_empty()) {
                    body.push_str(&format!(" Reviewer notes: {notes}."));
                }
                body.push_str(&format!(
                    " Please upload a new proof at {}.",
                    ctx.order_link()
                ));
                body
            },
        ),
        OrderEvent::Shipped {
            courier,
            tracking_number,
        } => (
            format!("Order {code} shipped"),
            {
                let mut body = format!("Your order {code} has shipped.");
                if let Some(courier) = courier.as_deref().filter(|c| !c.is_empty()) {
                    body.push_str(&format!(" Courier: {courier}."));
                }
                if let Some(tracking) = tracking_number.as_deref().filter(|t| !t.is_empty()) {
                    body.push_str(&format!(" Tracking number: {tracking}."));
                }
                body
            },
        ),
        OrderEvent::Completed => (
            format!("Order {code} completed"),
            format!(
                "Order {code} is complete. Thank you for supporting handmade!"
            ),
        ),
        OrderEvent::Cancelled => (
            format!("Order {code} cancelled"),
            format!(
                "Your order {code} has been cancelled. Contact us if this is \
                 unexpected."
            ),
        ),
    };

    let html = format!(
        "<p>Hi {name},</p><p>{body}</p><p>— The workshop</p>",
        name = ctx.customer_name
    );
    let text = format!("Hi {},\n\n{}\n\n— The workshop", ctx.customer_name, body);
    EmailContent {
        subject,
        html,
        text,
    }
}

/// WhatsApp ping to the shop admin when a proof lands in the review queue.
pub fn admin_proof_alert(ctx: &EventContext) -> String {
    format!(
        "Payment proof uploaded for order {} by {} ({}). Review it here: \
         {}/admin/payment-proofs",
        ctx.order_code,
        ctx.customer_name,
        format_amount(ctx.total),
        ctx.site_url.trim_end_matches('/'),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EventContext {
        EventContext {
            order_code: "TY-000001".into(),
            customer_name: "Sari".into(),
            total: 15_000_000,
            site_url: "https://shop.example/".into(),
        }
    }

    #[test]
    fn amount_formatting_groups_thousands() {
        assert_eq!(format_amount(15_000_000), "Rp 150.000");
        assert_eq!(format_amount(100), "Rp 1");
        assert_eq!(format_amount(0), "Rp 0");
        assert_eq!(format_amount(123_456_789_00), "Rp 123.456.789");
    }

    #[test]
    fn rejected_template_includes_notes_and_reupload_link() {
        let event = OrderEvent::ProofRejected {
            notes: Some("mismatched amount".into()),
        };
        let msg = whatsapp_message(&event, &ctx());
        assert!(msg.contains("TY-000001"));
        assert!(msg.contains("mismatched amount"));
        assert!(msg.contains("https://shop.example/orders/TY-000001"));

        let email = email_content(&event, &ctx());
        assert!(email.subject.contains("TY-000001"));
        assert!(email.text.contains("mismatched amount"));
    }

    #[test]
    fn rejected_template_omits_empty_notes() {
        let event = OrderEvent::ProofRejected { notes: None };
        let msg = whatsapp_message(&event, &ctx());
        assert!(!msg.contains("Reason"));
    }

    #[test]
    fn shipped_template_carries_tracking_info() {
        let event = OrderEvent::Shipped {
            courier: Some("JNE".into()),
            tracking_number: Some("JNE123456".into()),
        };
        let msg = whatsapp_message(&event, &ctx());
        assert!(msg.contains("JNE"));
        assert!(msg.contains("JNE123456"));

        let email = email_content(&event, &ctx());
        assert!(email.html.contains("JNE123456"));
        assert!(email.html.starts_with("<p>Hi Sari,</p>"));
    }

    #[test]
    fn admin_alert_names_order_and_amount() {
        let alert = admin_proof_alert(&ctx());
        assert!(alert.contains("TY-000001"));
        assert!(alert.contains("Rp 150.000"));
        assert!(alert.contains("Sari"));
    }
}
