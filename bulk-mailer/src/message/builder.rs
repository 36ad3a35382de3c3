//! Provider message construction.
//!
//! [`SendParams`] holds everything that is shared by all batches of one
//! invocation; [`build`] combines it with a single [`Batch`] into the SendGrid
//! v3 `mail/send` payload.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::types::{BulkSendRequest, SenderOverride, DEFAULT_ATTACHMENT_TYPE};
use crate::batch::Batch;
use crate::error::BulkSendError;

/// Configured sender identity and list headers.
#[derive(Debug, Clone)]
pub struct SenderDefaults {
    pub email: Option<String>,
    pub name: String,
    pub list_unsubscribe: String,
}

// =============================================================================
// Wire Types (SendGrid v3 mail/send)
// =============================================================================

/// One provider call's worth of mail.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderMessage {
    pub from: EmailAddress,
    pub personalizations: Vec<Personalization>,
    pub categories: Vec<String>,
    pub headers: BTreeMap<String, String>,
    #[serde(flatten)]
    pub body: MessageBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentPayload>,
}

impl ProviderMessage {
    /// Number of recipients addressed by this message.
    pub fn recipient_count(&self) -> usize {
        self.personalizations.iter().map(|p| p.to.len()).sum()
    }
}

/// Message content: either a provider template or literal subject and body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Template {
        template_id: String,
    },
    Literal {
        subject: String,
        content: Vec<Content>,
    },
}

impl MessageBody {
    pub fn is_template(&self) -> bool {
        matches!(self, MessageBody::Template { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Personalization {
    pub to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_template_data: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentPayload {
    pub content: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub disposition: &'static str,
}

// =============================================================================
// Building
// =============================================================================

/// Batch-invariant parameters of one bulk send.
#[derive(Debug, Clone)]
pub struct SendParams {
    pub sender: EmailAddress,
    pub category: String,
    pub body: MessageBody,
    pub attachments: Vec<AttachmentPayload>,
    pub list_unsubscribe: String,
}

impl SendParams {
    /// Validate the request and resolve everything that does not vary per batch.
    pub fn from_request(
        request: &BulkSendRequest,
        defaults: &SenderDefaults,
    ) -> Result<Self, BulkSendError> {
        let body = match request.template_id() {
            Some(template_id) => MessageBody::Template {
                template_id: template_id.to_string(),
            },
            None => {
                let subject = request
                    .subject
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| BulkSendError::InvalidInput("Missing subject".to_string()))?;
                literal_body(subject, request.html.as_deref())
            }
        };

        let attachments = request
            .attachments
            .iter()
            .map(|a| AttachmentPayload {
                content: a.content.clone(),
                filename: a.filename.clone(),
                mime_type: a
                    .mime_type
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| DEFAULT_ATTACHMENT_TYPE.to_string()),
                disposition: "attachment",
            })
            .collect();

        Ok(Self {
            sender: resolve_sender(request.from.as_ref(), defaults)?,
            category: request.category.clone(),
            body,
            attachments,
            list_unsubscribe: defaults.list_unsubscribe.clone(),
        })
    }
}

/// Literal content: HTML when given, otherwise an empty plain-text part.
fn literal_body(subject: &str, html: Option<&str>) -> MessageBody {
    let content = match html.filter(|h| !h.is_empty()) {
        Some(html) => Content {
            content_type: "text/html".to_string(),
            value: html.to_string(),
        },
        None => Content {
            content_type: "text/plain".to_string(),
            value: String::new(),
        },
    };

    MessageBody::Literal {
        subject: subject.to_string(),
        content: vec![content],
    }
}

/// Resolve the sender, falling back to defaults field by field.
pub fn resolve_sender(
    requested: Option<&SenderOverride>,
    defaults: &SenderDefaults,
) -> Result<EmailAddress, BulkSendError> {
    let pick = |field: Option<&String>| {
        field
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };

    let email = pick(requested.and_then(|r| r.email.as_ref()))
        .or_else(|| pick(defaults.email.as_ref()))
        .ok_or_else(|| {
            BulkSendError::Configuration(
                "No sender email: set FROM_EMAIL or pass from.email".to_string(),
            )
        })?;

    let name = pick(requested.and_then(|r| r.name.as_ref())).unwrap_or_else(|| defaults.name.clone());

    Ok(EmailAddress {
        email,
        name: Some(name),
    })
}

/// Build the provider message for one batch.
pub fn build(params: &SendParams, batch: &Batch<'_>) -> ProviderMessage {
    let with_vars = params.body.is_template();

    let personalizations = batch
        .recipients
        .iter()
        .map(|r| Personalization {
            to: vec![EmailAddress {
                email: r.email.clone(),
                name: r.name.clone().filter(|n| !n.is_empty()),
            }],
            dynamic_template_data: with_vars.then(|| r.vars.clone().unwrap_or_default()),
        })
        .collect();

    let mut headers = BTreeMap::new();
    headers.insert(
        "List-Unsubscribe".to_string(),
        params.list_unsubscribe.clone(),
    );

    ProviderMessage {
        from: params.sender.clone(),
        personalizations,
        categories: vec![params.category.clone()],
        headers,
        body: params.body.clone(),
        attachments: params.attachments.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::types::{Attachment, Recipient};
    use serde_json::json;

    fn defaults() -> SenderDefaults {
        SenderDefaults {
            email: Some("noreply@example.com".to_string()),
            name: "Your App".to_string(),
            list_unsubscribe: "<mailto:unsub@example.com>".to_string(),
        }
    }

    fn request(value: Value) -> BulkSendRequest {
        serde_json::from_value(value).unwrap()
    }

    fn recipients() -> Vec<Recipient> {
        vec![
            Recipient {
                email: "a@example.com".to_string(),
                name: Some("Ada".to_string()),
                vars: Some(json!({"first": "Ada"}).as_object().unwrap().clone()),
            },
            Recipient::new("b@example.com"),
        ]
    }

    #[test]
    fn test_template_message_has_no_literal_content() {
        let req = request(json!({"templateId": "d-42", "subject": "ignored", "html": "<p>x</p>"}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = recipients();
        let batch = Batch::new(0, &recipients);

        let message = build(&params, &batch);
        let wire = serde_json::to_value(&message).unwrap();

        assert_eq!(wire["template_id"], "d-42");
        assert!(wire.get("subject").is_none());
        assert!(wire.get("content").is_none());
        assert_eq!(wire["personalizations"][0]["dynamic_template_data"], json!({"first": "Ada"}));
        // Missing vars default to an empty object.
        assert_eq!(wire["personalizations"][1]["dynamic_template_data"], json!({}));
    }

    #[test]
    fn test_literal_message_with_html() {
        let req = request(json!({"subject": "Hello", "html": "<p>Hi</p>"}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = recipients();

        let message = build(&params, &Batch::new(0, &recipients));
        let wire = serde_json::to_value(&message).unwrap();

        assert_eq!(wire["subject"], "Hello");
        assert_eq!(wire["content"], json!([{"type": "text/html", "value": "<p>Hi</p>"}]));
        assert!(wire.get("template_id").is_none());
        assert!(wire["personalizations"][0].get("dynamic_template_data").is_none());
    }

    #[test]
    fn test_literal_message_without_html_is_blank_text() {
        let req = request(json!({"subject": "Ping", "html": ""}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();

        assert_eq!(
            params.body,
            MessageBody::Literal {
                subject: "Ping".to_string(),
                content: vec![Content {
                    content_type: "text/plain".to_string(),
                    value: String::new(),
                }],
            }
        );
    }

    #[test]
    fn test_literal_requires_subject() {
        let req = request(json!({"html": "<p>Hi</p>"}));
        let err = SendParams::from_request(&req, &defaults()).unwrap_err();

        assert!(matches!(err, BulkSendError::InvalidInput(ref m) if m == "Missing subject"));
    }

    #[test]
    fn test_common_fields() {
        let req = request(json!({"subject": "Hello", "category": "promo"}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = recipients();

        let wire = serde_json::to_value(build(&params, &Batch::new(0, &recipients))).unwrap();

        assert_eq!(wire["from"], json!({"email": "noreply@example.com", "name": "Your App"}));
        assert_eq!(wire["categories"], json!(["promo"]));
        assert_eq!(wire["headers"]["List-Unsubscribe"], "<mailto:unsub@example.com>");
        assert_eq!(wire["personalizations"][0]["to"], json!([{"email": "a@example.com", "name": "Ada"}]));
        assert_eq!(wire["personalizations"][1]["to"], json!([{"email": "b@example.com"}]));
        assert!(wire.get("attachments").is_none());
    }

    #[test]
    fn test_blank_recipient_name_is_omitted() {
        let req = request(json!({"subject": "Hello"}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = vec![Recipient {
            email: "c@example.com".to_string(),
            name: Some(String::new()),
            vars: None,
        }];

        let message = build(&params, &Batch::new(0, &recipients));

        assert_eq!(message.personalizations[0].to[0].name, None);
        let wire = serde_json::to_value(&message).unwrap();
        assert_eq!(wire["personalizations"][0]["to"], json!([{"email": "c@example.com"}]));
    }

    #[test]
    fn test_attachments_copied_to_every_batch() {
        let mut req = request(json!({"subject": "Report"}));
        req.attachments = vec![Attachment {
            content: "aGVsbG8=".to_string(),
            filename: "hello.txt".to_string(),
            mime_type: None,
        }];
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = recipients();

        let first = build(&params, &Batch::new(0, &recipients[..1]));
        let second = build(&params, &Batch::new(1, &recipients[1..]));

        assert_eq!(first.attachments, second.attachments);
        assert_eq!(
            serde_json::to_value(&first.attachments).unwrap(),
            json!([{
                "content": "aGVsbG8=",
                "filename": "hello.txt",
                "type": "application/octet-stream",
                "disposition": "attachment"
            }])
        );
    }

    #[test]
    fn test_sender_fields_fall_back_independently() {
        let only_name = SenderOverride {
            email: None,
            name: Some("Newsletter".to_string()),
        };
        let sender = resolve_sender(Some(&only_name), &defaults()).unwrap();
        assert_eq!(sender.email, "noreply@example.com");
        assert_eq!(sender.name.as_deref(), Some("Newsletter"));

        let only_email = SenderOverride {
            email: Some("news@example.com".to_string()),
            name: Some(String::new()),
        };
        let sender = resolve_sender(Some(&only_email), &defaults()).unwrap();
        assert_eq!(sender.email, "news@example.com");
        assert_eq!(sender.name.as_deref(), Some("Your App"));
    }

    #[test]
    fn test_sender_without_any_email_is_configuration_error() {
        let defaults = SenderDefaults {
            email: None,
            ..defaults()
        };

        let err = resolve_sender(None, &defaults).unwrap_err();
        assert!(matches!(err, BulkSendError::Configuration(_)));
    }

    #[test]
    fn test_recipient_count() {
        let req = request(json!({"subject": "Hello"}));
        let params = SendParams::from_request(&req, &defaults()).unwrap();
        let recipients = recipients();

        assert_eq!(build(&params, &Batch::new(0, &recipients)).recipient_count(), 2);
    }
}
