use serde::{Deserialize, Serialize};

pub const COLOR_GOOD: &str = "good";
pub const COLOR_WARNING: &str = "warning";
pub const COLOR_DANGER: &str = "danger";

pub const ERROR_TITLE: &str = "Oh snap! Something went wrong!";

/// Who gets to see a response in the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Ephemeral,
    InChannel,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
}

/// Reply payload for both the HTTP response body and the callback POST.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "response_type")]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Response {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Response {
            visibility: Visibility::Ephemeral,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    pub fn in_channel(text: impl Into<String>) -> Self {
        Response {
            visibility: Visibility::InChannel,
            text: Some(text.into()),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Acknowledgement sent while a detached command keeps running.
    pub fn ack(first_word: &str) -> Self {
        Response::ephemeral(format!(
            "Roger that!  Message received!\r\nYour {first_word} request is in process!"
        ))
    }

    /// Error reply shown only to the caller.
    pub fn error(message: &str) -> Self {
        Response {
            visibility: Visibility::Ephemeral,
            text: None,
            attachments: vec![Attachment {
                title: Some(ERROR_TITLE.to_string()),
                text: Some(message.to_string()),
                color: Some(COLOR_DANGER.to_string()),
                ..Attachment::default()
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_uses_wire_names() {
        let body = serde_json::to_string(&Response::ephemeral("hi")).unwrap();
        assert!(body.contains("\"response_type\":\"ephemeral\""));
        let body = serde_json::to_string(&Response::in_channel("hi")).unwrap();
        assert!(body.contains("\"response_type\":\"in_channel\""));
    }

    #[test]
    fn empty_attachments_are_omitted() {
        let body = serde_json::to_string(&Response::ephemeral("hi")).unwrap();
        assert!(!body.contains("attachments"));
    }

    #[test]
    fn attachment_skips_absent_fields() {
        let response = Response::ephemeral("hi").with_attachment(Attachment {
            title: Some("t".to_string()),
            ..Attachment::default()
        });
        let body = serde_json::to_string(&response).unwrap();
        assert!(body.contains("\"attachments\":[{\"title\":\"t\"}]"));
    }

    #[test]
    fn ack_echoes_the_command_word() {
        let response = Response::ack("new");
        assert_eq!(
            response.text.as_deref(),
            Some("Roger that!  Message received!\r\nYour new request is in process!")
        );
        assert_eq!(response.visibility, Visibility::Ephemeral);
    }

    #[test]
    fn error_carries_a_danger_attachment() {
        let response = Response::error("boom");
        assert_eq!(response.visibility, Visibility::Ephemeral);
        assert_eq!(response.text, None);
        assert_eq!(response.attachments.len(), 1);
        let attachment = &response.attachments[0];
        assert_eq!(attachment.title.as_deref(), Some(ERROR_TITLE));
        assert_eq!(attachment.text.as_deref(), Some("boom"));
        assert_eq!(attachment.color.as_deref(), Some(COLOR_DANGER));
    }

    #[test]
    fn round_trips_through_json() {
        let response = Response::in_channel("done").with_attachment(Attachment {
            title: Some("<url|#7>: t".to_string()),
            color: Some(COLOR_GOOD.to_string()),
            mrkdwn_in: vec!["title".to_string()],
            ..Attachment::default()
        });
        let body = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&body).unwrap();
        assert_eq!(back, response);
    }
}
