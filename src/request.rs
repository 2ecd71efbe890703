use url::form_urlencoded;
use uuid::Uuid;

/// One inbound slash-command invocation, as the chat platform posts it.
///
/// Fields arrive `application/x-www-form-urlencoded`; anything the platform
/// adds beyond this set is ignored. An empty `response_url` means the caller
/// offered no callback channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlashRequest {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: Option<String>,
}

impl SlashRequest {
    pub fn from_form(body: &[u8]) -> Self {
        let mut request = SlashRequest::default();
        for (key, value) in form_urlencoded::parse(body) {
            match key.as_ref() {
                "token" => request.token = value.into_owned(),
                "team_id" => request.team_id = value.into_owned(),
                "team_domain" => request.team_domain = value.into_owned(),
                "channel_id" => request.channel_id = value.into_owned(),
                "channel_name" => request.channel_name = value.into_owned(),
                "user_id" => request.user_id = value.into_owned(),
                "user_name" => request.user_name = value.into_owned(),
                "command" => request.command = value.into_owned(),
                "text" => request.text = value.into_owned(),
                "response_url" => {
                    if !value.is_empty() {
                        request.response_url = Some(value.into_owned());
                    }
                }
                _ => {}
            }
        }
        request
    }

    /// One line per invocation. The token never reaches the log.
    pub fn log(&self, request_id: Uuid) {
        tracing::info!(
            "request {request_id}: {} from {}@{} in #{} text={:?} callback={}",
            self.command,
            self.user_name,
            self.team_domain,
            self.channel_name,
            self.text,
            self.response_url.is_some(),
        );
    }
}
