use serde::{Deserialize, Serialize};

use crate::api::HistoryMessage;

/// Who authored a transcript entry. App-authored entries render locally but
/// are never transmitted to the chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    AppInfo,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::AppInfo => "app/info",
        }
    }

    /// The wire role, for roles the service accepts in `history`.
    pub fn to_api_role(self) -> Option<&'static str> {
        match self {
            Role::User => Some("user"),
            Role::Assistant => Some("assistant"),
            Role::AppInfo => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn app_info(content: impl Into<String>) -> Self {
        Self::new(Role::AppInfo, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Project the transcript onto the wire history shape, keeping only roles
/// the service accepts.
pub fn api_history<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<HistoryMessage> {
    messages
        .into_iter()
        .filter_map(|message| {
            message.role.to_api_role().map(|role| HistoryMessage {
                role: role.to_string(),
                content: message.content.clone(),
            })
        })
        .collect()
}
