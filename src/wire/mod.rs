use serde::{Deserialize, Serialize};

/// ========================================
/// Model call wire types
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// One call to the hosted model: ordered messages plus sampling knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Concatenated system messages, for APIs that take the system prompt separately.
    pub fn system_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// A file cut out of the model reply. `content` always ends with exactly one newline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }

    /// Last path segment, separators normalized.
    pub fn file_name(&self) -> &str {
        let p = self.path.trim_end_matches(['/', '\\']);
        p.rsplit(['/', '\\']).next().unwrap_or(p)
    }

    /// Syntax tag used when previewing the file.
    pub fn language(&self) -> &'static str {
        let p = self.path.to_ascii_lowercase();
        if p.ends_with(".yml") || p.ends_with(".yaml") {
            "yaml"
        } else if p.ends_with(".gql") || p.ends_with(".dql") || p.ends_with(".sql") {
            "sql"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_text_joins_system_messages_only() {
        let req = CompletionRequest {
            model: "m".into(),
            messages: vec![
                ChatMessage::system("rules"),
                ChatMessage::user("hello"),
                ChatMessage::system("docs"),
            ],
            temperature: 0.3,
            max_tokens: 10,
        };
        assert_eq!(req.system_text().as_deref(), Some("rules\n\ndocs"));
        let json = serde_json::to_value(&req.messages[1]).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn file_name_and_language() {
        let f = GeneratedFile::new("Orders\\Feed/sql/load_orders.GQL", "x\n");
        assert_eq!(f.file_name(), "load_orders.GQL");
        assert_eq!(f.language(), "sql");
        assert_eq!(GeneratedFile::new("a/b.yaml", "").language(), "yaml");
        assert_eq!(GeneratedFile::new("README", "").language(), "");
    }
}
