use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Replied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Replied => "Replied",
        }
    }

    /// Upper-case label shown next to a request in list views.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Replied => "REPLIED",
        }
    }

    pub fn has_quotation(&self) -> bool {
        matches!(self, Self::Replied)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Replied" => Ok(Self::Replied),
            other => Err(format!("unknown request status `{other}`")),
        }
    }
}

/// A customer's ask for a price quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub id: RequestId,
    pub name: String,
    pub email: String,
    pub description: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl QuoteRequest {
    pub fn pending(
        name: impl Into<String>,
        email: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            name: name.into(),
            email: email.into(),
            description: description.into(),
            status: RequestStatus::Pending,
            created_at,
        }
    }

    /// Marks the request as answered. Replied requests never go back to pending.
    pub fn mark_replied(&mut self) {
        self.status = RequestStatus::Replied;
    }
}
