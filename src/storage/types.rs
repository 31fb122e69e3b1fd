use serde::{Deserialize, Serialize};

/// A single memo as stored in a node's table and returned to clients.
///
/// The `id` is always assigned by the primary. Replicas only store ids they
/// were given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Memo {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// The user-supplied part of a memo: what a create or a full replace carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoDraft {
    pub title: String,
    pub body: String,
}

impl MemoDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn into_memo(self, id: u64) -> Memo {
        Memo {
            id,
            title: self.title,
            body: self.body,
        }
    }
}

/// A partial update.
///
/// `None` means "leave the field alone", `Some("")` means "overwrite with the
/// empty string". Absent fields are omitted when serialized so the difference
/// survives a hop to another node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl MemoPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }

    /// Overwrites every present field of `memo`.
    pub fn apply_to(&self, memo: &mut Memo) {
        if let Some(title) = &self.title {
            memo.title = title.clone();
        }
        if let Some(body) = &self.body {
            memo.body = body.clone();
        }
    }
}
