use serde::Serialize;

/// Kind of a completed store mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationOp {
    Create,
    Edit,
    Delete,
    BatchDelete,
}

/// Change notification published on a store's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreEvent {
    /// The cached list was replaced.
    ListReplaced { total_count: u32 },
    /// The cached detail was replaced.
    DetailReplaced { id: String },
    /// A create/edit/delete succeeded. The cache is left as is.
    Mutated { op: MutationOp, id: Option<String> },
    /// A modal form submitted successfully; views should re-fetch.
    RefreshRequested,
}

impl StoreEvent {
    /// Whether a subscribed view should re-issue its request.
    pub fn requests_refresh(&self) -> bool {
        matches!(self, Self::Mutated { .. } | Self::RefreshRequested)
    }
}
