/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Row id of a stored link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub i64);

/// One stored original -> short mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkRecord {
    pub id: LinkId,
    pub requester: UserId,
    pub original_url: String,
    pub short_url: String,
}
