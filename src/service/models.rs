pub use uuid::Uuid;

/// Outcome of one sync run, counted in record sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub zone: String,
    pub dry_run: bool,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}
