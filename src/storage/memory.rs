use super::types::{Memo, MemoDraft, MemoPatch};

use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Default)]
struct Table {
    memos: BTreeMap<u64, Memo>,
    last_id: u64,
}

/// In-memory memo table shared by every handler of one node.
///
/// Every operation takes the single table lock for its whole read-modify-write
/// and releases it before returning, so callers never hold it across an await.
#[derive(Default)]
pub struct MemoStore {
    table: Mutex<Table>,
}

impl MemoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next id and stores the memo. Ids are never reused, even
    /// after the memo holding the current maximum is deleted.
    pub fn create(&self, draft: MemoDraft) -> Memo {
        let mut table = self.table.lock();
        table.last_id += 1;
        let memo = draft.into_memo(table.last_id);
        table.memos.insert(memo.id, memo.clone());
        memo
    }

    /// Stores a memo under an id chosen elsewhere (by the primary).
    ///
    /// The local counter is advanced so that a later local `create` can
    /// never collide with an adopted id.
    pub fn adopt(&self, memo: Memo) -> Memo {
        let mut table = self.table.lock();
        table.last_id = table.last_id.max(memo.id);
        table.memos.insert(memo.id, memo.clone());
        memo
    }

    pub fn get(&self, id: u64) -> Option<Memo> {
        self.table.lock().memos.get(&id).cloned()
    }

    /// All live memos in id order. An empty table yields an empty vec.
    pub fn list(&self) -> Vec<Memo> {
        self.table.lock().memos.values().cloned().collect()
    }

    /// Full replace. The id is preserved.
    pub fn update(&self, id: u64, draft: MemoDraft) -> Option<Memo> {
        let mut table = self.table.lock();
        let memo = table.memos.get_mut(&id)?;
        *memo = draft.into_memo(id);
        Some(memo.clone())
    }

    pub fn patch(&self, id: u64, patch: &MemoPatch) -> Option<Memo> {
        let mut table = self.table.lock();
        let memo = table.memos.get_mut(&id)?;
        patch.apply_to(memo);
        Some(memo.clone())
    }

    /// Returns `false` when no memo with `id` exists.
    pub fn delete(&self, id: u64) -> bool {
        self.table.lock().memos.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.table.lock().memos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest id ever assigned or adopted by this table.
    pub fn last_id(&self) -> u64 {
        self.table.lock().last_id
    }
}
