//! Store maintenance passes.
//!
//! The session-end purge deletes a user's secure messages but not the
//! chunks their attachments pointed at, so unreferenced chunk sets
//! accumulate (aborted uploads leave them behind too). This sweep is the
//! explicit, operator-invoked remedy; it is deliberately not part of any
//! lifecycle hook.

use std::collections::HashSet;

use tracing::info;

use aerie_shared::constants::{
    COLLECTION_FILE_CHUNKS, COLLECTION_MESSAGES, COLLECTION_SECURE_MESSAGES, MAX_BATCH_OPS,
};
use aerie_store::{DocumentStore, Query};

use crate::error::ChatError;

/// Delete every chunk whose file id no message in either channel
/// references. Returns the number of chunks removed.
pub async fn sweep_orphan_chunks<S: DocumentStore>(store: &S) -> Result<usize, ChatError> {
    let mut referenced: HashSet<String> = HashSet::new();
    for collection in [COLLECTION_MESSAGES, COLLECTION_SECURE_MESSAGES] {
        let docs = store.query(collection, &Query::new()).await?;
        referenced.extend(
            docs.iter()
                .filter_map(|doc| doc.body.get("fileId"))
                .filter_map(|v| v.as_str())
                .map(str::to_string),
        );
    }

    let chunks = store.query(COLLECTION_FILE_CHUNKS, &Query::new()).await?;
    let orphans: Vec<String> = chunks
        .iter()
        .filter(|doc| {
            doc.body
                .get("fileId")
                .and_then(|v| v.as_str())
                .map_or(true, |file_id| !referenced.contains(file_id))
        })
        .map(|doc| doc.id.clone())
        .collect();

    for batch in orphans.chunks(MAX_BATCH_OPS) {
        store.batch_delete(COLLECTION_FILE_CHUNKS, batch).await?;
    }

    info!(
        removed = orphans.len(),
        referenced_files = referenced.len(),
        "orphan chunk sweep complete"
    );
    Ok(orphans.len())
}
