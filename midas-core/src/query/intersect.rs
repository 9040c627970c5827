//! Galloping AND intersection over posting cursors.
//!
//! Cursors are ordered shortest-first; a candidate doc-id is pushed through
//! every cursor's `seek`, restarting whenever a cursor overshoots. Each seek
//! rides the skip tables, so long lists decode only the chunks that can
//! still contain the candidate.

use super::cursor::PostingCursor;
use crate::error::Result;
use crate::{DocId, TERMINATED};

/// Intersect all cursors; returns the ordered doc-ids present in every one.
pub fn intersect(cursors: &mut [PostingCursor]) -> Result<Vec<DocId>> {
    if cursors.is_empty() {
        return Ok(Vec::new());
    }
    // Shortest list drives the candidates (chunk count orders list lengths
    // to within one chunk)
    cursors.sort_by_key(|c| c.chunk_count());

    let mut results = Vec::new();
    let mut candidate = cursors[0].doc()?;

    'outer: while candidate != TERMINATED {
        let mut i = 0;
        while i < cursors.len() {
            let doc = cursors[i].seek(candidate)?;
            if doc == TERMINATED {
                break 'outer;
            }
            if doc > candidate {
                // Overshoot: adopt the larger candidate, restart the scan
                candidate = doc;
                i = 0;
                continue;
            }
            i += 1;
        }
        results.push(candidate);
        candidate = cursors[0].advance()?;
    }

    Ok(results)
}
