//! Merging staged changes onto a fresh remote post list.
//!
//! The remote list always comes from a fetch made inside the current publish
//! attempt, so posts added by other sessions since the admin's last view are
//! carried through untouched.

use std::collections::HashSet;

use postbox_core::{Post, PostId};

use crate::staging::{apply_order, PendingAdd};

/// Compute the post list to write.
///
/// 1. With a staged reorder, lay the remote posts out in that order; remote
///    posts the order does not name keep their relative order at the end.
/// 2. Drop every post whose id is staged for deletion.
/// 3. Prepend the adds, most recently staged first. An add whose id is
///    already on the remote (an earlier attempt that landed) is not inserted
///    twice.
///
/// Bodies always come from `remote`, never from a cached copy.
pub fn merge(
    remote: &[Post],
    adds: &[PendingAdd],
    deletes: &[PostId],
    reorder: Option<&[PostId]>,
) -> Vec<Post> {
    let ordered = match reorder {
        Some(order) => apply_order(remote, order),
        None => remote.to_vec(),
    };

    let deleted: HashSet<&PostId> = deletes.iter().collect();
    let kept: Vec<Post> = ordered
        .into_iter()
        .filter(|p| !deleted.contains(&p.id))
        .collect();

    let present: HashSet<&PostId> = remote.iter().map(|p| &p.id).collect();
    let mut merged: Vec<Post> = adds
        .iter()
        .rev()
        .filter(|a| !present.contains(&a.post.id))
        .map(|a| a.post.clone())
        .collect();
    merged.extend(kept);
    merged
}
