//! Local staging — the admin's unpublished changes layered over the last
//! known remote posts.
//!
//! Three disjoint sets:
//! - pending adds (drafts with ids, newest shown first)
//! - pending deletes (ids of published posts, reversible until publish)
//! - pending reorder (a permutation of published ids)
//!
//! Reorder is an exclusive mode: it cannot be staged alongside adds or
//! deletes. Every operation here is synchronous and never touches the
//! network; the working view is recomputed from the sets on each call.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use postbox_core::{dates, Draft, LocalImage, Post, PostId};

use crate::error::StagingError;

/// A staged new post and the image bytes it still needs uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAdd {
    pub post: Post,
    pub local_images: Vec<LocalImage>,
}

/// How an entry of the working view differs from the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Published,
    Added,
    MarkedForDeletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingEntry {
    pub post: Post,
    pub state: EntryState,
}

/// Result of [`Staging::stage_delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The id was an unpublished draft; it is gone entirely.
    DiscardedDraft,
    /// The published post will be removed on the next publish.
    Marked,
}

/// Counts for a publish confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingSummary {
    pub adds: usize,
    pub deletes: usize,
    pub reordered: bool,
    pub local_images: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Staging {
    base: Vec<Post>,
    adds: Vec<PendingAdd>,
    deletes: Vec<PostId>,
    reorder: Option<Vec<PostId>>,
    last_id_millis: i64,
}

impl Staging {
    /// Empty staging over `base`, the last known remote posts.
    pub fn new(base: Vec<Post>) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Replace the remote baseline (after a fetch). Adds are kept; deletes and
    /// reorder entries for posts the remote no longer has are dropped.
    pub fn rebase(&mut self, base: Vec<Post>) {
        self.base = base;
        let known: HashSet<&PostId> = self.base.iter().map(|p| &p.id).collect();
        self.deletes.retain(|id| known.contains(id));
        if let Some(order) = self.reorder.as_mut() {
            order.retain(|id| known.contains(id));
            if order.is_empty() {
                self.reorder = None;
            }
        }
    }

    pub fn base(&self) -> &[Post] {
        &self.base
    }

    pub fn pending_adds(&self) -> &[PendingAdd] {
        &self.adds
    }

    pub fn pending_deletes(&self) -> &[PostId] {
        &self.deletes
    }

    pub fn pending_reorder(&self) -> Option<&[PostId]> {
        self.reorder.as_deref()
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Assign a fresh id and date to `draft` and stage it.
    pub fn stage_add(&mut self, draft: Draft) -> Result<PostId, StagingError> {
        if self.reorder.is_some() {
            return Err(StagingError::ReorderActive);
        }
        let id = self.next_id();
        let (post, local_images) = draft.into_post(id.clone(), dates::today());
        tracing::debug!("staged add {} ({})", id, post.title);
        self.adds.push(PendingAdd { post, local_images });
        Ok(id)
    }

    /// Stage removal of `id`. Deleting a draft discards it outright;
    /// deleting a published post marks it until undone or published.
    pub fn stage_delete(&mut self, id: &PostId) -> Result<DeleteOutcome, StagingError> {
        if self.reorder.is_some() {
            return Err(StagingError::ReorderActive);
        }
        if let Some(index) = self.adds.iter().position(|a| &a.post.id == id) {
            self.adds.remove(index);
            tracing::debug!("discarded draft {}", id);
            return Ok(DeleteOutcome::DiscardedDraft);
        }
        if !self.base.iter().any(|p| &p.id == id) {
            return Err(StagingError::UnknownPost(id.clone()));
        }
        if !self.deletes.contains(id) {
            self.deletes.push(id.clone());
        }
        tracing::debug!("marked {} for deletion", id);
        Ok(DeleteOutcome::Marked)
    }

    /// Undo a staged delete. Returns `false` if `id` was not marked.
    pub fn unstage_delete(&mut self, id: &PostId) -> bool {
        let before = self.deletes.len();
        self.deletes.retain(|d| d != id);
        before != self.deletes.len()
    }

    /// Stage a new display order for published posts. Later calls replace
    /// earlier ones. Posts not named keep their relative order after the
    /// named ones.
    pub fn stage_reorder(&mut self, order: Vec<PostId>) -> Result<(), StagingError> {
        if !self.adds.is_empty() || !self.deletes.is_empty() {
            return Err(StagingError::EditsPending);
        }
        let mut seen = HashSet::with_capacity(order.len());
        for id in &order {
            if !self.base.iter().any(|p| &p.id == id) {
                return Err(StagingError::UnknownPost(id.clone()));
            }
            if !seen.insert(id) {
                return Err(StagingError::DuplicateInOrder(id.clone()));
            }
        }
        self.reorder = Some(order);
        Ok(())
    }

    /// Leave reorder mode without publishing. Returns `false` if none was staged.
    pub fn cancel_reorder(&mut self) -> bool {
        self.reorder.take().is_some()
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.adds.is_empty() || !self.deletes.is_empty() || self.reorder.is_some()
    }

    /// Drop every staged change (logout, cancel).
    pub fn discard_all(&mut self) {
        self.adds.clear();
        self.deletes.clear();
        self.reorder = None;
    }

    pub fn summary(&self) -> PendingSummary {
        PendingSummary {
            adds: self.adds.len(),
            deletes: self.deletes.len(),
            reordered: self.reorder.is_some(),
            local_images: self.adds.iter().map(|a| a.local_images.len()).sum(),
        }
    }

    /// What the admin sees: drafts newest-first, then published posts in
    /// their (possibly staged) order, with marked deletions still present.
    pub fn working_view(&self) -> Vec<WorkingEntry> {
        let mut view: Vec<WorkingEntry> = self
            .adds
            .iter()
            .rev()
            .map(|a| WorkingEntry {
                post: a.post.clone(),
                state: EntryState::Added,
            })
            .collect();

        let ordered = match &self.reorder {
            Some(order) => apply_order(&self.base, order),
            None => self.base.clone(),
        };
        view.extend(ordered.into_iter().map(|post| {
            let state = if self.deletes.contains(&post.id) {
                EntryState::MarkedForDeletion
            } else {
                EntryState::Published
            };
            WorkingEntry { post, state }
        }));
        view
    }

    /// Clear all staged sets and adopt `published` as the new baseline.
    pub(crate) fn commit(&mut self, published: Vec<Post>) {
        self.discard_all();
        self.base = published;
    }

    /// `post-<unix millis>`, strictly increasing within this staging and
    /// never equal to an id already in view.
    fn next_id(&mut self) -> PostId {
        let mut millis = Utc::now().timestamp_millis().max(self.last_id_millis + 1);
        loop {
            let candidate = PostId(format!("post-{millis}"));
            let taken = self.base.iter().any(|p| p.id == candidate)
                || self.adds.iter().any(|a| a.post.id == candidate);
            if !taken {
                self.last_id_millis = millis;
                return candidate;
            }
            millis += 1;
        }
    }
}

/// `order` first (ids missing from `posts` are skipped), then every post of
/// `posts` that `order` did not name, in original order.
pub(crate) fn apply_order(posts: &[Post], order: &[PostId]) -> Vec<Post> {
    let mut by_id: HashMap<&PostId, &Post> = posts.iter().map(|p| (&p.id, p)).collect();
    let mut out = Vec::with_capacity(posts.len());
    for id in order {
        if let Some(post) = by_id.remove(id) {
            out.push(post.clone());
        }
    }
    out.extend(
        posts
            .iter()
            .filter(|p| by_id.contains_key(&p.id))
            .cloned(),
    );
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
