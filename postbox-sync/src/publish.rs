//! The publish engine: staged intent in, durable remote snapshot out.
//!
//! ## Publish cycle
//!
//! 1. Fetch the remote snapshot. The cached one is never published against.
//! 2. Upload every local image of every pending add, one at a time. A failed
//!    upload drops that image from its post and the cycle carries on.
//! 3. Merge staging onto the fetched posts ([`crate::merge::merge`]).
//! 4. Write under the fetched version token. On conflict, back off
//!    `attempt × step`, re-fetch, re-merge and try again, up to
//!    `max_attempts` writes in total.
//! 5. On success the staging sets are cleared and the written list becomes
//!    the cached snapshot. On any failure staging is left exactly as it was.
//!
//! Steps 1 and 4 are strictly sequential for a given attempt: the write is
//! conditioned on the token observed by the fetch just before it.

use chrono::Utc;
use postbox_core::{Post, RetryConfig, Snapshot, VersionToken};
use postbox_store::{ContentStore, RemoteDocuments, StoreError};

use crate::error::PublishError;
use crate::merge::merge;
use crate::staging::{PendingAdd, Staging};
use crate::status::{StatusEvent, StatusKind, StatusSender};

/// Outcome of [`PublishEngine::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// The cached snapshot now matches the remote.
    Fresh,
    /// The fetch failed; the previous snapshot is still being shown.
    Cached { reason: String },
}

/// What a successful publish did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub added: usize,
    pub deleted: usize,
    pub reordered: bool,
    pub images_attempted: usize,
    pub images_uploaded: usize,
    /// Write attempts made, including the successful one. Zero when there
    /// was nothing to publish.
    pub attempts: u32,
    pub version: Option<VersionToken>,
    /// The list now on the remote.
    pub posts: Vec<Post>,
}

impl PublishReport {
    pub fn images_failed(&self) -> usize {
        self.images_attempted - self.images_uploaded
    }
}

pub struct PublishEngine<S> {
    documents: RemoteDocuments<S>,
    retry: RetryConfig,
    snapshot: Snapshot,
    status: Option<StatusSender>,
}

impl<S: ContentStore> PublishEngine<S> {
    pub fn new(documents: RemoteDocuments<S>, retry: RetryConfig) -> Self {
        Self {
            documents,
            retry,
            snapshot: Snapshot::empty(),
            status: None,
        }
    }

    /// Also report progress as [`StatusEvent`]s on `sender`.
    pub fn with_status(mut self, sender: StatusSender) -> Self {
        self.status = Some(sender);
        self
    }

    /// The last snapshot fetched or written.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn documents(&self) -> &RemoteDocuments<S> {
        &self.documents
    }

    /// Re-read the remote document, keeping the cached snapshot on failure.
    pub async fn refresh(&mut self) -> Refresh {
        self.notify(StatusKind::Loading, "LOADING POSTS...");
        match self.documents.fetch_snapshot().await {
            Ok(snapshot) => {
                tracing::debug!("refreshed snapshot: {} posts", snapshot.posts.len());
                self.snapshot = snapshot;
                self.notify(
                    StatusKind::Success,
                    format!("LOADED {} POSTS", self.snapshot.posts.len()),
                );
                Refresh::Fresh
            }
            Err(err) => {
                tracing::warn!("fetch failed, showing cached posts: {}", err);
                let reason = err.to_string();
                self.notify(StatusKind::Error, "COULD NOT LOAD POSTS, SHOWING CACHED COPY");
                Refresh::Cached { reason }
            }
        }
    }

    /// Publish everything staged in `staging`.
    ///
    /// Clears `staging` and rebases it on the written list on success; never
    /// touches it on failure.
    pub async fn publish(&mut self, staging: &mut Staging) -> Result<PublishReport, PublishError> {
        if !staging.has_pending_changes() {
            tracing::debug!("publish requested with nothing staged");
            return Ok(PublishReport {
                version: self.snapshot.version.clone(),
                posts: self.snapshot.posts.clone(),
                ..PublishReport::default()
            });
        }

        let result = self.run_cycle(staging).await;
        match &result {
            Ok(report) => {
                self.notify(
                    StatusKind::Success,
                    format!("PUBLISHED {} POSTS!", report.posts.len()),
                );
            }
            Err(err) => {
                tracing::error!("publish failed: {}", err);
                self.notify(StatusKind::Error, err.to_string());
            }
        }
        result
    }

    async fn run_cycle(&mut self, staging: &mut Staging) -> Result<PublishReport, PublishError> {
        self.notify(StatusKind::Loading, "FETCHING LATEST POSTS...");
        self.fetch_latest().await?;

        let (adds, images_attempted, images_uploaded) =
            self.resolve_images(staging.pending_adds()).await;

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let merged = merge(
                &self.snapshot.posts,
                &adds,
                staging.pending_deletes(),
                staging.pending_reorder(),
            );
            self.notify(
                StatusKind::Saving,
                format!("SAVING {} POSTS...", merged.len()),
            );

            let expected = self.snapshot.version.clone();
            match self.documents.write_snapshot(&merged, expected.as_ref()).await {
                Ok(version) => {
                    tracing::info!(
                        "published {} posts on attempt {} (version {})",
                        merged.len(),
                        attempt,
                        version
                    );
                    let summary = staging.summary();
                    self.snapshot = Snapshot {
                        posts: merged.clone(),
                        version: Some(version.clone()),
                    };
                    staging.commit(merged.clone());
                    return Ok(PublishReport {
                        added: summary.adds,
                        deleted: summary.deletes,
                        reordered: summary.reordered,
                        images_attempted,
                        images_uploaded,
                        attempts: attempt,
                        version: Some(version),
                        posts: merged,
                    });
                }
                Err(err) if err.is_conflict() => {
                    if attempt >= max_attempts {
                        tracing::warn!("conflict on attempt {}, retries exhausted", attempt);
                        return Err(PublishError::ConflictRetriesExhausted { attempts: attempt });
                    }
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        "conflict on attempt {}/{}, retrying in {:?}",
                        attempt,
                        max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    self.fetch_latest().await?;
                    attempt += 1;
                }
                Err(err) => return Err(write_failure(err)),
            }
        }
    }

    async fn fetch_latest(&mut self) -> Result<(), PublishError> {
        let snapshot = self.documents.fetch_snapshot().await.map_err(|err| {
            if err.is_unauthorized() {
                PublishError::Unauthorized(err.to_string())
            } else {
                PublishError::Fetch(err.to_string())
            }
        })?;
        self.snapshot = snapshot;
        Ok(())
    }

    /// Upload the local images of `adds` in staging order and return copies
    /// of the adds with the resulting URLs appended to each post's images.
    async fn resolve_images(&self, adds: &[PendingAdd]) -> (Vec<PendingAdd>, usize, usize) {
        let total: usize = adds.iter().map(|a| a.local_images.len()).sum();
        let stamp = Utc::now().timestamp_millis();
        let mut uploaded = 0;
        let mut done = 0;
        let mut resolved = Vec::with_capacity(adds.len());

        for (post_index, add) in adds.iter().enumerate() {
            let mut post = add.post.clone();
            for (image_index, image) in add.local_images.iter().enumerate() {
                done += 1;
                self.notify(
                    StatusKind::Uploading,
                    format!("UPLOADING IMAGE {done}/{total}..."),
                );
                let filename = format!(
                    "img-{stamp}-{post_index}-{image_index}.{}",
                    image.extension
                );
                match self.documents.upload_asset(&image.bytes, &filename).await {
                    Ok(url) => {
                        post.images.push(url);
                        uploaded += 1;
                    }
                    Err(err) => {
                        tracing::warn!("image {} for {} not uploaded: {}", filename, post.id, err);
                    }
                }
            }
            resolved.push(PendingAdd {
                post,
                local_images: Vec::new(),
            });
        }

        if total > 0 {
            tracing::info!("uploaded {}/{} images", uploaded, total);
        }
        (resolved, total, uploaded)
    }

    fn notify(&self, kind: StatusKind, message: impl Into<String>) {
        if let Some(sender) = &self.status {
            // A dropped receiver just means nobody is watching.
            let _ = sender.send(StatusEvent::new(kind, message));
        }
    }
}

fn write_failure(err: StoreError) -> PublishError {
    if err.is_unauthorized() {
        PublishError::Unauthorized(err.to_string())
    } else {
        PublishError::Write(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postbox_core::{Draft, LocalImage, RepoConfig};
    use postbox_store::MemoryStore;
    use tokio::sync::mpsc;

    fn engine(store: &MemoryStore) -> PublishEngine<MemoryStore> {
        PublishEngine::new(
            RemoteDocuments::new(store.clone(), RepoConfig::new("neon", "blog")),
            RetryConfig::default(),
        )
    }

    #[tokio::test]
    async fn nothing_staged_makes_no_requests() {
        let store = MemoryStore::with_writer("tok");
        let mut staging = Staging::default();
        let report = engine(&store).publish(&mut staging).await.expect("publish");
        assert_eq!(report.attempts, 0);
        assert_eq!(store.request_count(), 0);
    }

    #[tokio::test]
    async fn refresh_falls_back_to_cached_snapshot() {
        let store = MemoryStore::with_writer("tok");
        let mut engine = engine(&store);
        let mut staging = Staging::default();
        staging.stage_add(Draft::new("kept", "")).unwrap();
        engine.publish(&mut staging).await.expect("publish");

        store.fail_reads(1);
        let outcome = engine.refresh().await;
        assert!(matches!(outcome, Refresh::Cached { .. }));
        assert_eq!(engine.snapshot().posts.len(), 1);
        assert_eq!(engine.refresh().await, Refresh::Fresh);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_staging_alone() {
        let store = MemoryStore::with_writer("tok");
        store.fail_reads(1);
        let mut staging = Staging::default();
        staging.stage_add(Draft::new("x", "")).unwrap();
        let before = staging.clone();

        let err = engine(&store).publish(&mut staging).await.unwrap_err();
        assert!(matches!(err, PublishError::Fetch(_)));
        assert_eq!(staging, before);
    }

    #[tokio::test]
    async fn read_only_token_is_unauthorized() {
        let store = MemoryStore::new();
        store.grant("ro", "reader", false);
        let reader = store.authorized("ro".into());
        let mut staging = Staging::default();
        staging.stage_add(Draft::new("x", "")).unwrap();

        let err = engine(&reader).publish(&mut staging).await.unwrap_err();
        assert!(matches!(err, PublishError::Unauthorized(_)));
        assert!(staging.has_pending_changes());
    }

    #[tokio::test]
    async fn uploaded_images_are_attached_in_order() {
        let store = MemoryStore::with_writer("tok");
        let mut staging = Staging::default();
        let id = staging
            .stage_add(
                Draft::new("pics", "")
                    .with_local_image(LocalImage::new(vec![1], "jpg"))
                    .with_local_image(LocalImage::new(vec![2], "png")),
            )
            .unwrap();

        let report = engine(&store).publish(&mut staging).await.expect("publish");
        assert_eq!((report.images_attempted, report.images_uploaded), (2, 2));
        let post = report.posts.iter().find(|p| p.id == id).unwrap();
        assert_eq!(post.images.len(), 2);
        assert!(post.images[0].starts_with("memory://store/blog-images/img-"));
        assert!(post.images[0].ends_with("-0-0.jpg"));
        assert!(post.images[1].ends_with("-0-1.png"));
    }

    #[tokio::test]
    async fn status_events_trace_the_cycle() {
        let store = MemoryStore::with_writer("tok");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = engine(&store).with_status(tx);
        let mut staging = Staging::default();
        staging
            .stage_add(Draft::new("a", "").with_local_image(LocalImage::new(vec![0], "jpg")))
            .unwrap();

        engine.publish(&mut staging).await.expect("publish");
        drop(engine);

        let mut messages = Vec::new();
        while let Some(event) = rx.recv().await {
            messages.push((event.kind, event.message));
        }
        assert_eq!(
            messages,
            vec![
                (StatusKind::Loading, "FETCHING LATEST POSTS...".to_string()),
                (StatusKind::Uploading, "UPLOADING IMAGE 1/1...".to_string()),
                (StatusKind::Saving, "SAVING 1 POSTS...".to_string()),
                (StatusKind::Success, "PUBLISHED 1 POSTS!".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn report_counts_staged_changes() {
        let store = MemoryStore::with_writer("tok");
        let mut engine = engine(&store);
        let mut staging = Staging::default();
        let first = staging.stage_add(Draft::new("a", "")).unwrap();
        engine.publish(&mut staging).await.expect("first publish");

        staging.stage_delete(&first).unwrap();
        staging.stage_add(Draft::new("b", "")).unwrap();
        let report = engine.publish(&mut staging).await.expect("second publish");
        assert_eq!((report.added, report.deleted), (1, 1));
        assert!(!report.posts.iter().any(|p| p.id == first));
        assert_eq!(engine.snapshot().posts, report.posts);
        assert_eq!(staging.base(), report.posts.as_slice());
    }
}
