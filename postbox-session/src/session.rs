//! Session state: logged out, or logged in with a full admin context.
//!
//! ```text
//! LoggedOut --login(credentials ok, token ok)--> LoggedIn
//! LoggedIn  --logout | set_session_active(false)--> LoggedOut
//! LoggedIn  --publish rejected as unauthorized--> LoggedOut
//! ```
//!
//! There is no partial state: either an [`AdminContext`] exists (token,
//! engine, staging) or none of it does.

use postbox_core::Config;
use postbox_store::{AccessToken, ContentStore, Identity, RemoteDocuments};
use postbox_sync::{PublishEngine, PublishError, PublishReport, Refresh, Staging, StatusSender};

use crate::error::{GateError, SessionError};
use crate::gate::{verify_credentials, verify_write_token};

/// Everything that exists only while an admin is logged in.
pub struct AdminContext<S> {
    identity: Identity,
    engine: PublishEngine<S>,
    staging: Staging,
}

impl<S: ContentStore> AdminContext<S> {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    pub fn staging_mut(&mut self) -> &mut Staging {
        &mut self.staging
    }

    pub fn engine(&self) -> &PublishEngine<S> {
        &self.engine
    }
}

/// One admin session against one repository.
///
/// `store` is the anonymous handle; the token-bound one only exists inside
/// the [`AdminContext`].
pub struct Session<S> {
    store: S,
    config: Config,
    status: Option<StatusSender>,
    active: Option<AdminContext<S>>,
}

impl<S: ContentStore> Session<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            config,
            status: None,
            active: None,
        }
    }

    /// Forward publish progress of future logins to `sender`.
    pub fn with_status(mut self, sender: StatusSender) -> Self {
        self.status = Some(sender);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn context(&self) -> Option<&AdminContext<S>> {
        self.active.as_ref()
    }

    pub fn context_mut(&mut self) -> Result<&mut AdminContext<S>, SessionError> {
        self.active.as_mut().ok_or(SessionError::LoggedOut)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|ctx| ctx.staging.has_pending_changes())
    }

    /// Run both checks and, if they pass, open the admin context.
    ///
    /// The credential digest is checked first so a wrong password never
    /// reaches the network. The initial fetch falls back to an empty view
    /// rather than failing the login.
    pub async fn login(
        &mut self,
        username: &str,
        secret: &str,
        token: AccessToken,
    ) -> Result<&Identity, SessionError> {
        self.logout();

        if !verify_credentials(&self.config.admin, username, secret) {
            return Err(GateError::BadCredentials.into());
        }
        let identity = verify_write_token(&self.store, &token).await?;

        let documents = RemoteDocuments::new(self.store.authorized(token), self.config.repo.clone());
        let mut engine = PublishEngine::new(documents, self.config.retry.clone());
        if let Some(sender) = &self.status {
            engine = engine.with_status(sender.clone());
        }
        if let Refresh::Cached { reason } = engine.refresh().await {
            tracing::warn!(%reason, "initial fetch failed; starting from an empty view");
        }
        let staging = Staging::new(engine.snapshot().posts.clone());

        tracing::info!(login = %identity.login, "admin session opened");
        let ctx = self.active.insert(AdminContext {
            identity,
            engine,
            staging,
        });
        Ok(&ctx.identity)
    }

    /// Close the session, discarding staged changes and the token.
    pub fn logout(&mut self) {
        if let Some(mut ctx) = self.active.take() {
            let pending = ctx.staging.summary();
            ctx.staging.discard_all();
            tracing::info!(
                login = %ctx.identity.login,
                discarded_adds = pending.adds,
                discarded_deletes = pending.deletes,
                "admin session closed"
            );
        }
    }

    /// Turning the session off is a logout. Turning it on only happens via
    /// [`Session::login`], so `true` leaves the current state as is.
    pub fn set_session_active(&mut self, active: bool) {
        if !active {
            self.logout();
        }
    }

    /// Re-read the remote and rebase the working view on it. Staged adds are
    /// kept; deletes of posts the remote already dropped are forgotten.
    pub async fn refresh(&mut self) -> Result<Refresh, SessionError> {
        let ctx = self.context_mut()?;
        let outcome = ctx.engine.refresh().await;
        if outcome == Refresh::Fresh {
            let posts = ctx.engine.snapshot().posts.clone();
            ctx.staging.rebase(posts);
        }
        Ok(outcome)
    }

    /// Publish the staged changes. A token the store no longer accepts ends
    /// the session.
    pub async fn publish(&mut self) -> Result<PublishReport, SessionError> {
        let ctx = self.context_mut()?;
        match ctx.engine.publish(&mut ctx.staging).await {
            Ok(report) => Ok(report),
            Err(err @ PublishError::Unauthorized(_)) => {
                tracing::warn!("token rejected during publish; logging out");
                self.logout();
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }
}
