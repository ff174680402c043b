//! Login checks.
//!
//! **The credential check is cosmetic.** The reference digests live in the
//! client's own config, so anyone holding the client can read them or skip
//! the check. It keeps casual visitors out of the admin screen and nothing
//! more. The real access boundary is the write token: the store refuses any
//! write the token is not scoped for, whatever this module decides.

use postbox_core::AdminConfig;
use postbox_store::{AccessToken, ContentStore, Identity, StoreError};
use sha2::{Digest, Sha256};

use crate::error::GateError;

/// Lower-case hex SHA-256 of `input`.
pub fn digest_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// `true` iff both strings hash to the configured reference digests.
pub fn verify_credentials(admin: &AdminConfig, username: &str, secret: &str) -> bool {
    let user_ok = digest_matches(username, &admin.username_digest);
    let secret_ok = digest_matches(secret, &admin.secret_digest);
    if !(user_ok && secret_ok) {
        tracing::info!("credential check failed");
    }
    user_ok && secret_ok
}

fn digest_matches(input: &str, reference: &str) -> bool {
    let actual = digest_hex(input);
    let reference = reference.trim().to_ascii_lowercase();
    constant_time_eq::constant_time_eq(actual.as_bytes(), reference.as_bytes())
}

/// Check that `token` authenticates and may push to the configured repository.
pub async fn verify_write_token<S: ContentStore>(
    store: &S,
    token: &AccessToken,
) -> Result<Identity, GateError> {
    if token.expose().trim().is_empty() {
        return Err(GateError::InvalidToken);
    }

    let identity = store.identity(token).await.map_err(token_check_error)?;
    let access = store
        .repository_access(token)
        .await
        .map_err(token_check_error)?;

    if !access.push {
        tracing::warn!(login = %identity.login, "token lacks push permission");
        return Err(GateError::NoWriteAccess {
            login: identity.login,
        });
    }
    tracing::info!(login = %identity.login, "write token verified");
    Ok(identity)
}

fn token_check_error(err: StoreError) -> GateError {
    if err.is_unauthorized() {
        GateError::InvalidToken
    } else {
        tracing::warn!(error = %err, "token check failed");
        GateError::TokenCheckFailed(err.to_string())
    }
}
