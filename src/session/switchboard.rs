//! Owner of the single active provider.
//!
//! Authentication is asynchronous: the switchboard hands out an
//! [`AuthAttempt`] which the caller runs against the provider and reports back
//! with [`Switchboard::finish_auth`]. Every switch bumps the epoch, so results
//! that belong to a replaced provider can be recognized and dropped.

use std::sync::Arc;

use crate::error::SessionError;
use crate::model::AuthStatus;
use crate::provider::{Provider, ProviderFactory, ProviderKind};

/// Where credentials come from and where accepted ones go
pub trait CredentialStore: Send + Sync {
    fn credential(&self, kind: ProviderKind) -> Option<String>;
    fn store_credential(&mut self, kind: ProviderKind, credential: &str);
}

/// A credential to try against a specific provider instance
pub struct AuthAttempt {
    pub epoch: u64,
    pub provider: Arc<dyn Provider>,
    pub credential: String,
}

pub struct Switchboard {
    factory: Box<dyn ProviderFactory>,
    credentials: Box<dyn CredentialStore>,
    kind: ProviderKind,
    provider: Arc<dyn Provider>,
    epoch: u64,
    auth: AuthStatus,
}

impl Switchboard {
    pub fn new(
        factory: Box<dyn ProviderFactory>,
        credentials: Box<dyn CredentialStore>,
        initial: ProviderKind,
    ) -> Self {
        let provider = factory.create(initial);
        Self {
            factory,
            credentials,
            kind: initial,
            provider,
            epoch: 0,
            auth: AuthStatus::Unauthenticated,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn provider(&self) -> Arc<dyn Provider> {
        self.provider.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn auth_status(&self) -> AuthStatus {
        self.auth
    }

    /// Switches by name. Unknown names abort the switch and leave the current
    /// provider active.
    pub fn switch_to(&mut self, name: &str) -> Result<Option<AuthAttempt>, SessionError> {
        let kind = ProviderKind::from_name(name).ok_or_else(|| SessionError::UnknownProvider(name.to_string()))?;
        Ok(self.switch_kind(kind))
    }

    /// Replaces the active instance and prepares a login with the stored
    /// credential, if there is one
    pub fn switch_kind(&mut self, kind: ProviderKind) -> Option<AuthAttempt> {
        tracing::info!(from = %self.kind, to = %kind, "Switching provider");
        self.provider = self.factory.create(kind);
        self.kind = kind;
        self.epoch += 1;
        self.auth = AuthStatus::Unauthenticated;
        self.stored_attempt()
    }

    /// Login attempt with the stored credential of the active provider
    pub fn stored_attempt(&mut self) -> Option<AuthAttempt> {
        match self.credentials.credential(self.kind) {
            Some(credential) => Some(self.attempt(credential)),
            None => {
                tracing::info!(provider = %self.kind, "No stored credential");
                self.auth = AuthStatus::Unauthenticated;
                None
            }
        }
    }

    /// Prepares a login with a user-supplied credential. Naming another
    /// provider switches to it first; the flag reports whether that happened.
    pub fn authenticate(&mut self, name: &str, credential: &str) -> Result<(AuthAttempt, bool), SessionError> {
        let kind = ProviderKind::from_name(name).ok_or_else(|| SessionError::UnknownProvider(name.to_string()))?;
        let switched = kind != self.kind;
        if switched {
            self.switch_kind(kind);
        }
        Ok((self.attempt(credential.to_string()), switched))
    }

    /// Applies an authentication outcome. Returns `None` for attempts made
    /// against a provider that has since been replaced.
    pub fn finish_auth(&mut self, epoch: u64, credential: &str, accepted: bool) -> Option<bool> {
        if epoch != self.epoch {
            tracing::debug!(epoch, current = self.epoch, "Dropping stale auth result");
            return None;
        }

        if accepted {
            self.auth = AuthStatus::Authenticated;
            if self.credentials.credential(self.kind).as_deref() != Some(credential) {
                self.credentials.store_credential(self.kind, credential);
            }
            tracing::info!(provider = %self.kind, "Authorized");
        } else {
            self.auth = AuthStatus::Unauthenticated;
            tracing::warn!(provider = %self.kind, "Authorization required");
        }
        Some(accepted)
    }

    pub fn auth_error(&self) -> SessionError {
        SessionError::AuthFailure {
            provider: self.kind.name().to_string(),
        }
    }

    fn attempt(&mut self, credential: String) -> AuthAttempt {
        self.auth = AuthStatus::Authenticating;
        AuthAttempt {
            epoch: self.epoch,
            provider: self.provider.clone(),
            credential,
        }
    }
}
