use std::collections::HashMap;

pub use taskdesk_shared::Role;
use tracing::{
  debug,
  info,
  warn
};

use crate::error::StoreError;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
)]
pub enum SessionKey {
  Token,
  UserEmail,
  UserRole
}

impl SessionKey {
  pub const ALL: [SessionKey; 3] = [
    SessionKey::Token,
    SessionKey::UserEmail,
    SessionKey::UserRole
  ];

  /// Key name shared with the sign-in
  /// flow that writes the session.
  pub fn as_str(self) -> &'static str {
    match self {
      | SessionKey::Token => "token",
      | SessionKey::UserEmail => {
        "userEmail"
      }
      | SessionKey::UserRole => {
        "userRole"
      }
    }
  }
}

/// Persistent key-value store holding
/// the session written at sign-in.
pub trait SessionStore {
  fn get(
    &self,
    key: SessionKey
  ) -> Option<String>;

  fn set(
    &mut self,
    key: SessionKey,
    value: &str
  ) -> Result<(), StoreError>;

  fn remove(
    &mut self,
    key: SessionKey
  ) -> Result<(), StoreError>;
}

#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct Session {
  token:      String,
  user_email: String,
  role:       Role
}

impl Session {
  pub fn new(
    token: impl Into<String>,
    user_email: impl Into<String>,
    role: Role
  ) -> Self {
    Self {
      token: token.into(),
      user_email: user_email.into(),
      role
    }
  }

  /// `None` when no usable token is
  /// stored.
  pub fn read(
    store: &impl SessionStore
  ) -> Option<Self> {
    let token = store
      .get(SessionKey::Token)
      .filter(|token| {
        !token.trim().is_empty()
      })?;
    let user_email = store
      .get(SessionKey::UserEmail)
      .unwrap_or_default();
    let role = store
      .get(SessionKey::UserRole)
      .map(|raw| Role::parse(&raw))
      .unwrap_or_default();

    debug!(
      role = role.as_str(),
      has_email = !user_email.is_empty(),
      "read session"
    );

    Some(Self {
      token,
      user_email,
      role
    })
  }

  pub fn save(
    &self,
    store: &mut impl SessionStore
  ) -> Result<(), StoreError> {
    store.set(
      SessionKey::Token,
      &self.token
    )?;
    store.set(
      SessionKey::UserEmail,
      &self.user_email
    )?;
    store.set(
      SessionKey::UserRole,
      self.role.as_str()
    )?;
    info!(
      role = self.role.as_str(),
      "stored session"
    );
    Ok(())
  }

  pub fn token(&self) -> &str {
    &self.token
  }

  pub fn user_email(&self) -> &str {
    &self.user_email
  }

  pub fn role(&self) -> Role {
    self.role
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

/// Removes all three session keys. Keeps
/// going past individual failures so a
/// half-cleared session never survives
/// as a usable token.
pub fn clear_session(
  store: &mut impl SessionStore
) {
  for key in SessionKey::ALL {
    if let Err(error) = store.remove(key)
    {
      warn!(
        key = key.as_str(),
        %error,
        "failed to remove session key"
      );
    }
  }
  info!("session cleared");
}

#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
  values: HashMap<SessionKey, String>
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

impl SessionStore for MemorySessionStore {
  fn get(
    &self,
    key: SessionKey
  ) -> Option<String> {
    self.values.get(&key).cloned()
  }

  fn set(
    &mut self,
    key: SessionKey,
    value: &str
  ) -> Result<(), StoreError> {
    self
      .values
      .insert(key, value.to_string());
    Ok(())
  }

  fn remove(
    &mut self,
    key: SessionKey
  ) -> Result<(), StoreError> {
    self.values.remove(&key);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_token_means_no_session() {
    let mut store =
      MemorySessionStore::new();
    store
      .set(
        SessionKey::UserEmail,
        "ana@example.com"
      )
      .unwrap();
    assert!(Session::read(&store).is_none());

    store
      .set(SessionKey::Token, "  ")
      .unwrap();
    assert!(Session::read(&store).is_none());
  }

  #[test]
  fn unknown_role_reads_as_user() {
    let mut store =
      MemorySessionStore::new();
    store
      .set(SessionKey::Token, "abc")
      .unwrap();
    store
      .set(
        SessionKey::UserRole,
        "superuser"
      )
      .unwrap();

    let session =
      Session::read(&store).unwrap();
    assert_eq!(session.role(), Role::User);
    assert_eq!(session.user_email(), "");
  }

  #[test]
  fn save_then_clear_removes_every_key() {
    let mut store =
      MemorySessionStore::new();
    Session::new(
      "tok",
      "root@example.com",
      Role::Admin
    )
    .save(&mut store)
    .unwrap();

    let session =
      Session::read(&store).unwrap();
    assert!(session.is_admin());
    assert_eq!(session.token(), "tok");

    clear_session(&mut store);
    assert!(store.is_empty());
  }
}
