use taskdesk_core::error::StoreError;
use taskdesk_core::session::{
  SessionKey,
  SessionStore
};
use web_sys::Storage;

/// The three session keys in
/// `window.localStorage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorageSessionStore;

fn local_storage() -> Option<Storage> {
  web_sys::window().and_then(|window| {
    window
      .local_storage()
      .ok()
      .flatten()
  })
}

fn unavailable() -> StoreError {
  StoreError::Unavailable(
    "localStorage is not available"
      .to_string()
  )
}

impl SessionStore
  for LocalStorageSessionStore
{
  fn get(
    &self,
    key: SessionKey
  ) -> Option<String> {
    local_storage().and_then(
      |storage| {
        storage
          .get_item(key.as_str())
          .ok()
          .flatten()
      }
    )
  }

  fn set(
    &mut self,
    key: SessionKey,
    value: &str
  ) -> Result<(), StoreError> {
    let storage = local_storage()
      .ok_or_else(unavailable)?;
    storage
      .set_item(key.as_str(), value)
      .map_err(|err| {
        StoreError::Unavailable(format!(
          "failed to write {}: {err:?}",
          key.as_str()
        ))
      })
  }

  fn remove(
    &mut self,
    key: SessionKey
  ) -> Result<(), StoreError> {
    let storage = local_storage()
      .ok_or_else(unavailable)?;
    storage
      .remove_item(key.as_str())
      .map_err(|err| {
        StoreError::Unavailable(format!(
          "failed to remove {}: {err:?}",
          key.as_str()
        ))
      })
  }
}
