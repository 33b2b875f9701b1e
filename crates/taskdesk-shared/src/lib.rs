use serde::{
  Deserialize,
  Deserializer,
  Serialize
};

/// Missing and `null` both decode to the
/// type's default.
fn null_as_default<'de, D, T>(
  deserializer: D
) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>
{
  Ok(
    Option::<T>::deserialize(deserializer)?
      .unwrap_or_default()
  )
}

/// Role claim stored next to the session
/// token. Anything other than `admin`
/// reads as a regular user.
#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User
}

impl Role {
  pub fn parse(raw: &str) -> Self {
    if raw.trim() == "admin" {
      Role::Admin
    } else {
      Role::User
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Role::Admin => "admin",
      | Role::User => "user"
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskDto {
  #[serde(rename = "_id", alias = "id")]
  pub id:          String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub title:       String,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub description: String,
  #[serde(
    rename = "createdAt",
    default
  )]
  pub created_at:  Option<String>,
  #[serde(
    rename = "createdBy",
    default
  )]
  pub created_by:  Option<String>
}

/// Response of the list endpoint.
/// `total` counts every task matching
/// the search, not just `data`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPageDto {
  pub data:  Vec<TaskDto>,
  #[serde(
    default,
    deserialize_with = "null_as_default"
  )]
  pub total: usize
}

/// Body for both create and update.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskDraft {
  pub title:       String,
  pub description: String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ListQuery {
  pub skip:   usize,
  pub limit:  usize,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub search: Option<String>
}

impl ListQuery {
  pub fn new(
    page_index: usize,
    page_size: usize,
    search_term: &str
  ) -> Self {
    let trimmed = search_term.trim();
    Self {
      skip:   page_index
        .saturating_mul(page_size),
      limit:  page_size,
      search: (!trimmed.is_empty())
        .then(|| trimmed.to_string())
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: Option<String>
}
