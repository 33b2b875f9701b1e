use chrono::{
  DateTime,
  Local,
  TimeZone
};

use crate::guard::Scope;

const CREATED_FORMAT: &str =
  "%b %-d, %Y, %I:%M %p";

/// `Oct 17, 2026, 09:05 AM` in local
/// time. Unparseable input is shown as
/// it came.
pub fn created_label(
  raw: Option<&str>
) -> String {
  created_label_in(raw, &Local)
}

pub fn created_label_in<Tz>(
  raw: Option<&str>,
  tz: &Tz
) -> String
where
  Tz: TimeZone,
  Tz::Offset: std::fmt::Display
{
  let Some(raw) = raw
    .map(str::trim)
    .filter(|raw| !raw.is_empty())
  else {
    return "unknown".to_string();
  };

  match DateTime::parse_from_rfc3339(
    raw
  ) {
    | Ok(parsed) => parsed
      .with_timezone(tz)
      .format(CREATED_FORMAT)
      .to_string(),
    | Err(error) => {
      tracing::debug!(
        %error,
        raw,
        "unparseable created timestamp"
      );
      raw.to_string()
    }
  }
}

/// Second line under "No tasks found".
pub fn empty_hint(
  filtered: bool,
  scope: Scope
) -> &'static str {
  match (filtered, scope) {
    | (true, _) => {
      "Try adjusting your search or \
       filter criteria."
    }
    | (false, Scope::All) => {
      "No tasks have been created by \
       users yet."
    }
    | (false, Scope::Own) => {
      "Create your first task to get \
       started."
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    FixedOffset,
    Utc
  };

  use super::*;

  #[test]
  fn formats_like_a_us_locale_date() {
    assert_eq!(
      created_label_in(
        Some("2026-10-17T09:05:00.000Z"),
        &Utc
      ),
      "Oct 17, 2026, 09:05 AM"
    );
    assert_eq!(
      created_label_in(
        Some("2026-03-02T18:30:00Z"),
        &Utc
      ),
      "Mar 2, 2026, 06:30 PM"
    );
  }

  #[test]
  fn converts_into_the_target_zone() {
    let east =
      FixedOffset::east_opt(2 * 3600)
        .unwrap();
    assert_eq!(
      created_label_in(
        Some("2026-10-17T23:15:00Z"),
        &east
      ),
      "Oct 18, 2026, 01:15 AM"
    );
  }

  #[test]
  fn missing_or_garbage_input() {
    assert_eq!(
      created_label_in(None, &Utc),
      "unknown"
    );
    assert_eq!(
      created_label_in(
        Some("yesterday"),
        &Utc
      ),
      "yesterday"
    );
  }

  #[test]
  fn empty_hint_prefers_filter_advice() {
    assert_eq!(
      empty_hint(true, Scope::All),
      "Try adjusting your search or \
       filter criteria."
    );
    assert_eq!(
      empty_hint(false, Scope::All),
      "No tasks have been created by \
       users yet."
    );
    assert!(
      empty_hint(false, Scope::Own)
        .starts_with("Create your first")
    );
  }
}
