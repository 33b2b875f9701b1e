use tracing::{
  info,
  warn
};

use crate::session::{
  Role,
  Session,
  SessionStore
};

/// Whose tasks a dashboard lists. The
/// backend does the actual scoping from
/// the token's role claim; the client
/// only gates which view may open.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Scope {
  Own,
  All
}

impl Scope {
  pub fn required_role(
    self
  ) -> Option<Role> {
    match self {
      | Scope::Own => None,
      | Scope::All => Some(Role::Admin)
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Destination {
  Login,
  UserDashboard,
  AdminDashboard
}

impl Destination {
  pub fn home_for(role: Role) -> Self {
    match role {
      | Role::Admin => {
        Destination::AdminDashboard
      }
      | Role::User => {
        Destination::UserDashboard
      }
    }
  }

  pub fn path(self) -> &'static str {
    match self {
      | Destination::Login => "/login",
      | Destination::UserDashboard => {
        "/user/dashboard"
      }
      | Destination::AdminDashboard => {
        "/admin/dashboard"
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
  Granted(Session),
  Unauthenticated,
  Forbidden { home: Destination }
}

impl GuardOutcome {
  /// Where the caller should navigate
  /// instead of rendering the view.
  pub fn redirect(
    &self
  ) -> Option<Destination> {
    match self {
      | GuardOutcome::Granted(_) => None,
      | GuardOutcome::Unauthenticated => {
        Some(Destination::Login)
      }
      | GuardOutcome::Forbidden {
        home
      } => Some(*home)
    }
  }
}

/// Runs once per view activation.
#[tracing::instrument(skip(store))]
pub fn check_access(
  store: &impl SessionStore,
  scope: Scope
) -> GuardOutcome {
  let Some(session) =
    Session::read(store)
  else {
    info!("no session token; sign-in required");
    return GuardOutcome::Unauthenticated;
  };

  if let Some(required) =
    scope.required_role()
    && session.role() != required
  {
    warn!(
      role = session.role().as_str(),
      required = required.as_str(),
      "role does not match view"
    );
    return GuardOutcome::Forbidden {
      home: Destination::home_for(
        session.role()
      )
    };
  }

  info!(
    role = session.role().as_str(),
    "view access granted"
  );
  GuardOutcome::Granted(session)
}
