mod dashboard;
mod storage;

use std::rc::Rc;

use taskdesk_core::guard::{
  Destination,
  Scope
};
use taskdesk_core::session::Session;
use yew::{
  Html,
  function_component,
  html,
  use_memo
};
use yew_router::prelude::{
  BrowserRouter,
  Link,
  Redirect,
  Routable,
  Switch
};

use self::dashboard::Dashboard;
use self::storage::LocalStorageSessionStore;
use crate::api::GlooTaskApi;

#[derive(Routable, Clone, PartialEq)]
pub enum Route {
  #[at("/")]
  Landing,
  #[at("/login")]
  Login,
  #[at("/user/dashboard")]
  UserDashboard,
  #[at("/admin/dashboard")]
  AdminDashboard,
  #[not_found]
  #[at("/404")]
  NotFound
}

pub fn route_for(
  destination: Destination
) -> Route {
  match destination {
    | Destination::Login => Route::Login,
    | Destination::UserDashboard => {
      Route::UserDashboard
    }
    | Destination::AdminDashboard => {
      Route::AdminDashboard
    }
  }
}

#[function_component(App)]
pub fn app() -> Html {
  let api = use_memo((), |_| {
    GlooTaskApi::from_build_env()
      .map(Rc::new)
  });

  let api = match &*api {
    | Ok(api) => api.clone(),
    | Err(error) => {
      tracing::error!(%error, "task api misconfigured");
      return html! {
        <div class="page">
          <div class="banner error">
            { format!("Cannot reach the task service: {error}") }
          </div>
        </div>
      };
    }
  };

  html! {
    <BrowserRouter>
      <Switch<Route> render={move |route| switch(route, &api)} />
    </BrowserRouter>
  }
}

fn switch(
  route: Route,
  api: &Rc<GlooTaskApi>
) -> Html {
  match route {
    | Route::Landing => {
      html! { <Landing /> }
    }
    | Route::Login => {
      html! { <LoginNotice /> }
    }
    | Route::UserDashboard => html! {
      <Dashboard key="own" scope={Scope::Own} api={api.clone()} />
    },
    | Route::AdminDashboard => html! {
      <Dashboard key="all" scope={Scope::All} api={api.clone()} />
    },
    | Route::NotFound => {
      html! { <NotFound /> }
    }
  }
}

#[function_component(Landing)]
fn landing() -> Html {
  let target = match Session::read(
    &LocalStorageSessionStore
  ) {
    | Some(session) => route_for(
      Destination::home_for(
        session.role()
      )
    ),
    | None => Route::Login
  };

  html! { <Redirect<Route> to={target} /> }
}

#[function_component(LoginNotice)]
fn login_notice() -> Html {
  let signed_in =
    Session::read(&LocalStorageSessionStore);

  html! {
    <div class="page narrow">
      <h1>{ "Sign in" }</h1>
      {
        match signed_in {
          | Some(session) => html! {
            <p>
              { format!("Signed in as {}. ", session.user_email()) }
              <Link<Route> to={Route::Landing}>{ "Open your dashboard" }</Link<Route>>
            </p>
          },
          | None => html! {
            <p>
              { "Your session has ended or was never started. Sign in through the account service, then come back to this page." }
            </p>
          }
        }
      }
    </div>
  }
}

#[function_component(NotFound)]
fn not_found() -> Html {
  html! {
    <div class="page narrow">
      <h1>{ "Page not found" }</h1>
      <Link<Route> to={Route::Landing}>{ "Back to tasks" }</Link<Route>>
    </div>
  }
}
