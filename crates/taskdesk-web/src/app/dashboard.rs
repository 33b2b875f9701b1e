use std::cell::RefCell;
use std::rc::Rc;

use taskdesk_core::api::TaskApi;
use taskdesk_core::controller::{
  LoadOutcome,
  LoadTicket,
  MutationOutcome,
  MutationTicket,
  RefreshReason,
  TaskSyncController
};
use taskdesk_core::format::empty_hint;
use taskdesk_core::guard::{
  GuardOutcome,
  Scope,
  check_access
};
use taskdesk_core::session::clear_session;
use taskdesk_shared::TaskDto;
use wasm_bindgen_futures::spawn_local;
use yew::{
  Callback,
  Html,
  Properties,
  UseForceUpdateHandle,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_mut_ref,
  use_state
};
use yew_router::prelude::{
  Navigator,
  use_navigator
};

use super::storage::LocalStorageSessionStore;
use super::{
  Route,
  route_for
};
use crate::api::GlooTaskApi;
use crate::components::{
  ComposeForm,
  EmptyState,
  FacetPanel,
  Header,
  PaginationBar,
  SearchBar,
  TaskList
};

const DELETE_PROMPT: &str =
  "Are you sure you want to delete \
   this task?";

#[derive(Properties, PartialEq)]
pub struct DashboardProps {
  pub scope: Scope,
  pub api:   Rc<GlooTaskApi>
}

/// Everything an async completion needs
/// to hand its result back to the
/// controller and repaint.
#[derive(Clone)]
struct SyncHandle {
  ctrl:      Rc<
    RefCell<Option<TaskSyncController>>
  >,
  api:       Rc<GlooTaskApi>,
  redraw:    UseForceUpdateHandle,
  navigator: Option<Navigator>
}

impl SyncHandle {
  /// The borrow ends before this returns,
  /// so nothing that can re-render runs
  /// while the controller is held.
  fn with<R>(
    &self,
    f: impl FnOnce(
      &mut TaskSyncController
    ) -> R
  ) -> Option<R> {
    self.ctrl.borrow_mut().as_mut().map(f)
  }

  fn token(&self) -> Option<String> {
    self.ctrl.borrow().as_ref().map(
      |ctrl| {
        ctrl.session().token().to_string()
      }
    )
  }

  fn start(
    &self,
    ticket: Option<LoadTicket>
  ) {
    if let Some(ticket) = ticket {
      self.spawn_load(ticket);
    }
    self.redraw.force_update();
  }

  fn spawn_load(
    &self,
    ticket: LoadTicket
  ) {
    let Some(token) = self.token() else {
      return;
    };
    let handle = self.clone();
    spawn_local(async move {
      let result = handle
        .api
        .list_tasks(&token, ticket.query())
        .await;
      let outcome = handle.with(|ctrl| {
        ctrl.finish_load(ticket, result)
      });
      if outcome
        == Some(LoadOutcome::Reauthenticate)
      {
        handle.to_login();
      }
      handle.redraw.force_update();
    });
  }

  fn spawn_mutation(
    &self,
    ticket: MutationTicket,
    on_success: impl FnOnce() + 'static
  ) {
    let Some(token) = self.token() else {
      return;
    };
    let handle = self.clone();
    spawn_local(async move {
      let result = ticket
        .mutation()
        .send(&*handle.api, &token)
        .await;
      let outcome = handle.with(|ctrl| {
        ctrl.finish_mutation(ticket, result)
      });
      match outcome {
        | Some(MutationOutcome::Reload(
          reload
        )) => {
          on_success();
          handle.spawn_load(reload);
        }
        | Some(
          MutationOutcome::Reauthenticate
        ) => handle.to_login(),
        | Some(MutationOutcome::Failed {
          message,
          reload
        }) => {
          tracing::warn!(%message, "mutation failed");
          if let Some(reload) = reload {
            handle.spawn_load(reload);
          }
        }
        | None => {}
      }
      handle.redraw.force_update();
    });
  }

  fn to_login(&self) {
    match &self.navigator {
      | Some(navigator) => {
        navigator.replace(&Route::Login)
      }
      | None => tracing::warn!(
        "no router; cannot leave the \
         dashboard"
      )
    }
  }
}

fn owner_counts(
  tasks: &[TaskDto],
  facets: &[String]
) -> Vec<(String, usize)> {
  facets
    .iter()
    .map(|owner| {
      let count = tasks
        .iter()
        .filter(|task| {
          task.created_by.as_deref()
            == Some(owner.as_str())
        })
        .count();
      (owner.clone(), count)
    })
    .collect()
}

#[function_component(Dashboard)]
pub fn dashboard(
  props: &DashboardProps
) -> Html {
  let ctrl = use_mut_ref(|| {
    None::<TaskSyncController>
  });
  let redraw = use_force_update();
  let navigator = use_navigator();
  let compose_title =
    use_state(String::new);
  let compose_description =
    use_state(String::new);
  let form_error =
    use_state(|| None::<String>);

  let handle = SyncHandle {
    ctrl: ctrl.clone(),
    api: props.api.clone(),
    redraw,
    navigator
  };

  {
    let handle = handle.clone();
    use_effect_with(
      props.scope,
      move |scope| {
        match check_access(
          &LocalStorageSessionStore,
          *scope
        ) {
          | GuardOutcome::Granted(
            session
          ) => {
            let controller =
              TaskSyncController::new(
                session, *scope
              )
              .on_invalidate(|| {
                clear_session(
                  &mut LocalStorageSessionStore
                )
              });
            *handle.ctrl.borrow_mut() =
              Some(controller);
            let ticket =
              handle.with(|ctrl| {
                ctrl.begin_refresh(
                  RefreshReason::Mount
                )
              });
            handle.start(ticket.flatten());
          }
          | denied => {
            if let (
              Some(navigator),
              Some(destination)
            ) = (
              handle.navigator.as_ref(),
              denied.redirect()
            ) {
              navigator.replace(
                &route_for(destination)
              );
            }
          }
        }
        || ()
      }
    );
  }

  let on_logout = {
    let handle = handle.clone();
    Callback::from(move |()| {
      if handle
        .with(|ctrl| ctrl.sign_out())
        .is_none()
      {
        clear_session(
          &mut LocalStorageSessionStore
        );
      }
      handle.to_login();
    })
  };

  let on_search = {
    let handle = handle.clone();
    Callback::from(
      move |term: String| {
        let ticket = handle.with(|ctrl| {
          ctrl.set_search_term(&term)
        });
        handle.start(ticket.flatten());
      }
    )
  };

  let on_refresh = {
    let handle = handle.clone();
    Callback::from(move |()| {
      let ticket = handle.with(|ctrl| {
        ctrl.begin_refresh(
          RefreshReason::Manual
        )
      });
      handle.start(ticket.flatten());
    })
  };

  let on_previous = {
    let handle = handle.clone();
    Callback::from(move |()| {
      let ticket = handle
        .with(|ctrl| ctrl.previous_page());
      handle.start(ticket.flatten());
    })
  };

  let on_next = {
    let handle = handle.clone();
    Callback::from(move |()| {
      let ticket =
        handle.with(|ctrl| ctrl.next_page());
      handle.start(ticket.flatten());
    })
  };

  let on_facet = {
    let handle = handle.clone();
    Callback::from(
      move |owner: Option<String>| {
        handle.with(|ctrl| {
          ctrl.set_user_filter(owner)
        });
        handle.redraw.force_update();
      }
    )
  };

  let on_dismiss = {
    let handle = handle.clone();
    Callback::from(move |_| {
      handle
        .with(|ctrl| ctrl.dismiss_error());
      handle.redraw.force_update();
    })
  };

  let on_compose_title = {
    let compose_title =
      compose_title.clone();
    Callback::from(move |value: String| {
      compose_title.set(value)
    })
  };

  let on_compose_description = {
    let compose_description =
      compose_description.clone();
    Callback::from(move |value: String| {
      compose_description.set(value)
    })
  };

  let on_create = {
    let handle = handle.clone();
    let compose_title =
      compose_title.clone();
    let compose_description =
      compose_description.clone();
    let form_error = form_error.clone();
    Callback::from(move |()| {
      let started = handle.with(|ctrl| {
        ctrl.begin_create(
          &compose_title,
          &compose_description
        )
      });
      match started {
        | Some(Ok(ticket)) => {
          form_error.set(None);
          let compose_title =
            compose_title.clone();
          let compose_description =
            compose_description.clone();
          handle.spawn_mutation(
            ticket,
            move || {
              compose_title
                .set(String::new());
              compose_description
                .set(String::new());
            }
          );
        }
        | Some(Err(error)) => {
          form_error
            .set(Some(error.to_string()));
        }
        | None => {}
      }
      handle.redraw.force_update();
    })
  };

  let on_edit = {
    let handle = handle.clone();
    Callback::from(move |id: String| {
      if let Some(Err(error)) = handle
        .with(|ctrl| ctrl.start_edit(&id))
      {
        tracing::warn!(%error, "cannot edit task");
      }
      handle.redraw.force_update();
    })
  };

  let on_draft_title = {
    let handle = handle.clone();
    Callback::from(
      move |value: String| {
        handle.with(|ctrl| {
          if let Some(draft) =
            ctrl.draft_mut()
          {
            draft.title = value;
          }
        });
        handle.redraw.force_update();
      }
    )
  };

  let on_draft_description = {
    let handle = handle.clone();
    Callback::from(
      move |value: String| {
        handle.with(|ctrl| {
          if let Some(draft) =
            ctrl.draft_mut()
          {
            draft.description = value;
          }
        });
        handle.redraw.force_update();
      }
    )
  };

  let on_cancel = {
    let handle = handle.clone();
    Callback::from(move |()| {
      handle.with(|ctrl| ctrl.cancel_edit());
      handle.redraw.force_update();
    })
  };

  let on_save = {
    let handle = handle.clone();
    let form_error = form_error.clone();
    Callback::from(move |()| {
      let started = handle.with(|ctrl| {
        let draft = ctrl.draft()?.clone();
        Some(ctrl.begin_update(
          &draft.task_id,
          &draft.title,
          &draft.description
        ))
      });
      match started.flatten() {
        | Some(Ok(ticket)) => {
          form_error.set(None);
          handle.spawn_mutation(ticket, || {});
        }
        | Some(Err(error)) => {
          form_error
            .set(Some(error.to_string()));
        }
        | None => {}
      }
      handle.redraw.force_update();
    })
  };

  let on_delete = {
    let handle = handle.clone();
    let form_error = form_error.clone();
    Callback::from(move |id: String| {
      let started = handle.with(|ctrl| {
        ctrl.begin_delete(&id, |_| {
          gloo::dialogs::confirm(
            DELETE_PROMPT
          )
        })
      });
      match started {
        | Some(Ok(Some(ticket))) => {
          handle.spawn_mutation(ticket, || {});
        }
        | Some(Err(error)) => {
          form_error
            .set(Some(error.to_string()));
        }
        | Some(Ok(None)) | None => {}
      }
      handle.redraw.force_update();
    })
  };

  let state = ctrl.borrow();
  let Some(ctrl) = state.as_ref() else {
    return html! {
      <div class="page">
        <div class="loading">{ "Checking session..." }</div>
      </div>
    };
  };

  let show_owner = ctrl.scope() == Scope::All;
  let title = if show_owner {
    "All Tasks"
  } else {
    "My Tasks"
  };
  let visible: Vec<TaskDto> = ctrl
    .visible_items()
    .into_iter()
    .cloned()
    .collect();

  let list = if ctrl.is_loading()
    && !ctrl.has_loaded()
  {
    html! { <div class="loading">{ "Loading tasks..." }</div> }
  } else if visible.is_empty() {
    html! {
      <EmptyState hint={empty_hint(ctrl.is_filtered(), ctrl.scope())} />
    }
  } else {
    html! {
      <TaskList
        tasks={visible}
        show_owner={show_owner}
        draft={ctrl.draft().cloned()}
        busy={ctrl.is_busy()}
        on_edit={on_edit}
        on_delete={on_delete}
        on_draft_title={on_draft_title}
        on_draft_description={on_draft_description}
        on_save={on_save}
        on_cancel={on_cancel}
      />
    }
  };

  html! {
    <div class="page">
      <Header
        title={title.to_string()}
        email={ctrl.session().user_email().to_string()}
        on_logout={on_logout}
      />
      {
        match ctrl.error() {
          | Some(error) => html! {
            <div class="banner error">
              <span>{ error }</span>
              <button class="btn" onclick={on_dismiss}>{ "Dismiss" }</button>
            </div>
          },
          | None => html! {}
        }
      }
      <SearchBar
        value={ctrl.page().search_term().to_string()}
        busy={ctrl.is_busy()}
        loading={ctrl.is_loading()}
        on_search={on_search}
        on_refresh={on_refresh}
      />
      <div class="layout">
        {
          if show_owner {
            html! {
              <FacetPanel
                title="Users"
                items={owner_counts(ctrl.items(), ctrl.facets())}
                selected={ctrl.user_filter().map(str::to_string)}
                on_select={on_facet}
              />
            }
          } else {
            html! {
              <ComposeForm
                title={(*compose_title).clone()}
                description={(*compose_description).clone()}
                busy={ctrl.is_busy()}
                on_title={on_compose_title}
                on_description={on_compose_description}
                on_submit={on_create}
              />
            }
          }
        }
        <div class="main">
          {
            match (*form_error).clone() {
              | Some(error) => html! { <div class="field-error">{ error }</div> },
              | None => html! {}
            }
          }
          { list }
          <PaginationBar
            summary={ctrl.page().summary()}
            can_previous={ctrl.can_go_previous()}
            can_next={ctrl.can_go_next()}
            on_previous={on_previous}
            on_next={on_next}
          />
        </div>
      </div>
    </div>
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn task(
    id: &str,
    owner: Option<&str>
  ) -> TaskDto {
    TaskDto {
      id:          id.to_string(),
      title:       id.to_string(),
      description: String::new(),
      created_at:  None,
      created_by:  owner.map(str::to_string)
    }
  }

  #[test]
  fn owner_counts_follow_facet_order() {
    let tasks = vec![
      task("1", Some("bo")),
      task("2", Some("ana")),
      task("3", Some("bo")),
      task("4", None),
    ];
    let facets =
      vec!["bo".to_string(), "ana".to_string()];
    assert_eq!(
      owner_counts(&tasks, &facets),
      vec![
        ("bo".to_string(), 2),
        ("ana".to_string(), 1),
      ]
    );
  }
}
