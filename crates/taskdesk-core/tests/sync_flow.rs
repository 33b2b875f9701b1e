use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use taskdesk_core::api::TaskApi;
use taskdesk_core::controller::{
    ActionOutcome, LoadOutcome, MutationOutcome, RefreshReason, TITLE_REQUIRED, TaskSyncController,
};
use taskdesk_core::error::{ApiError, SyncError};
use taskdesk_core::guard::{GuardOutcome, Scope, check_access};
use taskdesk_core::session::{MemorySessionStore, Role, Session, SessionKey, SessionStore, clear_session};
use taskdesk_shared::{ListQuery, TaskDraft, TaskDto, TaskPageDto};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    List { skip: usize, limit: usize, search: Option<String> },
    Create(TaskDraft),
    Update(String, TaskDraft),
    Delete(String),
}

/// Records every request and answers from a queue; an empty queue answers
/// with an empty page.
#[derive(Default)]
struct FakeApi {
    calls: RefCell<Vec<Call>>,
    lists: RefCell<VecDeque<Result<TaskPageDto, ApiError>>>,
    mutation_error: RefCell<Option<ApiError>>,
}

impl FakeApi {
    fn queue_page(&self, data: Vec<TaskDto>, total: usize) {
        self.lists.borrow_mut().push_back(Ok(TaskPageDto { data, total }));
    }

    fn queue_error(&self, err: ApiError) {
        self.lists.borrow_mut().push_back(Err(err));
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn mutation_result(&self) -> Result<(), ApiError> {
        match self.mutation_error.borrow_mut().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl TaskApi for FakeApi {
    async fn list_tasks(&self, token: &str, query: &ListQuery) -> Result<TaskPageDto, ApiError> {
        assert_eq!(token, "tok");
        self.calls.borrow_mut().push(Call::List {
            skip: query.skip,
            limit: query.limit,
            search: query.search.clone(),
        });
        self.lists.borrow_mut().pop_front().unwrap_or_else(|| {
            Ok(TaskPageDto {
                data: Vec::new(),
                total: 0,
            })
        })
    }

    async fn create_task(&self, _token: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        self.calls.borrow_mut().push(Call::Create(draft.clone()));
        self.mutation_result().map(|()| task("new", "me"))
    }

    async fn update_task(&self, _token: &str, id: &str, draft: &TaskDraft) -> Result<TaskDto, ApiError> {
        self.calls.borrow_mut().push(Call::Update(id.to_string(), draft.clone()));
        self.mutation_result().map(|()| task(id, "me"))
    }

    async fn delete_task(&self, _token: &str, id: &str) -> Result<(), ApiError> {
        self.calls.borrow_mut().push(Call::Delete(id.to_string()));
        self.mutation_result()
    }
}

fn task(id: &str, owner: &str) -> TaskDto {
    TaskDto {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: String::new(),
        created_at: Some("2026-10-17T09:05:00Z".to_string()),
        created_by: Some(owner.to_string()),
    }
}

fn list(skip: usize, search: Option<&str>) -> Call {
    Call::List {
        skip,
        limit: 10,
        search: search.map(str::to_string),
    }
}

fn signed_in(role: Role) -> Rc<RefCell<MemorySessionStore>> {
    let mut store = MemorySessionStore::new();
    Session::new("tok", "me@example.com", role).save(&mut store).unwrap();
    Rc::new(RefCell::new(store))
}

fn controller_for(store: &Rc<RefCell<MemorySessionStore>>, scope: Scope) -> TaskSyncController {
    let GuardOutcome::Granted(session) = check_access(&*store.borrow(), scope) else {
        panic!("expected access");
    };
    let handle = Rc::clone(store);
    TaskSyncController::new(session, scope).on_invalidate(move || clear_session(&mut *handle.borrow_mut()))
}

#[tokio::test]
async fn paging_and_search_drive_the_list_query() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    api.queue_page(vec![task("a", "me")], 25);
    api.queue_page(vec![task("b", "me")], 25);
    api.queue_page(vec![task("c", "me")], 25);
    api.queue_page(vec![task("d", "me")], 3);

    let mut ctrl = controller_for(&store, Scope::Own);
    assert_eq!(ctrl.refresh(&api, RefreshReason::Mount).await, Some(LoadOutcome::Applied));
    assert_eq!(ctrl.go_next(&api).await, Some(LoadOutcome::Applied));
    assert_eq!(ctrl.go_next(&api).await, Some(LoadOutcome::Applied));
    assert_eq!(ctrl.page().page_index(), 2);
    assert!(!ctrl.can_go_next());
    assert_eq!(ctrl.go_next(&api).await, None);

    assert_eq!(ctrl.search(&api, "  report ").await, Some(LoadOutcome::Applied));
    assert_eq!(ctrl.page().page_index(), 0);
    assert_eq!(ctrl.items()[0].id, "d");

    assert_eq!(
        api.calls(),
        vec![
            list(0, None),
            list(10, None),
            list(20, None),
            list(0, Some("report")),
        ]
    );
}

#[tokio::test]
async fn blank_title_never_reaches_the_backend() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    let mut ctrl = controller_for(&store, Scope::Own);

    let err = ctrl.create_task(&api, "   ", "x").await.unwrap_err();
    assert_eq!(err, SyncError::Validation(TITLE_REQUIRED.to_string()));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn each_mutation_reloads_exactly_once_with_unchanged_query() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    api.queue_page(vec![task("a", "me"), task("b", "me")], 12);
    api.queue_page(vec![task("a", "me"), task("b", "me")], 12);
    let mut ctrl = controller_for(&store, Scope::Own);
    ctrl.refresh(&api, RefreshReason::Mount).await;
    ctrl.search(&api, "a").await;
    api.calls.borrow_mut().clear();
    api.queue_page(vec![task("a", "me"), task("b", "me")], 12);
    api.queue_page(vec![task("a", "me"), task("b", "me")], 12);
    api.queue_page(vec![task("b", "me")], 11);

    let created = ctrl.create_task(&api, " Pay rent ", "monthly").await.unwrap();
    assert_eq!(created, ActionOutcome::Completed(LoadOutcome::Applied));

    ctrl.start_edit("a").unwrap();
    let updated = ctrl.update_task(&api, "a", "Renamed", "").await.unwrap();
    assert_eq!(updated, ActionOutcome::Completed(LoadOutcome::Applied));
    assert!(ctrl.draft().is_none());

    let deleted = ctrl.delete_task(&api, "a", |_| true).await.unwrap();
    assert_eq!(deleted, Some(ActionOutcome::Completed(LoadOutcome::Applied)));

    let reload = list(0, Some("a"));
    assert_eq!(
        api.calls(),
        vec![
            Call::Create(TaskDraft {
                title: "Pay rent".to_string(),
                description: "monthly".to_string(),
            }),
            reload.clone(),
            Call::Update(
                "a".to_string(),
                TaskDraft {
                    title: "Renamed".to_string(),
                    description: String::new(),
                }
            ),
            reload.clone(),
            Call::Delete("a".to_string()),
            reload,
        ]
    );
}

#[tokio::test]
async fn failed_mutation_reports_backend_message_without_reload() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    api.queue_page(vec![task("a", "me")], 1);
    let mut ctrl = controller_for(&store, Scope::Own);
    ctrl.refresh(&api, RefreshReason::Mount).await;

    *api.mutation_error.borrow_mut() = Some(ApiError::from_status(500, r#"{"message":"db down"}"#));
    let outcome = ctrl.delete_task(&api, "a", |_| true).await.unwrap();
    assert_eq!(outcome, Some(ActionOutcome::Failed("db down".to_string())));
    assert_eq!(ctrl.error(), Some("db down"));
    assert_eq!(ctrl.items().len(), 1);
    assert_eq!(api.calls(), vec![list(0, None), Call::Delete("a".to_string())]);
}

#[tokio::test]
async fn unauthorized_clears_session_once_and_stops_traffic() {
    let store = signed_in(Role::Admin);
    let api = FakeApi::default();
    let invalidations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&invalidations);
    let handle = Rc::clone(&store);
    let session = Session::read(&*store.borrow()).unwrap();
    let mut ctrl = TaskSyncController::new(session, Scope::All).on_invalidate(move || {
        *counter.borrow_mut() += 1;
        clear_session(&mut *handle.borrow_mut());
    });

    api.queue_error(ApiError::Unauthorized);
    assert_eq!(ctrl.refresh(&api, RefreshReason::Mount).await, Some(LoadOutcome::Reauthenticate));
    assert!(ctrl.is_signed_out());
    for key in SessionKey::ALL {
        assert_eq!(store.borrow().get(key), None);
    }

    assert_eq!(ctrl.refresh(&api, RefreshReason::Manual).await, None);
    assert_eq!(ctrl.search(&api, "x").await, None);
    assert_eq!(ctrl.create_task(&api, "t", "").await, Err(SyncError::SignedOut));
    ctrl.sign_out();

    assert_eq!(*invalidations.borrow(), 1);
    assert_eq!(api.calls(), vec![list(0, None)]);
    assert!(matches!(check_access(&*store.borrow(), Scope::All), GuardOutcome::Unauthenticated));
}

#[tokio::test]
async fn unauthorized_mutation_signs_out_without_reloading() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    api.queue_page(vec![task("a", "me")], 1);
    let invalidations = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&invalidations);
    let handle = Rc::clone(&store);
    let session = Session::read(&*store.borrow()).unwrap();
    let mut ctrl = TaskSyncController::new(session, Scope::Own).on_invalidate(move || {
        *counter.borrow_mut() += 1;
        clear_session(&mut *handle.borrow_mut());
    });
    ctrl.refresh(&api, RefreshReason::Mount).await;

    *api.mutation_error.borrow_mut() = Some(ApiError::Unauthorized);
    let outcome = ctrl.create_task(&api, "Pay rent", "").await.unwrap();
    assert_eq!(outcome, ActionOutcome::Reauthenticate);
    assert!(ctrl.is_signed_out());
    for key in SessionKey::ALL {
        assert_eq!(store.borrow().get(key), None);
    }

    assert_eq!(ctrl.delete_task(&api, "a", |_| true).await, Err(SyncError::SignedOut));
    assert_eq!(ctrl.refresh(&api, RefreshReason::Manual).await, None);

    assert_eq!(*invalidations.borrow(), 1);
    assert_eq!(
        api.calls(),
        vec![
            list(0, None),
            Call::Create(TaskDraft {
                title: "Pay rent".to_string(),
                description: String::new(),
            }),
        ]
    );
}

#[tokio::test]
async fn search_typed_during_failed_mutation_is_still_loaded() {
    let store = signed_in(Role::User);
    let api = FakeApi::default();
    api.queue_page(vec![task("a", "me")], 1);
    let mut ctrl = controller_for(&store, Scope::Own);
    ctrl.refresh(&api, RefreshReason::Mount).await;

    *api.mutation_error.borrow_mut() = Some(ApiError::from_status(500, r#"{"message":"db down"}"#));
    let ticket = ctrl.begin_create("Pay rent", "").unwrap();
    assert!(ctrl.set_search_term("rent").is_none());
    let result = ticket.mutation().send(&api, "tok").await;

    let MutationOutcome::Failed { message, reload: Some(reload) } = ctrl.finish_mutation(ticket, result) else {
        panic!("expected a failed mutation with a pending reload");
    };
    assert_eq!(message, "db down");
    let loaded = api.list_tasks("tok", reload.query()).await;
    assert_eq!(ctrl.finish_load(reload, loaded), LoadOutcome::Applied);
    assert_eq!(ctrl.page().search_term(), "rent");

    assert_eq!(
        api.calls(),
        vec![
            list(0, None),
            Call::Create(TaskDraft {
                title: "Pay rent".to_string(),
                description: String::new(),
            }),
            list(0, Some("rent")),
        ]
    );
}

#[tokio::test]
async fn admin_view_exposes_creator_facets() {
    let store = signed_in(Role::Admin);
    let api = FakeApi::default();
    api.queue_page(vec![task("1", "a"), task("2", "b"), task("3", "a")], 3);
    let mut ctrl = controller_for(&store, Scope::All);
    ctrl.refresh(&api, RefreshReason::Mount).await;

    assert_eq!(ctrl.facets(), ["a".to_string(), "b".to_string()]);
    assert!(ctrl.set_user_filter(Some("a".to_string())));
    let ids: Vec<&str> = ctrl.visible_items().iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, ["1", "3"]);
    assert!(!ctrl.set_user_filter(Some("zed".to_string())));
}

#[test]
fn user_session_cannot_open_admin_view() {
    let store = signed_in(Role::User);
    match check_access(&*store.borrow(), Scope::All) {
        GuardOutcome::Forbidden { home } => assert_eq!(home.path(), "/user/dashboard"),
        other => panic!("unexpected {other:?}"),
    }
}
