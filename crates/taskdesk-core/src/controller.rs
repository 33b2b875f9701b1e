//! Task list synchronization for one dashboard.
//!
//! The controller owns the fetched page, the search and page position, the
//! edit draft and the busy flag. Every operation is split in two: a
//! synchronous `begin_*` that validates and hands out a ticket describing the
//! request, and a synchronous `finish_*` that applies the response. Hosts with
//! their own event loop (the browser) drive the two halves around their
//! transport; everyone else uses the async helpers at the bottom.
//!
//! Reads and writes never patch the list locally. A successful mutation
//! always yields exactly one reload ticket for the current search and page.

use std::fmt;

use taskdesk_shared::{ListQuery, TaskDraft, TaskDto, TaskPageDto};
use tracing::{debug, info, warn};

use crate::api::{Mutation, MutationKind, TaskApi};
use crate::error::{ApiError, SyncError};
use crate::facets::{filter_by_creator, unique_creators};
use crate::guard::Scope;
use crate::pagination::{DEFAULT_PAGE_SIZE, PageState};
use crate::session::Session;

pub const LOAD_FAILED: &str = "Failed to fetch tasks. Please try again.";
pub const TITLE_REQUIRED: &str = "Task title is required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Mount,
    SearchChanged,
    PageChanged,
    AfterMutation(MutationKind),
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Loading,
    Mutating(MutationKind),
    /// The session was invalidated. Terminal: nothing else is sent.
    SignedOut,
}

/// A list request the controller expects an answer to. Only the most
/// recently issued ticket is applied.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    reason: RefreshReason,
    query: ListQuery,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn reason(&self) -> RefreshReason {
        self.reason
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MutationTicket {
    mutation: Mutation,
}

impl MutationTicket {
    pub fn mutation(&self) -> &Mutation {
        &self.mutation
    }

    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request was issued meanwhile; the response was dropped.
    Stale,
    Failed(String),
    Reauthenticate,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    Reload(LoadTicket),
    /// `reload` is set when the search changed while the mutation was in
    /// flight; the host must still run it.
    Failed {
        message: String,
        reload: Option<LoadTicket>,
    },
    Reauthenticate,
}

/// Result of a full mutation round trip including the follow-up reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed(LoadOutcome),
    Failed(String),
    Reauthenticate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub task_id: String,
    pub title: String,
    pub description: String,
}

impl EditDraft {
    fn from_task(task: &TaskDto) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }
}

pub struct TaskSyncController {
    session: Session,
    scope: Scope,
    page: PageState,
    items: Vec<TaskDto>,
    facets: Vec<String>,
    user_filter: Option<String>,
    status: SyncStatus,
    last_seq: u64,
    error: Option<String>,
    draft: Option<EditDraft>,
    has_loaded: bool,
    shown_page_index: usize,
    search_pending: bool,
    on_invalidate: Option<Box<dyn FnMut()>>,
}

impl fmt::Debug for TaskSyncController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSyncController")
            .field("scope", &self.scope)
            .field("page", &self.page)
            .field("items", &self.items.len())
            .field("status", &self.status)
            .field("last_seq", &self.last_seq)
            .field("error", &self.error)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl TaskSyncController {
    pub fn new(session: Session, scope: Scope) -> Self {
        Self {
            session,
            scope,
            page: PageState::new(DEFAULT_PAGE_SIZE),
            items: Vec::new(),
            facets: Vec::new(),
            user_filter: None,
            status: SyncStatus::Idle,
            last_seq: 0,
            error: None,
            draft: None,
            has_loaded: false,
            shown_page_index: 0,
            search_pending: false,
            on_invalidate: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page = PageState::new(page_size);
        self
    }

    /// Initial search and page for the mount load. Nothing is issued.
    pub fn starting_at(mut self, search_term: &str, page_index: usize) -> Self {
        self.page.set_search_term(search_term);
        self.page.set_page_index(page_index);
        self.shown_page_index = page_index;
        self
    }

    /// Called exactly once when the session must be discarded.
    pub fn on_invalidate(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_invalidate = Some(Box::new(callback));
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn page(&self) -> &PageState {
        &self.page
    }

    pub fn items(&self) -> &[TaskDto] {
        &self.items
    }

    /// Fetched rows narrowed by the selected owner facet.
    pub fn visible_items(&self) -> Vec<&TaskDto> {
        filter_by_creator(&self.items, self.user_filter.as_deref())
    }

    pub fn facets(&self) -> &[String] {
        &self.facets
    }

    pub fn user_filter(&self) -> Option<&str> {
        self.user_filter.as_deref()
    }

    /// Search or owner filter narrows what is shown.
    pub fn is_filtered(&self) -> bool {
        !self.page.search_term().trim().is_empty() || self.user_filter.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == SyncStatus::Loading
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.status, SyncStatus::Loading | SyncStatus::Mutating(_))
    }

    pub fn is_signed_out(&self) -> bool {
        self.status == SyncStatus::SignedOut
    }

    pub fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut EditDraft> {
        self.draft.as_mut()
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_busy() && !self.is_signed_out() && self.page.has_next()
    }

    pub fn can_go_previous(&self) -> bool {
        !self.is_busy() && !self.is_signed_out() && self.page.has_previous()
    }

    /// Issues a list request for the current search and page. While a load is
    /// in flight only a search change may supersede it; everything else is a
    /// no-op until it settles.
    #[tracing::instrument(skip(self), fields(status = ?self.status))]
    pub fn begin_refresh(&mut self, reason: RefreshReason) -> Option<LoadTicket> {
        match self.status {
            SyncStatus::SignedOut => {
                debug!("signed out; refresh ignored");
                return None;
            }
            SyncStatus::Mutating(kind) => {
                debug!(%kind, "mutation in flight; refresh ignored");
                return None;
            }
            SyncStatus::Loading if reason != RefreshReason::SearchChanged => {
                debug!("load in flight; refresh ignored");
                return None;
            }
            SyncStatus::Loading | SyncStatus::Idle => {}
        }
        Some(self.issue_load(reason))
    }

    fn issue_load(&mut self, reason: RefreshReason) -> LoadTicket {
        self.last_seq += 1;
        self.search_pending = false;
        self.status = SyncStatus::Loading;
        let query = self.page.query();
        info!(
            seq = self.last_seq,
            ?reason,
            skip = query.skip,
            limit = query.limit,
            search = ?query.search,
            "issuing task list request"
        );
        LoadTicket {
            seq: self.last_seq,
            reason,
            query,
        }
    }

    /// Records the new term and, when it changed, returns to the first page
    /// and reloads. During a mutation the term is kept for the reload that
    /// follows it, whether the mutation succeeds or not.
    pub fn set_search_term(&mut self, term: &str) -> Option<LoadTicket> {
        if self.is_signed_out() || !self.page.set_search_term(term) {
            return None;
        }
        if matches!(self.status, SyncStatus::Mutating(_)) {
            debug!("search changed during mutation; reload deferred");
            self.search_pending = true;
            return None;
        }
        self.begin_refresh(RefreshReason::SearchChanged)
    }

    pub fn next_page(&mut self) -> Option<LoadTicket> {
        if !self.can_go_next() {
            return None;
        }
        self.page.set_page_index(self.page.page_index() + 1);
        self.begin_refresh(RefreshReason::PageChanged)
    }

    pub fn previous_page(&mut self) -> Option<LoadTicket> {
        if !self.can_go_previous() {
            return None;
        }
        self.page.set_page_index(self.page.page_index() - 1);
        self.begin_refresh(RefreshReason::PageChanged)
    }

    /// Admin facet selection; `None` shows the whole page. Unknown owners are
    /// refused.
    pub fn set_user_filter(&mut self, owner: Option<String>) -> bool {
        if self.scope != Scope::All {
            return false;
        }
        match owner {
            Some(owner) if !self.facets.contains(&owner) => false,
            owner => {
                self.user_filter = owner;
                true
            }
        }
    }

    #[tracing::instrument(skip(self, ticket, result), fields(seq = ticket.seq))]
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<TaskPageDto, ApiError>) -> LoadOutcome {
        if self.is_signed_out() || ticket.seq != self.last_seq {
            debug!(latest = self.last_seq, "discarding superseded list response");
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                self.page.set_total_count(page.total);
                self.items = page.data;
                self.facets = unique_creators(&self.items);
                if let Some(owner) = self.user_filter.as_ref()
                    && !self.facets.contains(owner)
                {
                    debug!(%owner, "owner facet left the page; clearing filter");
                    self.user_filter = None;
                }
                self.status = SyncStatus::Idle;
                self.error = None;
                self.has_loaded = true;
                self.shown_page_index = self.page.page_index();
                info!(
                    items = self.items.len(),
                    total = self.page.total_count(),
                    "task page loaded"
                );
                LoadOutcome::Applied
            }
            Err(ApiError::Unauthorized) => {
                self.invalidate();
                LoadOutcome::Reauthenticate
            }
            Err(err) => {
                warn!(error = %err, "task list request failed");
                if ticket.reason == RefreshReason::PageChanged {
                    self.page.set_page_index(self.shown_page_index);
                }
                let message = err.user_message(LOAD_FAILED);
                self.status = SyncStatus::Idle;
                self.error = Some(message.clone());
                LoadOutcome::Failed(message)
            }
        }
    }

    /// Opens the inline editor for a listed task, replacing any other draft.
    pub fn start_edit(&mut self, task_id: &str) -> Result<(), SyncError> {
        if self.is_signed_out() {
            return Err(SyncError::SignedOut);
        }
        let task = self.find(task_id)?;
        self.draft = Some(EditDraft::from_task(task));
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    #[tracing::instrument(skip(self, title, description))]
    pub fn begin_create(&mut self, title: &str, description: &str) -> Result<MutationTicket, SyncError> {
        self.ensure_signed_in()?;
        let draft = validated_draft(title, description)?;
        self.ensure_idle()?;
        Ok(self.issue_mutation(Mutation::Create(draft)))
    }

    #[tracing::instrument(skip(self, title, description))]
    pub fn begin_update(
        &mut self,
        task_id: &str,
        title: &str,
        description: &str,
    ) -> Result<MutationTicket, SyncError> {
        self.ensure_signed_in()?;
        match self.draft.as_ref() {
            Some(draft) if draft.task_id == task_id => {}
            _ => return Err(SyncError::NotEditing),
        }
        let draft = validated_draft(title, description)?;
        self.ensure_idle()?;
        Ok(self.issue_mutation(Mutation::Update {
            id: task_id.to_string(),
            draft,
        }))
    }

    /// Asks `confirm` before anything is sent. Declining returns `Ok(None)`
    /// and leaves the controller untouched.
    #[tracing::instrument(skip(self, confirm))]
    pub fn begin_delete(
        &mut self,
        task_id: &str,
        confirm: impl FnOnce(&TaskDto) -> bool,
    ) -> Result<Option<MutationTicket>, SyncError> {
        self.ensure_signed_in()?;
        self.ensure_idle()?;
        let task = self.find(task_id)?;
        if !confirm(task) {
            debug!("delete declined");
            return Ok(None);
        }
        Ok(Some(self.issue_mutation(Mutation::Delete {
            id: task_id.to_string(),
        })))
    }

    fn issue_mutation(&mut self, mutation: Mutation) -> MutationTicket {
        let kind = mutation.kind();
        self.status = SyncStatus::Mutating(kind);
        info!(%kind, "sending task mutation");
        MutationTicket { mutation }
    }

    #[tracing::instrument(skip(self, ticket, result), fields(kind = %ticket.kind()))]
    pub fn finish_mutation(&mut self, ticket: MutationTicket, result: Result<(), ApiError>) -> MutationOutcome {
        if self.is_signed_out() {
            return MutationOutcome::Reauthenticate;
        }

        match result {
            Ok(()) => {
                match &ticket.mutation {
                    Mutation::Update { id, .. } | Mutation::Delete { id }
                        if self.draft.as_ref().is_some_and(|draft| &draft.task_id == id) =>
                    {
                        self.draft = None;
                    }
                    _ => {}
                }
                self.error = None;
                info!("mutation accepted; reloading page");
                MutationOutcome::Reload(self.issue_load(RefreshReason::AfterMutation(ticket.kind())))
            }
            Err(ApiError::Unauthorized) => {
                self.invalidate();
                MutationOutcome::Reauthenticate
            }
            Err(err) => {
                warn!(error = %err, "mutation failed");
                let message = err.user_message(ticket.mutation.failure_fallback());
                self.status = SyncStatus::Idle;
                self.error = Some(message.clone());
                let reload = self
                    .search_pending
                    .then(|| self.issue_load(RefreshReason::SearchChanged));
                MutationOutcome::Failed { message, reload }
            }
        }
    }

    /// Explicit logout. Same path as an expired session.
    pub fn sign_out(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        if self.is_signed_out() {
            return;
        }
        warn!("session invalidated; re-authentication required");
        self.status = SyncStatus::SignedOut;
        self.draft = None;
        if let Some(mut callback) = self.on_invalidate.take() {
            callback();
        }
    }

    fn ensure_signed_in(&self) -> Result<(), SyncError> {
        if self.is_signed_out() {
            Err(SyncError::SignedOut)
        } else {
            Ok(())
        }
    }

    fn ensure_idle(&self) -> Result<(), SyncError> {
        if self.is_busy() { Err(SyncError::Busy) } else { Ok(()) }
    }

    fn find(&self, task_id: &str) -> Result<&TaskDto, SyncError> {
        self.items
            .iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| SyncError::UnknownTask(task_id.to_string()))
    }

    pub async fn refresh<A: TaskApi>(&mut self, api: &A, reason: RefreshReason) -> Option<LoadOutcome> {
        let ticket = self.begin_refresh(reason)?;
        Some(self.run_load(api, ticket).await)
    }

    pub async fn search<A: TaskApi>(&mut self, api: &A, term: &str) -> Option<LoadOutcome> {
        let ticket = self.set_search_term(term)?;
        Some(self.run_load(api, ticket).await)
    }

    pub async fn go_next<A: TaskApi>(&mut self, api: &A) -> Option<LoadOutcome> {
        let ticket = self.next_page()?;
        Some(self.run_load(api, ticket).await)
    }

    pub async fn go_previous<A: TaskApi>(&mut self, api: &A) -> Option<LoadOutcome> {
        let ticket = self.previous_page()?;
        Some(self.run_load(api, ticket).await)
    }

    pub async fn create_task<A: TaskApi>(
        &mut self,
        api: &A,
        title: &str,
        description: &str,
    ) -> Result<ActionOutcome, SyncError> {
        let ticket = self.begin_create(title, description)?;
        Ok(self.run_mutation(api, ticket).await)
    }

    pub async fn update_task<A: TaskApi>(
        &mut self,
        api: &A,
        task_id: &str,
        title: &str,
        description: &str,
    ) -> Result<ActionOutcome, SyncError> {
        let ticket = self.begin_update(task_id, title, description)?;
        Ok(self.run_mutation(api, ticket).await)
    }

    pub async fn delete_task<A: TaskApi>(
        &mut self,
        api: &A,
        task_id: &str,
        confirm: impl FnOnce(&TaskDto) -> bool,
    ) -> Result<Option<ActionOutcome>, SyncError> {
        let Some(ticket) = self.begin_delete(task_id, confirm)? else {
            return Ok(None);
        };
        Ok(Some(self.run_mutation(api, ticket).await))
    }

    async fn run_load<A: TaskApi>(&mut self, api: &A, ticket: LoadTicket) -> LoadOutcome {
        let result = api.list_tasks(self.session.token(), ticket.query()).await;
        self.finish_load(ticket, result)
    }

    async fn run_mutation<A: TaskApi>(&mut self, api: &A, ticket: MutationTicket) -> ActionOutcome {
        let result = ticket.mutation().send(api, self.session.token()).await;
        match self.finish_mutation(ticket, result) {
            MutationOutcome::Reload(reload) => ActionOutcome::Completed(self.run_load(api, reload).await),
            MutationOutcome::Failed { message, reload } => {
                if let Some(reload) = reload {
                    self.run_load(api, reload).await;
                }
                ActionOutcome::Failed(message)
            }
            MutationOutcome::Reauthenticate => ActionOutcome::Reauthenticate,
        }
    }
}

/// Title must trim to something; it is sent trimmed. Description is sent as
/// typed.
pub fn validated_draft(title: &str, description: &str) -> Result<TaskDraft, SyncError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(SyncError::Validation(TITLE_REQUIRED.to_string()));
    }
    Ok(TaskDraft {
        title: title.to_string(),
        description: description.to_string(),
    })
}
