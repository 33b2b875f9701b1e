use taskdesk_core::controller::EditDraft;
use taskdesk_core::format::created_label;
use taskdesk_shared::TaskDto;
use web_sys::{HtmlInputElement, HtmlTextAreaElement};
use yew::{Callback, Html, Properties, TargetCast, function_component, html};

#[derive(Properties, PartialEq)]
pub struct HeaderProps {
    pub title: String,
    pub email: String,
    pub on_logout: Callback<()>,
}

#[function_component(Header)]
pub fn header(props: &HeaderProps) -> Html {
    let on_logout = props.on_logout.clone();
    html! {
        <div class="topbar">
            <h1>{ &props.title }</h1>
            <div class="account">
                <span class="email">{ &props.email }</span>
                <button class="btn" onclick={move |_| on_logout.emit(())}>{ "Logout" }</button>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct SearchBarProps {
    pub value: String,
    pub busy: bool,
    pub loading: bool,
    pub on_search: Callback<String>,
    pub on_refresh: Callback<()>,
}

#[function_component(SearchBar)]
pub fn search_bar(props: &SearchBarProps) -> Html {
    let on_search = props.on_search.clone();
    let on_refresh = props.on_refresh.clone();
    html! {
        <div class="toolbar">
            <input
                class="search"
                type="search"
                placeholder="Search tasks..."
                value={props.value.clone()}
                oninput={move |e: yew::InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    on_search.emit(input.value());
                }}
            />
            <button class="btn" disabled={props.busy} onclick={move |_| on_refresh.emit(())}>
                { if props.loading { "Loading..." } else { "Refresh" } }
            </button>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct ComposeFormProps {
    pub title: String,
    pub description: String,
    pub busy: bool,
    pub on_title: Callback<String>,
    pub on_description: Callback<String>,
    pub on_submit: Callback<()>,
}

#[function_component(ComposeForm)]
pub fn compose_form(props: &ComposeFormProps) -> Html {
    let on_title = props.on_title.clone();
    let on_description = props.on_description.clone();
    let on_submit = props.on_submit.clone();

    html! {
        <form
            class="panel compose"
            onsubmit={move |e: yew::SubmitEvent| {
                e.prevent_default();
                on_submit.emit(());
            }}
        >
            <div class="header">{ "New task" }</div>
            <input
                type="text"
                placeholder="Task title"
                value={props.title.clone()}
                oninput={move |e: yew::InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    on_title.emit(input.value());
                }}
            />
            <textarea
                placeholder="Description (optional)"
                value={props.description.clone()}
                oninput={move |e: yew::InputEvent| {
                    let input: HtmlTextAreaElement = e.target_unchecked_into();
                    on_description.emit(input.value());
                }}
            />
            <button class="btn primary" type="submit" disabled={props.busy}>{ "Add Task" }</button>
        </form>
    }
}

#[derive(Properties, PartialEq)]
pub struct TaskListProps {
    pub tasks: Vec<TaskDto>,
    pub show_owner: bool,
    pub draft: Option<EditDraft>,
    pub busy: bool,
    pub on_edit: Callback<String>,
    pub on_delete: Callback<String>,
    pub on_draft_title: Callback<String>,
    pub on_draft_description: Callback<String>,
    pub on_save: Callback<()>,
    pub on_cancel: Callback<()>,
}

#[function_component(TaskList)]
pub fn task_list(props: &TaskListProps) -> Html {
    html! {
        <div class="panel list">
            {
                for props.tasks.iter().map(|task| {
                    match props.draft.as_ref().filter(|draft| draft.task_id == task.id) {
                        Some(draft) => edit_row(props, draft),
                        None => task_row(props, task),
                    }
                })
            }
        </div>
    }
}

fn task_row(props: &TaskListProps, task: &TaskDto) -> Html {
    let on_edit = props.on_edit.clone();
    let on_delete = props.on_delete.clone();
    let edit_id = task.id.clone();
    let delete_id = task.id.clone();

    html! {
        <div class="row" key={task.id.clone()}>
            <div class="body">
                <div class="title">{ &task.title }</div>
                {
                    if task.description.is_empty() {
                        html! {}
                    } else {
                        html! { <div class="description">{ &task.description }</div> }
                    }
                }
                <div class="meta">
                    <span class="badge">{ format!("Created {}", created_label(task.created_at.as_deref())) }</span>
                    {
                        match task.created_by.as_deref().filter(|_| props.show_owner) {
                            Some(owner) => html! { <span class="badge">{ format!("by {owner}") }</span> },
                            None => html! {},
                        }
                    }
                </div>
            </div>
            <div class="actions">
                <button class="btn" disabled={props.busy} onclick={move |_| on_edit.emit(edit_id.clone())}>{ "Edit" }</button>
                <button class="btn danger" disabled={props.busy} onclick={move |_| on_delete.emit(delete_id.clone())}>{ "Delete" }</button>
            </div>
        </div>
    }
}

fn edit_row(props: &TaskListProps, draft: &EditDraft) -> Html {
    let on_title = props.on_draft_title.clone();
    let on_description = props.on_draft_description.clone();
    let on_save = props.on_save.clone();
    let on_cancel = props.on_cancel.clone();

    html! {
        <form
            class="row editing"
            key={draft.task_id.clone()}
            onsubmit={move |e: yew::SubmitEvent| {
                e.prevent_default();
                on_save.emit(());
            }}
        >
            <div class="body">
                <input
                    type="text"
                    value={draft.title.clone()}
                    oninput={move |e: yew::InputEvent| {
                        let input: HtmlInputElement = e.target_unchecked_into();
                        on_title.emit(input.value());
                    }}
                />
                <textarea
                    value={draft.description.clone()}
                    oninput={move |e: yew::InputEvent| {
                        let input: HtmlTextAreaElement = e.target_unchecked_into();
                        on_description.emit(input.value());
                    }}
                />
            </div>
            <div class="actions">
                <button class="btn primary" type="submit" disabled={props.busy}>{ "Save" }</button>
                <button class="btn" type="button" onclick={move |_| on_cancel.emit(())}>{ "Cancel" }</button>
            </div>
        </form>
    }
}

#[derive(Properties, PartialEq)]
pub struct FacetPanelProps {
    pub title: String,
    pub items: Vec<(String, usize)>,
    pub selected: Option<String>,
    pub on_select: Callback<Option<String>>,
}

#[function_component(FacetPanel)]
pub fn facet_panel(props: &FacetPanelProps) -> Html {
    let on_select_all = props.on_select.clone();

    html! {
        <div class="panel">
            <div class="header">{ &props.title }</div>
            <div class="details">
                <div
                    class={if props.selected.is_none() { "facet active" } else { "facet" }}
                    onclick={move |_| on_select_all.emit(None)}
                >
                    <span>{ "All users" }</span>
                </div>

                {
                    for props.items.iter().map(|(owner, count)| {
                        let owner_name = owner.clone();
                        let on_select = props.on_select.clone();
                        let is_active = props.selected.as_deref() == Some(owner.as_str());
                        let class = if is_active { "facet active" } else { "facet" };
                        html! {
                            <div class={class} onclick={move |_| on_select.emit(Some(owner_name.clone()))}>
                                <span>{ owner }</span>
                                <span class="badge">{ *count }</span>
                            </div>
                        }
                    })
                }
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct PaginationBarProps {
    pub summary: Option<String>,
    pub can_previous: bool,
    pub can_next: bool,
    pub on_previous: Callback<()>,
    pub on_next: Callback<()>,
}

#[function_component(PaginationBar)]
pub fn pagination_bar(props: &PaginationBarProps) -> Html {
    let on_previous = props.on_previous.clone();
    let on_next = props.on_next.clone();

    html! {
        <div class="pagination">
            <span class="summary">{ props.summary.clone().unwrap_or_default() }</span>
            <div class="pager">
                <button class="btn" disabled={!props.can_previous} onclick={move |_| on_previous.emit(())}>
                    { "Previous 10" }
                </button>
                <button class="btn" disabled={!props.can_next} onclick={move |_| on_next.emit(())}>
                    { "Next 10" }
                </button>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct EmptyStateProps {
    pub hint: &'static str,
}

#[function_component(EmptyState)]
pub fn empty_state(props: &EmptyStateProps) -> Html {
    html! {
        <div class="panel empty">
            <div class="title">{ "No tasks found" }</div>
            <div class="hint">{ props.hint }</div>
        </div>
    }
}
