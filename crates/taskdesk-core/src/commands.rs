use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, bail};
use taskdesk_shared::TaskDto;
use tracing::{info, instrument};

use crate::api::TaskApi;
use crate::cli::{AddArgs, Command, DeleteArgs, EditArgs, ListArgs, PageArgs, SessionCommand};
use crate::controller::{ActionOutcome, LoadOutcome, RefreshReason, TaskSyncController};
use crate::guard::{GuardOutcome, Scope, check_access};
use crate::render::Renderer;
use crate::session::{Session, clear_session};
use crate::session_file::FileSessionStore;

pub const SESSION_EXPIRED: &str = "session expired; sign in again";
const DELETE_PROMPT: &str = "Are you sure you want to delete this task?";

pub struct CommandContext<A> {
    pub api: A,
    pub data_dir: PathBuf,
    pub renderer: Renderer,
}

#[instrument(skip_all)]
pub async fn dispatch<A: TaskApi>(ctx: &CommandContext<A>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List(args) => list(ctx, args).await,
        Command::Add(args) => add(ctx, args).await,
        Command::Edit(args) => edit(ctx, args).await,
        Command::Delete(args) => delete(ctx, args).await,
        Command::Session(SessionCommand::Set { token, email, role }) => {
            let mut store = open_store(ctx)?;
            let session = Session::new(token, email, role.into());
            session.save(&mut store).context("failed to store session")?;
            println!("Session stored for {} ({}).", session.user_email(), session.role().as_str());
            Ok(())
        }
        Command::Session(SessionCommand::Show) => {
            let store = open_store(ctx)?;
            match Session::read(&store) {
                Some(session) => ctx.renderer.print_session(io::stdout().lock(), &session),
                None => {
                    println!("Not signed in.");
                    Ok(())
                }
            }
        }
        Command::Logout => {
            let mut store = open_store(ctx)?;
            clear_session(&mut store);
            println!("Signed out.");
            Ok(())
        }
    }
}

fn open_store<A>(ctx: &CommandContext<A>) -> anyhow::Result<FileSessionStore> {
    FileSessionStore::open(&ctx.data_dir)
        .with_context(|| format!("failed to open session store in {}", ctx.data_dir.display()))
}

/// Session guard plus controller for the requested view. The controller
/// clears the session file itself when the backend rejects the token.
fn open_dashboard<A>(ctx: &CommandContext<A>, page: &PageArgs) -> anyhow::Result<TaskSyncController> {
    let mut store = open_store(ctx)?;
    let scope = if page.all { Scope::All } else { Scope::Own };

    let session = match check_access(&store, scope) {
        GuardOutcome::Granted(session) => session,
        GuardOutcome::Unauthenticated => {
            bail!("not signed in; run `taskdesk session set` with the token from your sign-in")
        }
        GuardOutcome::Forbidden { home } => {
            bail!(
                "--all needs an admin session; your dashboard is {}",
                home.path()
            )
        }
    };

    Ok(TaskSyncController::new(session, scope)
        .starting_at(&page.search, page.page_index())
        .on_invalidate(move || clear_session(&mut store)))
}

fn settle(outcome: Option<LoadOutcome>) -> anyhow::Result<()> {
    match outcome {
        Some(LoadOutcome::Applied) | Some(LoadOutcome::Stale) | None => Ok(()),
        Some(LoadOutcome::Failed(message)) => bail!(message),
        Some(LoadOutcome::Reauthenticate) => bail!(SESSION_EXPIRED),
    }
}

fn settle_action(outcome: ActionOutcome, done: &str) -> anyhow::Result<()> {
    match outcome {
        ActionOutcome::Completed(load) => {
            println!("{done}");
            settle(Some(load))
        }
        ActionOutcome::Failed(message) => bail!(message),
        ActionOutcome::Reauthenticate => bail!(SESSION_EXPIRED),
    }
}

async fn list<A: TaskApi>(ctx: &CommandContext<A>, args: ListArgs) -> anyhow::Result<()> {
    let mut ctrl = open_dashboard(ctx, &args.page)?;
    settle(ctrl.refresh(&ctx.api, RefreshReason::Mount).await)?;

    if let Some(user) = args.user
        && !ctrl.set_user_filter(Some(user.clone()))
    {
        bail!("no tasks by {user} on this page");
    }

    ctx.renderer.print_page(io::stdout().lock(), &ctrl)
}

async fn add<A: TaskApi>(ctx: &CommandContext<A>, args: AddArgs) -> anyhow::Result<()> {
    let mut ctrl = open_dashboard(ctx, &args.page)?;
    let outcome = ctrl.create_task(&ctx.api, &args.title, &args.description).await?;
    settle_action(outcome, "Task created.")?;
    ctx.renderer.print_page(io::stdout().lock(), &ctrl)
}

async fn edit<A: TaskApi>(ctx: &CommandContext<A>, args: EditArgs) -> anyhow::Result<()> {
    if args.title.is_none() && args.description.is_none() {
        bail!("nothing to change; pass --title and/or --description");
    }

    let mut ctrl = open_dashboard(ctx, &args.page)?;
    settle(ctrl.refresh(&ctx.api, RefreshReason::Mount).await)?;
    ctrl.start_edit(&args.id)?;

    let (title, description) = {
        let Some(draft) = ctrl.draft_mut() else {
            bail!("no task is being edited");
        };
        if let Some(title) = args.title {
            draft.title = title;
        }
        if let Some(description) = args.description {
            draft.description = description;
        }
        (draft.title.clone(), draft.description.clone())
    };

    let outcome = ctrl.update_task(&ctx.api, &args.id, &title, &description).await?;
    settle_action(outcome, "Task updated.")?;
    ctx.renderer.print_page(io::stdout().lock(), &ctrl)
}

async fn delete<A: TaskApi>(ctx: &CommandContext<A>, args: DeleteArgs) -> anyhow::Result<()> {
    let mut ctrl = open_dashboard(ctx, &args.page)?;
    settle(ctrl.refresh(&ctx.api, RefreshReason::Mount).await)?;

    let skip_prompt = args.yes;
    let confirm = move |task: &TaskDto| skip_prompt || prompt_confirmation(task);
    match ctrl.delete_task(&ctx.api, &args.id, confirm).await? {
        Some(outcome) => {
            settle_action(outcome, "Task deleted.")?;
            ctx.renderer.print_page(io::stdout().lock(), &ctrl)
        }
        None => {
            info!(id = %args.id, "delete cancelled");
            println!("Nothing deleted.");
            Ok(())
        }
    }
}

fn prompt_confirmation(task: &TaskDto) -> bool {
    let mut out = io::stderr().lock();
    if write!(out, "{} \"{}\" [y/N] ", DELETE_PROMPT, task.title)
        .and_then(|()| out.flush())
        .is_err()
    {
        return false;
    }

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
