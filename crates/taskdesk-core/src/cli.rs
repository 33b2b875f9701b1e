use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::API_URL_ENV;
use crate::session::Role;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdesk",
    version,
    about = "Taskdesk: personal and admin task dashboards from the terminal",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "api-url", env = API_URL_ENV, global = true)]
    pub api_url: Option<String>,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show one page of tasks.
    List(ListArgs),
    /// Create a task, then show the page it lands on.
    Add(AddArgs),
    /// Change the title or description of a listed task.
    Edit(EditArgs),
    /// Delete a listed task after confirmation.
    Delete(DeleteArgs),
    /// Manage the stored session.
    #[command(subcommand)]
    Session(SessionCommand),
    /// Forget the stored session.
    Logout,
}

/// Which page the command works on. `--page` is one-based.
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub page: u64,

    /// Every user's tasks (admin sessions only).
    #[arg(long)]
    pub all: bool,
}

impl PageArgs {
    pub fn page_index(&self) -> usize {
        usize::try_from(self.page.saturating_sub(1)).unwrap_or(usize::MAX)
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Only rows created by this user (with --all).
    #[arg(long, requires = "all")]
    pub user: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(short = 'd', long, default_value = "")]
    pub description: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short = 'd', long)]
    pub description: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub id: String,

    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    pub yes: bool,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommand {
    /// Store a session issued by the sign-in flow.
    Set {
        #[arg(long)]
        token: String,
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = RoleArg::User)]
        role: RoleArg,
    },
    /// Print the stored session.
    Show,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleArg {
    Admin,
    User,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::User => Role::User,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn list_defaults_to_first_own_page() {
        let cli = GlobalCli::try_parse_from(["taskdesk", "list"]).unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.page.page_index(), 0);
        assert!(!args.page.all);
        assert_eq!(args.page.search, "");
    }

    #[test]
    fn page_flag_is_one_based() {
        let cli = GlobalCli::try_parse_from(["taskdesk", "list", "--page", "3", "--search", "tax"]).unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.page.page_index(), 2);
        assert!(GlobalCli::try_parse_from(["taskdesk", "list", "--page", "0"]).is_err());
    }

    #[test]
    fn user_facet_requires_admin_view() {
        assert!(GlobalCli::try_parse_from(["taskdesk", "list", "--user", "ana"]).is_err());
        assert!(GlobalCli::try_parse_from(["taskdesk", "list", "--all", "--user", "ana"]).is_ok());
    }

    #[test]
    fn session_set_parses_role() {
        let cli = GlobalCli::try_parse_from([
            "taskdesk", "session", "set", "--token", "t", "--email", "a@b.c", "--role", "admin",
        ])
        .unwrap();
        match cli.command {
            Command::Session(SessionCommand::Set { role, .. }) => assert_eq!(Role::from(role), Role::Admin),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = GlobalCli::try_parse_from(["taskdesk", "logout", "-vv", "--api-url", "http://h:1"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.api_url.as_deref(), Some("http://h:1"));
    }
}
