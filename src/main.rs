//! usrgrp-editor binary entry point.
//!
//! With a subcommand it runs one action against the directory files and
//! exits. Without one it starts the TUI in raw mode and restores the terminal
//! state on exit.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use usrgrp_editor::app::config::{KEYBINDS_FILE, SETTINGS_FILE, Settings, config_file_path};
use usrgrp_editor::app::controller::{Controller, Notice, NoticeLevel, NoticeQueue, Notifier};
use usrgrp_editor::app::keymap::Keymap;
use usrgrp_editor::app::{self, AppState};
use usrgrp_editor::sys::{self, AccountEntry, CommentPolicy, DirectoryModel};

#[derive(Parser)]
#[command(name = "usrgrp-editor", version, about = "Edit local UNIX accounts and groups")]
struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/usrgrp-editor/usrgrp-editor.conf)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, env = "USRGRP_PASSWD")]
    passwd: Option<PathBuf>,
    #[arg(long, env = "USRGRP_GROUP")]
    group: Option<PathBuf>,
    /// OS family to drive, e.g. debian or freebsd (default: detect)
    #[arg(long, env = "USRGRP_PLATFORM")]
    platform: Option<String>,
    /// What to do with blank and comment lines in the directory files
    #[arg(long, value_enum)]
    comments: Option<CommentsArg>,
    /// Do not take the advisory lock around reads and writes
    #[arg(long)]
    no_lock: bool,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CommentsArg {
    Preserve,
    Drop,
}

#[derive(Subcommand)]
enum Command {
    /// List accounts (regular ones unless told otherwise)
    Users {
        #[arg(long, conflicts_with = "all")]
        system: bool,
        #[arg(long)]
        all: bool,
    },
    /// List groups
    Groups,
    /// Create an account with the platform's command
    AddUser { name: String },
    /// Create a group with the platform's command
    AddGroup { name: String },
    /// Create the home directory of an existing account
    MakeHome { name: String },
    /// Parse both files and report counts
    Check,
}

impl Cli {
    fn settings(&self) -> Settings {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| config_file_path(SETTINGS_FILE));
        let mut s = Settings::load_or_init(&path);
        if let Some(p) = &self.passwd {
            s.passwd_path = p.clone();
        }
        if let Some(g) = &self.group {
            s.group_path = g.clone();
        }
        if let Some(id) = &self.platform {
            s.platform = Some(id.clone());
        }
        if let Some(c) = self.comments {
            s.comments = match c {
                CommentsArg::Preserve => CommentPolicy::Preserve,
                CommentsArg::Drop => CommentPolicy::Drop,
            };
        }
        if self.no_lock {
            s.lock = false;
        }
        if let Some(l) = &self.log_file {
            s.log_file = Some(l.clone());
        }
        s
    }
}

/// Prints success notices for one-shot commands. Errors are printed once by
/// `main` from the returned result.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, notice: Notice) {
        if notice.level == NoticeLevel::Info {
            println!("{}", notice.message);
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = if cli.command.is_some() {
        init_stderr_logging();
        cli.settings()
    } else {
        // The log file location comes from the settings, so problems reading
        // them go to stderr before the terminal is taken over.
        tracing::subscriber::with_default(stderr_subscriber(), || cli.settings())
    };

    let res = match cli.command {
        Some(command) => run_command(command, &settings),
        None => {
            init_file_logging(&settings.log_file());
            run_tui(&settings)
        }
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<usrgrp_editor::Error>() {
                Some(e) => eprintln!("error: [{}] {e}", e.kind()),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn stderr_subscriber() -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish()
}

fn init_stderr_logging() {
    let _ = tracing::subscriber::set_global_default(stderr_subscriber());
}

/// The TUI owns the terminal, so logs go to a file. Logging is skipped when
/// the file cannot be opened.
fn init_file_logging(path: &Path) {
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn run_command(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Users { system, all } => {
            let model = open_model(settings)?;
            let rows: Vec<&AccountEntry> = if all {
                model.accounts().iter().collect()
            } else if system {
                model.system_accounts().collect()
            } else {
                model.regular_accounts().collect()
            };
            for a in rows {
                println!("{:<20} {:>6} {:>6}  {:<28} {}", a.name, a.uid, a.gid, a.home, a.shell);
            }
        }
        Command::Groups => {
            let model = open_model(settings)?;
            for g in model.groups() {
                println!("{:<20} {:>6}  {}", g.name, g.gid, g.members.join(","));
            }
        }
        Command::Check => {
            let model = open_model(settings)?;
            let regular = model.regular_accounts().count();
            let system = model.system_accounts().count();
            println!(
                "{}: {} accounts ({regular} regular, {system} system)",
                settings.passwd_path.display(),
                model.accounts().len()
            );
            println!("{}: {} groups", settings.group_path.display(), model.groups().len());
        }
        Command::AddUser { name } => controller(settings)?.add_user(&name)?,
        Command::AddGroup { name } => controller(settings)?.add_group(&name)?,
        Command::MakeHome { name } => controller(settings)?.create_home_dir(&name)?,
    }
    Ok(())
}

fn open_model(settings: &Settings) -> Result<DirectoryModel> {
    Ok(DirectoryModel::open(settings.directory_paths(), settings.comments)?)
}

fn controller(settings: &Settings) -> Result<Controller> {
    warn_if_unprivileged();
    Ok(Controller::from_settings(settings, Box::new(ConsoleNotifier))?)
}

fn warn_if_unprivileged() {
    if !sys::is_root() {
        warn!("not running as root; account commands will likely be refused");
    }
}

fn run_tui(settings: &Settings) -> Result<()> {
    warn_if_unprivileged();
    let notices = NoticeQueue::default();
    let controller = Controller::from_settings(settings, Box::new(notices.clone()))?;
    let keymap = Keymap::load_or_init(&config_file_path(KEYBINDS_FILE));
    let mut state = AppState::new(controller, notices, keymap);
    info!("starting TUI");

    let mut terminal = init_terminal().context("init terminal")?;

    let res = app::run(&mut terminal, &mut state);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

/// Initialize a Crossterm-backed `ratatui` terminal in raw mode.
fn init_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}
