//! Platform account backends.
//!
//! Each backend issues the host's own account commands (`useradd`, `pw`, ...)
//! and judges success by exit status alone. Exactly one backend is chosen at
//! startup by matching the detected [`Platform`] against each variant's
//! declared families.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sys::entry::AccountEntry;
use crate::sys::platform::Platform;

/// Exit status and stderr of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandStatus {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external program to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandStatus>;
}

/// Spawns real processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandStatus> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;
        Ok(CommandStatus {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Account-mutation capability of one OS family.
pub trait PlatformBackend {
    fn name(&self) -> &'static str;

    fn runner(&self) -> &dyn CommandRunner;

    /// Create an account with the platform's defaults.
    fn add_user(&self, name: &str) -> Result<()>;

    fn add_group(&self, name: &str) -> Result<()>;

    /// Move the account's home to `account.home`, carrying existing files.
    fn change_home(&self, account: &AccountEntry) -> Result<()>;

    /// Create `account.home` if it is missing, hand it to `uid:gid`, then run
    /// [`change_home`](Self::change_home) so the OS record points at it.
    ///
    /// Creation is skipped when the path exists; ownership and `change_home`
    /// always run, so calling this again after a partial failure finishes the
    /// job.
    fn make_home_dir(&self, account: &AccountEntry) -> Result<()> {
        if account.home.is_empty() {
            return Err(Error::file_system(
                &account.home,
                format!("account '{}' has no home directory path", account.name),
            ));
        }
        let home = Path::new(&account.home);
        if !home.exists() {
            fs::create_dir_all(home)
                .map_err(|e| Error::file_system(home, format!("mkdir -p failed: {e}")))?;
            info!(home = %home.display(), account = %account.name, "created home directory");
        }

        let owner = format!("{}:{}", account.uid, account.gid);
        let status = self
            .runner()
            .run("chown", &[owner.as_str(), account.home.as_str()])
            .map_err(|e| Error::file_system(home, format!("failed to execute chown: {e}")))?;
        if !status.success() {
            return Err(Error::file_system(home, describe_failure("chown", &status)));
        }

        self.change_home(account)
    }
}

/// shadow-utils backend for Linux distributions.
pub struct LinuxBackend {
    runner: Arc<dyn CommandRunner>,
}

impl LinuxBackend {
    pub const FAMILIES: &'static [&'static str] = &["debian", "ubuntu", "centos", "rhel", "fedora"];

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PlatformBackend for LinuxBackend {
    fn name(&self) -> &'static str {
        "linux"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn add_user(&self, name: &str) -> Result<()> {
        run_checked(self.runner(), "useradd", &["--", name])?;
        info!(user = name, "created user");
        Ok(())
    }

    fn add_group(&self, name: &str) -> Result<()> {
        run_checked(self.runner(), "groupadd", &["--", name])?;
        info!(group = name, "created group");
        Ok(())
    }

    fn change_home(&self, account: &AccountEntry) -> Result<()> {
        run_checked(
            self.runner(),
            "usermod",
            &["-d", account.home.as_str(), "-m", "--", account.name.as_str()],
        )?;
        info!(user = %account.name, home = %account.home, "changed home directory");
        Ok(())
    }
}

/// `pw(8)` backend for FreeBSD.
pub struct BsdBackend {
    runner: Arc<dyn CommandRunner>,
}

impl BsdBackend {
    pub const FAMILIES: &'static [&'static str] = &["freebsd"];

    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl PlatformBackend for BsdBackend {
    fn name(&self) -> &'static str {
        "freebsd"
    }

    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn add_user(&self, name: &str) -> Result<()> {
        run_checked(self.runner(), "pw", &["useradd", name])?;
        info!(user = name, "created user");
        Ok(())
    }

    fn add_group(&self, name: &str) -> Result<()> {
        run_checked(self.runner(), "pw", &["groupadd", name])?;
        info!(group = name, "created group");
        Ok(())
    }

    fn change_home(&self, account: &AccountEntry) -> Result<()> {
        run_checked(
            self.runner(),
            "pw",
            &["usermod", "-d", account.home.as_str(), "-m", account.name.as_str()],
        )?;
        info!(user = %account.name, home = %account.home, "changed home directory");
        Ok(())
    }
}

struct Variant {
    families: &'static [&'static str],
    build: fn(Arc<dyn CommandRunner>) -> Box<dyn PlatformBackend>,
}

const VARIANTS: &[Variant] = &[
    Variant {
        families: LinuxBackend::FAMILIES,
        build: build_linux,
    },
    Variant {
        families: BsdBackend::FAMILIES,
        build: build_bsd,
    },
];

fn build_linux(runner: Arc<dyn CommandRunner>) -> Box<dyn PlatformBackend> {
    Box::new(LinuxBackend::new(runner))
}

fn build_bsd(runner: Arc<dyn CommandRunner>) -> Box<dyn PlatformBackend> {
    Box::new(BsdBackend::new(runner))
}

/// Pick the backend for `platform`, or fail with
/// [`Error::UnsupportedPlatform`] when no variant declares it.
pub fn select_backend(
    platform: &Platform,
    runner: Arc<dyn CommandRunner>,
) -> Result<Box<dyn PlatformBackend>> {
    let variant = VARIANTS
        .iter()
        .find(|v| platform.matches(v.families))
        .ok_or_else(|| Error::UnsupportedPlatform(platform.to_string()))?;
    let backend = (variant.build)(runner);
    debug!(platform = %platform, backend = backend.name(), "selected account backend");
    Ok(backend)
}

fn run_checked(runner: &dyn CommandRunner, program: &str, args: &[&str]) -> Result<()> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(%command, "running account command");
    let status = runner.run(program, args).map_err(|e| Error::Command {
        command: command.clone(),
        detail: format!("failed to execute: {e}"),
    })?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Command {
            detail: describe_failure(&command, &status),
            command,
        })
    }
}

fn describe_failure(command: &str, status: &CommandStatus) -> String {
    match (&status.code, status.stderr.is_empty()) {
        (_, false) => status.stderr.clone(),
        (Some(code), true) => format!("{command} exited with status {code}"),
        (None, true) => format!("{command} was terminated by a signal"),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every invocation and answers with a fixed exit code, or a
    /// per-program override.
    #[derive(Default)]
    pub struct RecordingRunner {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub fail: Mutex<Vec<(String, i32)>>,
    }

    impl RecordingRunner {
        pub fn failing(program: &str, code: i32) -> Self {
            let r = Self::default();
            r.fail.lock().unwrap().push((program.to_string(), code));
            r
        }

        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandStatus> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(|a| a.to_string()));
            self.calls.lock().unwrap().push(call);
            let code = self
                .fail
                .lock()
                .unwrap()
                .iter()
                .find(|(p, _)| p == program)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            Ok(CommandStatus {
                code: Some(code),
                stderr: String::new(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;

    fn account(name: &str, uid: u32, home: &str) -> AccountEntry {
        AccountEntry {
            name: name.into(),
            password: "x".into(),
            uid,
            gid: uid,
            comment: String::new(),
            home: home.into(),
            shell: "/bin/sh".into(),
        }
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn linux_commands() {
        let runner = Arc::new(RecordingRunner::default());
        let backend = LinuxBackend::new(runner.clone());
        backend.add_user("bob").unwrap();
        backend.add_group("devs").unwrap();
        backend.change_home(&account("bob", 1001, "/srv/bob")).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                argv(&["useradd", "--", "bob"]),
                argv(&["groupadd", "--", "devs"]),
                argv(&["usermod", "-d", "/srv/bob", "-m", "--", "bob"]),
            ]
        );
    }

    #[test]
    fn bsd_commands() {
        let runner = Arc::new(RecordingRunner::default());
        let backend = BsdBackend::new(runner.clone());
        backend.add_user("bob").unwrap();
        backend.add_group("devs").unwrap();
        backend.change_home(&account("bob", 1001, "/srv/bob")).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                argv(&["pw", "useradd", "bob"]),
                argv(&["pw", "groupadd", "devs"]),
                argv(&["pw", "usermod", "-d", "/srv/bob", "-m", "bob"]),
            ]
        );
    }

    #[test]
    fn non_zero_exit_is_command_error() {
        let runner = Arc::new(RecordingRunner::failing("useradd", 9));
        let backend = LinuxBackend::new(runner);
        let err = backend.add_user("root").unwrap_err();
        assert_eq!(err.kind(), "command");
        assert!(err.to_string().contains("useradd -- root"));
        assert!(err.to_string().contains("status 9"));
    }

    #[test]
    fn make_home_dir_creates_chowns_then_moves() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("carol");
        let home_str = home.to_string_lossy().to_string();
        let runner = Arc::new(RecordingRunner::default());
        let backend = LinuxBackend::new(runner.clone());
        let carol = account("carol", 1002, &home_str);

        backend.make_home_dir(&carol).unwrap();

        assert!(home.is_dir());
        assert_eq!(
            runner.calls(),
            vec![
                argv(&["chown", "1002:1002", home_str.as_str()]),
                argv(&["usermod", "-d", home_str.as_str(), "-m", "--", "carol"]),
            ]
        );
    }

    #[test]
    fn make_home_dir_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("a").join("b");
        let runner = Arc::new(RecordingRunner::default());
        let backend = BsdBackend::new(runner.clone());
        let acct = account("dave", 1003, &home.to_string_lossy());

        backend.make_home_dir(&acct).unwrap();
        backend.make_home_dir(&acct).unwrap();

        assert!(home.is_dir());
        assert_eq!(runner.calls().len(), 4);
        assert_eq!(runner.calls()[0], runner.calls()[2]);
    }

    #[test]
    fn chown_failure_is_file_system_error_and_skips_change_home() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("erin");
        let runner = Arc::new(RecordingRunner::failing("chown", 1));
        let backend = LinuxBackend::new(runner.clone());

        let err = backend
            .make_home_dir(&account("erin", 1004, &home.to_string_lossy()))
            .unwrap_err();

        assert_eq!(err.kind(), "filesystem");
        assert!(home.is_dir(), "created directory is left for a retry");
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn empty_home_is_rejected() {
        let runner = Arc::new(RecordingRunner::default());
        let backend = LinuxBackend::new(runner.clone());
        let err = backend.make_home_dir(&account("x", 1005, "")).unwrap_err();
        assert_eq!(err.kind(), "filesystem");
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn selection_by_family() {
        let runner: Arc<dyn CommandRunner> = Arc::new(RecordingRunner::default());
        let debian = Platform::from_os_release("ID=ubuntu\nID_LIKE=debian\n");
        assert_eq!(select_backend(&debian, runner.clone()).unwrap().name(), "linux");
        assert_eq!(
            select_backend(&Platform::named("freebsd"), runner.clone())
                .unwrap()
                .name(),
            "freebsd"
        );
        let err = select_backend(&Platform::named("arch"), runner).err().unwrap();
        assert!(matches!(err, Error::UnsupportedPlatform(ref p) if p == "arch"));
    }
}
