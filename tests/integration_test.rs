// Integration tests for usrgrp-editor
//
// Account commands go through a recording runner, so nothing here needs root
// or touches the real /etc files.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use usrgrp_editor::app::config::Settings;
use usrgrp_editor::app::controller::{Controller, NoticeLevel, NoticeQueue};
use usrgrp_editor::sys::{
    AccountEntry, BsdBackend, CommandRunner, CommandStatus, LinuxBackend, Platform,
    PlatformBackend, select_backend,
};

/// Records invocations. When `useradd_writes` is set, a successful `useradd`
/// appends a line to that file the way the real command would.
#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<String>>,
    fail: Option<(&'static str, i32)>,
    useradd_writes: Option<PathBuf>,
}

impl FakeRunner {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandStatus> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line);
        if let Some((p, code)) = self.fail {
            if p == program {
                return Ok(CommandStatus {
                    code: Some(code),
                    stderr: format!("{program}: refused"),
                });
            }
        }
        if let (Some(passwd), "useradd") = (&self.useradd_writes, program) {
            let mut f = fs::OpenOptions::new().append(true).open(passwd)?;
            let name = args.last().copied().unwrap_or_default();
            writeln!(f, "{name}:x:1001:1001::/home/{name}:/bin/sh")?;
        }
        Ok(CommandStatus {
            code: Some(0),
            stderr: String::new(),
        })
    }
}

fn settings_in(dir: &Path, passwd: &str, group: &str) -> Settings {
    let s = Settings {
        passwd_path: dir.join("passwd"),
        group_path: dir.join("group"),
        ..Settings::default()
    };
    fs::write(&s.passwd_path, passwd).unwrap();
    fs::write(&s.group_path, group).unwrap();
    s
}

fn carol(home: &Path) -> AccountEntry {
    AccountEntry {
        name: "carol".into(),
        password: "x".into(),
        uid: 1002,
        gid: 1002,
        comment: String::new(),
        home: home.display().to_string(),
        shell: "/bin/sh".into(),
    }
}

#[test]
fn scenario_b_add_user_then_reload_shows_account() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path(), "root:x:0:0:root:/root:/bin/bash\n", "root:x:0:\n");
    let runner = Arc::new(FakeRunner {
        useradd_writes: Some(settings.passwd_path.clone()),
        ..FakeRunner::default()
    });
    let notices = NoticeQueue::default();
    let mut c = Controller::with_runner(
        &settings,
        &Platform::named("debian"),
        runner.clone(),
        Box::new(notices.clone()),
    )
    .unwrap();

    c.add_user("bob").unwrap();

    assert_eq!(runner.calls(), ["useradd -- bob"]);
    let bob = c.model().account("bob").expect("bob reloaded from disk");
    assert_eq!(bob.uid, 1001);
    let drained = notices.drain();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].level, NoticeLevel::Info);
}

#[test]
fn scenario_c_make_home_dir_creates_chowns_and_moves() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("home").join("carol");
    let runner = Arc::new(FakeRunner::default());
    let backend = LinuxBackend::new(runner.clone());

    backend.make_home_dir(&carol(&home)).unwrap();

    assert!(home.is_dir());
    let home_s = home.display().to_string();
    assert_eq!(
        runner.calls(),
        [
            format!("chown 1002:1002 {home_s}"),
            format!("usermod -d {home_s} -m -- carol"),
        ]
    );
}

#[test]
fn make_home_dir_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("carol");
    let runner = Arc::new(FakeRunner::default());
    let backend = BsdBackend::new(runner.clone());
    let account = carol(&home);

    backend.make_home_dir(&account).unwrap();
    fs::write(home.join("keep"), "x").unwrap();
    backend.make_home_dir(&account).unwrap();

    assert!(home.join("keep").exists());
    let calls = runner.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0..2], calls[2..4]);
    assert!(calls[1].starts_with("pw usermod -d"));
}

#[test]
fn failed_chown_leaves_directory_for_retry() {
    let dir = tempfile::tempdir().unwrap();
    let home = dir.path().join("carol");
    let runner = Arc::new(FakeRunner {
        fail: Some(("chown", 1)),
        ..FakeRunner::default()
    });
    let backend = LinuxBackend::new(runner.clone());

    let err = backend.make_home_dir(&carol(&home)).unwrap_err();

    assert_eq!(err.kind(), "filesystem");
    assert!(home.is_dir());
    // usermod never ran.
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn scenario_d_unlisted_family_fails_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path(), "", "");
    let err = select_backend(&Platform::named("arch"), Arc::new(FakeRunner::default()))
        .err()
        .unwrap();
    assert_eq!(err.kind(), "platform");

    let settings = Settings {
        platform: Some("arch".into()),
        ..settings
    };
    let res = Controller::from_settings(&settings, Box::new(NoticeQueue::default()));
    assert_eq!(res.err().map(|e| e.kind()), Some("platform"));
}

#[test]
fn derived_family_selects_backend() {
    let ubuntu = Platform::from_os_release("ID=ubuntu\nID_LIKE=debian\n");
    let b = select_backend(&ubuntu, Arc::new(FakeRunner::default())).unwrap();
    assert_eq!(b.name(), "linux");
    let bsd = select_backend(&Platform::named("freebsd"), Arc::new(FakeRunner::default())).unwrap();
    assert_eq!(bsd.name(), "freebsd");
}

#[test]
fn failed_add_group_keeps_files_and_reports_kind() {
    let dir = tempfile::tempdir().unwrap();
    let group = "root:x:0:\nwheel:x:10:alice\n";
    let settings = settings_in(dir.path(), "root:x:0:0:root:/root:/bin/bash\n", group);
    let runner = Arc::new(FakeRunner {
        fail: Some(("groupadd", 9)),
        ..FakeRunner::default()
    });
    let notices = NoticeQueue::default();
    let mut c = Controller::with_runner(
        &settings,
        &Platform::named("centos"),
        runner,
        Box::new(notices.clone()),
    )
    .unwrap();

    let err = c.add_group("wheel").unwrap_err();

    assert_eq!(err.kind(), "command");
    assert!(err.to_string().contains("groupadd: refused"));
    assert_eq!(c.model().groups().len(), 2);
    assert_eq!(fs::read_to_string(&settings.group_path).unwrap(), group);
    assert_eq!(notices.drain()[0].level, NoticeLevel::Error);
}

#[test]
fn edit_then_commit_rewrites_only_edited_field() {
    let dir = tempfile::tempdir().unwrap();
    let passwd = "# keep me\nroot:x:0:0:root:/root:/bin/bash\nbob:x:1001:1001:Bob:/home/bob:/bin/sh\n";
    let settings = settings_in(dir.path(), passwd, "bob:x:1001:\n");
    let mut c = Controller::with_runner(
        &settings,
        &Platform::named("debian"),
        Arc::new(FakeRunner::default()),
        Box::new(NoticeQueue::default()),
    )
    .unwrap();

    let mut draft = c.model().accounts().to_vec();
    draft[1].comment = "Robert".into();
    c.save_accounts(draft, c.model().generation()).unwrap();

    assert_eq!(
        fs::read_to_string(&settings.passwd_path).unwrap(),
        "# keep me\nroot:x:0:0:root:/root:/bin/bash\nbob:x:1001:1001:Robert:/home/bob:/bin/sh\n"
    );
}
