//! Per-invocation launch path of a wrapper.
//!
//! ```text
//!  wrapper script ──▶ fplaunch launch --name N --id ID --wrapper W -- ARGS
//!                         │
//!                         ├─ SystemBinaryResolver::resolve(N, exclude = W)
//!                         ├─ PreferenceStore::load(N)
//!                         ├─ DecisionEngine::decide(...)   (may prompt)
//!                         ├─ PreferenceStore::save(...)    (if decided)
//!                         └─ exec system binary | flatpak run ID ARGS
//! ```

mod decision;
mod exec;
mod preference;
mod prompt;

pub use decision::{Decision, DecisionEngine, ForceMode, LaunchTarget, PromptReply, Prompter};
pub use exec::{LaunchCommand, exec_into};
pub use preference::{Choice, Preference, PreferenceStore};
pub use prompt::{TerminalPrompter, parse_reply};

#[cfg(test)]
pub use decision::MockPrompter;

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{FplaunchError, Result};
use crate::resolver::SystemBinaryResolver;
use crate::security::is_valid_app_id;
use crate::wrapper::LauncherName;

/// One wrapper invocation.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub name: LauncherName,
    pub app_id: String,
    /// Install path of the calling wrapper, excluded from resolution.
    pub wrapper: Option<PathBuf>,
    pub args: Vec<OsString>,
}

/// Invocation environment, gathered once by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct LaunchEnv {
    /// stdin and stdout are both terminals.
    pub interactive: bool,
    pub force: Option<ForceMode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub decision: Decision,
    pub command: LaunchCommand,
}

/// Decide what to run and persist the decision, without executing anything.
pub fn plan_launch(
    req: &LaunchRequest,
    store: &PreferenceStore,
    resolver: &SystemBinaryResolver,
    env: LaunchEnv,
    prompter: &mut dyn Prompter,
) -> Result<LaunchPlan> {
    if !is_valid_app_id(&req.app_id) {
        return Err(FplaunchError::InvalidAppId(req.app_id.clone()));
    }

    let candidate = resolver.resolve(req.name.as_str(), req.wrapper.as_deref());
    let pref = store.load(&req.name);
    debug!(
        "Launching {}: preference={}, system candidate={:?}",
        req.name,
        pref.label(),
        candidate.as_ref().map(|c| &c.path)
    );

    let decision = DecisionEngine::new(prompter, env.interactive, env.force).decide(
        &req.name,
        &req.app_id,
        pref,
        candidate.as_ref().map(|c| c.path.as_path()),
    )?;

    if let Some(choice) = decision.persist
        && let Err(e) = store.save(&req.name, choice)
    {
        // Launching matters more than remembering.
        warn!("Could not store preference for {}: {}", req.name, e);
    }

    let command = match &decision.target {
        LaunchTarget::System(path) => LaunchCommand::system(path, &req.args),
        LaunchTarget::Flatpak => {
            let flatpak = resolver
                .resolve("flatpak", None)
                .ok_or(FplaunchError::FlatpakNotFound)?;
            LaunchCommand::flatpak(&flatpak.path, &req.app_id, &req.args)
        }
    };

    Ok(LaunchPlan { decision, command })
}

/// Plan, then replace the process. Returns only on failure.
pub fn run(
    req: &LaunchRequest,
    store: &PreferenceStore,
    resolver: &SystemBinaryResolver,
    env: LaunchEnv,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let plan = plan_launch(req, store, resolver, env, prompter)?;
    exec_into(&plan.command)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::paths::Paths;
    use crate::resolver::{AllowRule, MAX_DIR_LEN, OwnershipPolicy, ResolverConfig};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    struct World {
        _tmp: tempfile::TempDir,
        paths: Paths,
        sys: PathBuf,
        resolver: SystemBinaryResolver,
    }

    fn exe(path: &Path, body: &str) {
        fs::write(path, body).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Home with a wrapper for `name`, and a system dir holding `flatpak`.
    fn world(name: &str, id: &str) -> World {
        let tmp = tempfile::tempdir().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let home = root.join("home");
        let sys = root.join("sys/bin");
        let paths = Paths::under_home(&home);
        fs::create_dir_all(&paths.bin_dir).unwrap();
        fs::create_dir_all(&sys).unwrap();

        let wrapper = crate::wrapper::render_wrapper(
            &LauncherName::parse(name).unwrap(),
            id,
            &paths.bin_dir.join(name),
            Path::new("/usr/bin/fplaunch"),
        )
        .unwrap();
        exe(&paths.bin_dir.join(name), &wrapper);
        exe(&sys.join("flatpak"), "#!/bin/sh\n");

        let resolver = SystemBinaryResolver::new(ResolverConfig {
            home: home.clone(),
            search_dirs: vec![sys.clone(), paths.bin_dir.clone()],
            allow_rules: vec![AllowRule::Exact(sys.clone())],
            ownership: OwnershipPolicy::Any,
            max_dir_len: MAX_DIR_LEN,
        });
        World {
            _tmp: tmp,
            paths,
            sys,
            resolver,
        }
    }

    fn request(w: &World, name: &str, id: &str) -> LaunchRequest {
        LaunchRequest {
            name: LauncherName::parse(name).unwrap(),
            app_id: id.to_string(),
            wrapper: Some(w.paths.bin_dir.join(name)),
            args: vec![OsString::from("file.pdf")],
        }
    }

    fn silent() -> MockPrompter {
        let mut p = MockPrompter::new();
        p.expect_ask().never();
        p
    }

    const INTERACTIVE: LaunchEnv = LaunchEnv {
        interactive: true,
        force: None,
    };

    #[test]
    fn sandbox_only_app_runs_flatpak_and_remembers() {
        let w = world("firefox", "org.mozilla.firefox");
        let store = PreferenceStore::new(&w.paths);
        let req = request(&w, "firefox", "org.mozilla.firefox");

        let plan = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut silent()).unwrap();
        assert_eq!(
            plan.command,
            LaunchCommand::flatpak(&w.sys.join("flatpak"), "org.mozilla.firefox", &req.args)
        );
        assert_eq!(store.load(&req.name), Preference::PreferFlatpak);
    }

    #[test]
    fn both_installed_prompts_once() {
        let w = world("evince", "org.gnome.Evince");
        exe(&w.sys.join("evince"), "#!/bin/sh\n");
        let store = PreferenceStore::new(&w.paths);
        let req = request(&w, "evince", "org.gnome.Evince");

        let mut p = MockPrompter::new();
        p.expect_ask()
            .times(1)
            .returning(|_, _, _| Ok(PromptReply::Chose(Choice::System)));
        let plan = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut p).unwrap();
        assert_eq!(plan.command, LaunchCommand::system(&w.sys.join("evince"), &req.args));
        assert_eq!(store.load(&req.name), Preference::PreferSystem);

        let plan = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut silent()).unwrap();
        assert_eq!(plan.command.program, w.sys.join("evince"));
    }

    #[test]
    fn removed_system_package_drifts_to_flatpak() {
        let w = world("evince", "org.gnome.Evince");
        let store = PreferenceStore::new(&w.paths);
        let req = request(&w, "evince", "org.gnome.Evince");
        store.save(&req.name, Choice::System).unwrap();

        let plan = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut silent()).unwrap();
        assert_eq!(plan.decision.target, LaunchTarget::Flatpak);
        assert_eq!(store.load(&req.name), Preference::PreferFlatpak);
    }

    #[test]
    fn non_interactive_first_run_does_not_persist() {
        let w = world("evince", "org.gnome.Evince");
        exe(&w.sys.join("evince"), "#!/bin/sh\n");
        let store = PreferenceStore::new(&w.paths);
        let req = request(&w, "evince", "org.gnome.Evince");

        let plan = plan_launch(&req, &store, &w.resolver, LaunchEnv::default(), &mut silent())
            .unwrap();
        assert_eq!(plan.decision.target, LaunchTarget::Flatpak);
        assert_eq!(store.load(&req.name), Preference::NoPreference);
    }

    #[test]
    fn missing_flatpak_is_an_error() {
        let w = world("firefox", "org.mozilla.firefox");
        fs::remove_file(w.sys.join("flatpak")).unwrap();
        let store = PreferenceStore::new(&w.paths);
        let req = request(&w, "firefox", "org.mozilla.firefox");

        let err = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut silent()).unwrap_err();
        assert!(matches!(err, FplaunchError::FlatpakNotFound));
    }

    #[test]
    fn invalid_app_id_is_refused() {
        let w = world("firefox", "org.mozilla.firefox");
        let store = PreferenceStore::new(&w.paths);
        let mut req = request(&w, "firefox", "org.mozilla.firefox");
        req.app_id = "org.x;reboot".to_string();

        let err = plan_launch(&req, &store, &w.resolver, INTERACTIVE, &mut silent()).unwrap_err();
        assert!(matches!(err, FplaunchError::InvalidAppId(_)));
    }
}
