//! Driver behaviour against real files: layered config, working directory
//! provisioning, a full simulated run and a scripted frontend process.

use std::fs;
use std::path::Path;

use entroswarm_common::{FitnessMode, ExplorationMode};
use entroswarm_darwinian::CancellationFlag;
use entroswarm_driver::config::ProcessSettings;
use entroswarm_driver::{build_controller, DriverConfig, WorkDir};
use tempfile::TempDir;

fn write_config(dir: &Path, body: &str) -> String {
    let path = dir.join("entroswarm.toml");
    fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn config_file_and_env_layers() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        tmp.path(),
        r#"
tick_interval_ms = 500
simulate = true

[swarm]
exploration_mode = "RANDOM_AND_ITS_REVERSE"
fitness_mode = "min"
seed = 9

[layout]
columns = 3
rows = 2
"#,
    );

    let mut env = config::Map::new();
    env.insert("ENTROSWARM__SWARM__FITNESS_MODE".to_string(), "delta".to_string());
    env.insert("ENTROSWARM__TICK_INTERVAL_MS".to_string(), "250".to_string());

    let config = DriverConfig::load_with_env(&path, env).unwrap();
    assert_eq!(config.tick_interval_ms, 250);
    assert!(config.simulate);
    assert_eq!(config.process.configure_attempts, 5);

    let swarm = config.swarm_config().unwrap();
    assert_eq!(swarm.exploration_mode, ExplorationMode::RandomAndItsReverse);
    assert_eq!(swarm.fitness_mode, FitnessMode::Delta);
    assert_eq!(swarm.layout.size(), 6);
    assert_eq!(swarm.seed, Some(9));
}

#[test]
fn missing_config_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("absent.toml");
    let config =
        DriverConfig::load_with_env(&path.to_string_lossy(), config::Map::new()).unwrap();
    assert_eq!(config.tick_interval_ms, 2_000);
    assert_eq!(config.swarm.fitness_mode, "max");
}

#[test]
fn process_mode_provisions_one_folder_per_agent() {
    let tmp = TempDir::new().unwrap();
    for (name, content) in [("frontend", "#!/bin/sh\n"), ("vba.ini", "windowX=0\n"), ("rom.gba", "rom")] {
        fs::write(tmp.path().join(name), content).unwrap();
    }

    let mut config = DriverConfig::default();
    config.work_dir = tmp.path().join("agents");
    config.reference.binary = tmp.path().join("frontend");
    config.reference.ini = tmp.path().join("vba.ini");
    config.reference.rom = tmp.path().join("rom.gba");
    config.swarm.include_idle_agent = true;

    let work_dir = WorkDir::prepare(&config.work_dir).unwrap();
    let controller = build_controller(&config, &work_dir).unwrap();

    let names: Vec<&str> = controller.agents().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["agent-0-0", "agent-0-1", "agent-1-0", "idle-1-1"]);
    for name in names {
        let dir = config.work_dir.join(name);
        assert!(dir.join("frontend").exists());
        assert!(dir.join("vba.ini").exists());
        assert!(dir.join("rom.gba").exists());
    }
}

#[tokio::test]
async fn simulated_run_writes_metrics() {
    let tmp = TempDir::new().unwrap();
    let mut config = DriverConfig::default();
    config.simulate = true;
    config.work_dir = tmp.path().join("agents");
    config.metrics_path = Some(tmp.path().join("metrics.prom"));
    config.tick_interval_ms = 1;
    config.max_rounds = Some(1);
    config.swarm.settle_delay_ms = 0;
    config.swarm.seed = Some(3);

    let summary = entroswarm_driver::run(config, CancellationFlag::new())
        .await
        .unwrap();
    assert_eq!(summary.rounds_finalized, 1);
    assert!(!summary.cancelled);

    let metrics = fs::read_to_string(tmp.path().join("metrics.prom")).unwrap();
    assert!(metrics.contains("entroswarm_rounds_finalized_total 1"));
    assert!(metrics.contains("entroswarm_best_fitness"));
}

#[tokio::test]
async fn cancelled_run_still_tears_down() {
    let tmp = TempDir::new().unwrap();
    let mut config = DriverConfig::default();
    config.simulate = true;
    config.work_dir = tmp.path().join("agents");
    config.swarm.settle_delay_ms = 0;

    let cancel = CancellationFlag::new();
    cancel.cancel();
    let summary = entroswarm_driver::run(config, cancel).await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.rounds_finalized, 0);
}

#[test]
fn unknown_mode_aborts_before_any_agent_exists() {
    let tmp = TempDir::new().unwrap();
    let mut config = DriverConfig::default();
    config.simulate = true;
    config.work_dir = tmp.path().join("agents");
    config.swarm.exploration_mode = "MOSTLY_RANDOM".into();

    let work_dir = WorkDir::prepare(&config.work_dir).unwrap();
    let err = build_controller(&config, &work_dir).unwrap_err();
    assert!(err.to_string().contains("MOSTLY_RANDOM"));
}

#[cfg(unix)]
mod frontend {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    use bytes::Bytes;
    use entroswarm_common::{bind_in_order, PhysicalKey, Placement, SwarmError};
    use entroswarm_darwinian::Environment;
    use entroswarm_driver::ProcessEnvironment;

    /// Logs keys, saves the key count, records loads
    const FRONTEND: &str = r#"#!/bin/sh
while read -r cmd arg; do
  case "$cmd" in
    key) echo "$arg" >> keys.log ;;
    save) printf 'state:%s' "$(cat keys.log 2>/dev/null | wc -l | tr -d ' ')" > "$arg" ;;
    load) cp "$arg" loaded.sgm ;;
    config) echo "$arg" > config.log ;;
    quit) exit 0 ;;
  esac
done
"#;

    /// Writes every save in two chunks with a pause in between
    const CHUNKED_FRONTEND: &str = r#"#!/bin/sh
while read -r cmd arg; do
  case "$cmd" in
    save) printf 'state:' > "$arg"; sleep 0.1; printf 'done' >> "$arg" ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn settings() -> ProcessSettings {
        ProcessSettings {
            configure_attempts: 2,
            configure_retry_delay_ms: 10,
            persist_timeout_ms: 5_000,
            persist_poll_ms: 10,
            shutdown_timeout_ms: 2_000,
        }
    }

    fn environment(tmp: &TempDir) -> ProcessEnvironment {
        environment_with(tmp, FRONTEND, settings())
    }

    fn environment_with(tmp: &TempDir, script: &str, settings: ProcessSettings) -> ProcessEnvironment {
        let reference_dir = tmp.path().join("reference");
        fs::create_dir_all(&reference_dir).unwrap();
        let binary = reference_dir.join("frontend.sh");
        fs::write(&binary, script).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        fs::write(reference_dir.join("vba.ini"), "[prefs]\nJoy0_Start=13\n").unwrap();
        fs::write(reference_dir.join("rom.gba"), "rom").unwrap();

        let mut config = DriverConfig::default();
        config.reference.binary = binary;
        config.reference.ini = reference_dir.join("vba.ini");
        config.reference.rom = reference_dir.join("rom.gba");

        let work_dir = WorkDir::prepare(tmp.path().join("agents")).unwrap();
        let workspace = work_dir.provision("agent-0-0", &config.reference).unwrap();
        ProcessEnvironment::new("agent-0-0", workspace, settings)
    }

    fn bindings() -> Vec<entroswarm_common::KeyBinding> {
        bind_in_order(["z", "x", "i", "k", "j", "l"].map(|k| PhysicalKey::new(k.as_bytes()[0] as u32, k)))
    }

    #[tokio::test]
    async fn drives_a_frontend_over_stdin() {
        let tmp = TempDir::new().unwrap();
        let mut env = environment(&tmp);
        let dir = env.workspace().dir.clone();

        env.spawn().await.unwrap();
        env.configure(&bindings(), Placement::new(245, 0)).await.unwrap();
        let ini = fs::read_to_string(&env.workspace().ini).unwrap();
        assert!(ini.contains("windowX=245"));
        assert!(ini.contains("Joy0_Start=0"));

        env.execute("z").await.unwrap();
        env.execute("l").await.unwrap();
        let snapshot = env.persist_state().await.unwrap();
        assert_eq!(snapshot, Bytes::from_static(b"state:2"));

        env.load_state(&Bytes::from_static(b"state:0")).await.unwrap();
        env.teardown().await.unwrap();

        assert_eq!(fs::read_to_string(dir.join("loaded.sgm")).unwrap(), "state:0");
        assert!(dir.join("config.log").exists());
        assert!(!env.is_running());
    }

    #[tokio::test]
    async fn chunked_save_is_read_whole() {
        let tmp = TempDir::new().unwrap();
        let settings = ProcessSettings {
            persist_poll_ms: 300,
            ..settings()
        };
        let mut env = environment_with(&tmp, CHUNKED_FRONTEND, settings);

        env.spawn().await.unwrap();
        let snapshot = env.persist_state().await.unwrap();
        assert_eq!(snapshot, Bytes::from_static(b"state:done"));
        env.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn commands_fail_before_spawn() {
        let tmp = TempDir::new().unwrap();
        let mut env = environment(&tmp);
        let err = env.execute("z").await.unwrap_err();
        assert!(matches!(err, SwarmError::CollaboratorUnavailable { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let mut env = environment(&tmp);
        fs::remove_file(&env.workspace().binary).unwrap();
        assert!(env.spawn().await.is_err());
    }
}
