use std::path::Path;

use anyhow::Result;
use skbridge_core::BlueprintInterface;
use skbridge_reflect::Universe;
use tokio::sync::watch;
use tracing::info;

use crate::manifest::ProjectManifest;
use crate::report::ExposeReport;

/// Reload signal type (empty - just signals that a reload is requested)
#[derive(Debug, Clone)]
pub struct ReloadSignal;

/// Create a reload signal channel and spawn SIGUSR2 handler
///
/// Returns a receiver that will be notified when SIGUSR2 is received
#[cfg(unix)]
pub fn setup_reload_signal() -> watch::Receiver<Option<ReloadSignal>> {
    let (reload_tx, reload_rx) = watch::channel(None);

    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigusr2 = match signal(SignalKind::user_defined2()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(target: "reload", "Failed to register SIGUSR2 handler: {}", e);
                return;
            }
        };

        loop {
            if reload_tx.is_closed() {
                info!(target: "reload", "Reload signal receiver dropped, shutting down SIGUSR2 handler");
                break;
            }

            sigusr2.recv().await;
            info!(target: "reload", "Received SIGUSR2 - reloading script side");

            if reload_tx.send(Some(ReloadSignal)).is_err() {
                tracing::error!(target: "reload", "Failed to send reload signal - receiver dropped");
                break;
            }
        }
    });

    reload_rx
}

/// Create a reload signal channel (non-Unix platforms don't support SIGUSR2)
#[cfg(not(unix))]
pub fn setup_reload_signal() -> watch::Receiver<Option<ReloadSignal>> {
    let (reload_tx, reload_rx) = watch::channel(None);
    tracing::warn!(target: "reload", "SIGUSR2 reload not supported on this platform");
    // Keep the sender alive but never send signals
    std::mem::forget(reload_tx);
    reload_rx
}

/// Re-read the manifest and swap in its script side
///
/// Host classes stay as they are. Generated host functions survive for every
/// routine that still matches; the rest are removed by the follow-up pass.
pub fn reload_project(
    manifest_path: &Path,
    universe: &Universe,
    interface: &mut BlueprintInterface,
    is_final: bool,
) -> Result<ExposeReport> {
    let manifest = ProjectManifest::load(manifest_path)?;
    let runtime = manifest.build_runtime()?;

    interface.reload_runtime(universe, Box::new(runtime));

    let mut report = ExposeReport::default();
    interface.reexpose_all(is_final, &mut report);
    info!(
        target: "reload",
        "Reloaded {}: {} bindings live",
        manifest_path.display(),
        interface.registry().live_count()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Records the target of every event
    struct TargetRecorder(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> Layer<S> for TargetRecorder {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.lock().unwrap().push(event.metadata().target().to_string());
        }
    }

    const BEFORE: &str = r#"
[[host_class]]
name = "Actor"

[[script_class]]
name = "Actor"

[[script_class.routine]]
name = "jump"

[[script_class.routine]]
name = "crouch"
"#;

    const AFTER: &str = r#"
[[script_class]]
name = "Actor"

[[script_class.routine]]
name = "jump"
"#;

    #[test]
    fn test_reload_keeps_matching_functions() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("project.toml");
        fs::write(&path, BEFORE).expect("Failed to write manifest");

        let manifest = ProjectManifest::load(&path).expect("Failed to load manifest");
        let universe = manifest.build_universe().expect("Failed to build universe");
        let runtime = manifest.build_runtime().expect("Failed to build runtime");
        let mut interface = BlueprintInterface::initialize(&universe, Box::new(runtime), manifest.bridge.clone())
            .expect("Failed to initialize interface");
        interface.reexpose_all(false, &mut ());

        let actor = universe.find_class("Actor").expect("Actor");
        let jump = actor.find_function_local("jump").expect("jump generated");

        fs::write(&path, AFTER).expect("Failed to rewrite manifest");
        reload_project(&path, &universe, &mut interface, false).expect("reload failed");

        let kept = actor.find_function_local("jump").expect("jump kept");
        assert!(std::rc::Rc::ptr_eq(&jump, &kept), "matching function survives the reload");
        assert!(actor.find_function_local("crouch").is_none(), "removed routine loses its function");
        assert_eq!(interface.registry().live_count(), 1);
    }

    #[test]
    fn test_reload_logs_under_crate_targets() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("project.toml");
        fs::write(&path, BEFORE).expect("Failed to write manifest");

        let manifest = ProjectManifest::load(&path).expect("Failed to load manifest");
        let universe = manifest.build_universe().expect("Failed to build universe");
        let runtime = manifest.build_runtime().expect("Failed to build runtime");
        let mut interface = BlueprintInterface::initialize(&universe, Box::new(runtime), manifest.bridge.clone())
            .expect("Failed to initialize interface");
        interface.reexpose_all(false, &mut ());

        let targets = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(TargetRecorder(Arc::clone(&targets)));
        tracing::subscriber::with_default(subscriber, || {
            reload_project(&path, &universe, &mut interface, false).expect("reload failed");
        });

        let targets = targets.lock().unwrap();
        assert!(targets.iter().any(|t| t == "reload"), "{:?}", targets);
        assert!(
            targets
                .iter()
                .all(|t| ["reload", "cli", "bridge", "script", "reflect"].contains(&t.as_str())),
            "untargeted event: {:?}",
            targets
        );
    }
}
