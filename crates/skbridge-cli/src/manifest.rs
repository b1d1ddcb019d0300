use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use skbridge_core::BridgeConfig;
use skbridge_reflect::Universe;
use skbridge_script::{builtin, CoroutineStep, MemoryRuntime, Routine, RoutineKind, ScriptValue};
use tracing::debug;

/// A project to expose: the host classes it runs against and the script
/// classes whose routines should be bridged
///
/// ```toml
/// [bridge]
/// is_final = true
///
/// [[host_class]]
/// name = "Actor"
///
/// [[script_class]]
/// name = "Actor"
///
/// [[script_class.routine]]
/// name = "on_hit"
/// kind = "event"
/// params = [{ name = "amount", class = "Real" }]
/// ```
#[derive(Debug, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default, rename = "host_struct")]
    pub host_structs: Vec<HostStructDecl>,

    #[serde(default, rename = "host_class")]
    pub host_classes: Vec<HostClassDecl>,

    #[serde(default, rename = "script_class")]
    pub script_classes: Vec<ScriptClassDecl>,
}

#[derive(Debug, Deserialize)]
pub struct HostStructDecl {
    pub name: String,
    pub size: u32,
}

#[derive(Debug, Deserialize)]
pub struct HostClassDecl {
    pub name: String,
    /// Defaults to the root object class
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScriptClassDecl {
    pub name: String,
    /// Defaults to `Entity`
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default, rename = "routine")]
    pub routines: Vec<RoutineDecl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKindDecl {
    #[default]
    Method,
    Coroutine,
    Event,
}

#[derive(Debug, Deserialize)]
pub struct RoutineDecl {
    pub name: String,
    #[serde(default)]
    pub kind: RoutineKindDecl,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub class_member: bool,
    #[serde(default = "default_true")]
    pub blueprint: bool,
}

#[derive(Debug, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub class: String,
}

fn default_true() -> bool {
    true
}

impl ProjectManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("Failed to parse manifest {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Host side of the project. Parents must be declared before children.
    pub fn build_universe(&self) -> Result<Universe> {
        let mut universe = Universe::new();

        for decl in &self.host_structs {
            universe.add_struct(&decl.name, decl.size);
        }

        for decl in &self.host_classes {
            let parent = match &decl.parent {
                Some(parent) => Some(
                    universe
                        .find_class(parent)
                        .ok_or_else(|| anyhow!("Host class {} has undeclared parent {}", decl.name, parent))?,
                ),
                None => None,
            };
            universe.add_class(&decl.name, parent.as_ref());
        }

        Ok(universe)
    }

    /// Script side of the project
    ///
    /// Routine bodies are placeholders: methods return nil, coroutines
    /// finish on their first step.
    pub fn build_runtime(&self) -> Result<MemoryRuntime> {
        let mut runtime = MemoryRuntime::new();

        for decl in &self.script_classes {
            let superclass = decl.superclass.as_deref().unwrap_or(builtin::ENTITY);
            if runtime.class(superclass).is_none() {
                bail!("Script class {} has undeclared superclass {}", decl.name, superclass);
            }
            runtime.define_class(&decl.name, Some(superclass));
        }

        for decl in &self.script_classes {
            let class = runtime
                .class(&decl.name)
                .ok_or_else(|| anyhow!("Script class {} vanished", decl.name))?;

            for routine_decl in &decl.routines {
                let routine = routine_decl
                    .build(&runtime)
                    .with_context(|| format!("Invalid routine {}.{}", decl.name, routine_decl.name))?;
                debug!(target: "cli", "Declaring {}.{}", decl.name, routine_decl.name);

                match routine_decl.kind {
                    RoutineKindDecl::Method => {
                        runtime.add_method(&class, routine, |_| Ok(ScriptValue::Nil));
                    }
                    RoutineKindDecl::Coroutine => {
                        runtime.add_coroutine(&class, routine, |_, _| CoroutineStep::Done(ScriptValue::Nil));
                    }
                    RoutineKindDecl::Event => {
                        runtime.add_event(&class, routine);
                    }
                }
            }
        }

        Ok(runtime)
    }
}

impl RoutineDecl {
    fn build(&self, runtime: &MemoryRuntime) -> Result<Routine> {
        let kind = match self.kind {
            RoutineKindDecl::Method => RoutineKind::Method,
            RoutineKindDecl::Coroutine => RoutineKind::Coroutine,
            RoutineKindDecl::Event => RoutineKind::EventTrigger,
        };
        let lookup = |name: &str| runtime.class(name).ok_or_else(|| anyhow!("Unknown script class {}", name));

        let mut routine = Routine::new(&self.name, kind);
        for param in &self.params {
            routine = routine.with_param(&param.name, &lookup(&param.class)?);
        }
        if let Some(result) = &self.result {
            routine = routine.returning(&lookup(result)?);
        }
        if self.class_member {
            routine = routine.class_member();
        }
        if self.blueprint {
            routine = routine.blueprint();
        }
        Ok(routine)
    }
}
