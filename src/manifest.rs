//! `Project.toml` at the source root.

use crate::configuration::{Conditions, Configuration, MatchSet, OptionKey};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::types::*;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE_NAME: &str = "Project.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    /// Defaults to the source directory name.
    pub solution: Option<String>,
    /// Project name to direct dependency names.
    pub dependencies: BTreeMap<String, Vec<String>>,
    /// Base rules appended after the built-in table.
    #[serde(deserialize_with = "strict_rules")]
    pub rules: Vec<Configuration>,
    /// Keyed by lower-case target operating system name.
    pub platform: BTreeMap<String, Platform>,
}

/// Per target OS tools and flags applied after every project's own rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Platform {
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub ar: Option<String>,
    pub strip: Option<String>,
    pub common_flags: Vec<String>,
    pub c_flags: Vec<String>,
    pub cpp_flags: Vec<String>,
    pub linker_flags: Vec<String>,
    pub post_linker_flags: Vec<String>,
}

/// One `[[rules]]` entry. Keys are listed out so that a misspelled one is
/// an error rather than a silently unrestricted rule.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Rule {
    target_types: MatchSet<TargetType>,
    host_operating_systems: MatchSet<OperatingSystemType>,
    host_architectures: MatchSet<ArchitectureType>,
    target_operating_systems: MatchSet<OperatingSystemType>,
    target_architectures: MatchSet<ArchitectureType>,
    windows_runtimes: MatchSet<WindowsRuntimeType>,
    toolchains: MatchSet<ToolchainType>,
    compilers: MatchSet<CompilerType>,
    c_libraries: MatchSet<CLibraryType>,
    c_library_forms: MatchSet<CLibraryForm>,
    cpp_libraries: MatchSet<CppLibraryType>,
    cpp_library_forms: MatchSet<CppLibraryForm>,
    configuration_types: MatchSet<ConfigurationType>,

    include_directories: Vec<PathBuf>,
    system_include_directories: Vec<PathBuf>,
    defines: Vec<Define>,
    common_flags: Vec<String>,
    c_flags: Vec<String>,
    cpp_flags: Vec<String>,
    options: BTreeMap<OptionKey, String>,
    lib_directories: Vec<PathBuf>,
    libs: Vec<PathBuf>,
    linker_flags: Vec<String>,
    post_linker_flags: Vec<String>,
    output_directory: Option<PathBuf>,
}

impl From<Rule> for Configuration {
    fn from(rule: Rule) -> Self {
        Configuration {
            conditions: Conditions {
                target_types: rule.target_types,
                host_operating_systems: rule.host_operating_systems,
                host_architectures: rule.host_architectures,
                target_operating_systems: rule.target_operating_systems,
                target_architectures: rule.target_architectures,
                windows_runtimes: rule.windows_runtimes,
                toolchains: rule.toolchains,
                compilers: rule.compilers,
                c_libraries: rule.c_libraries,
                c_library_forms: rule.c_library_forms,
                cpp_libraries: rule.cpp_libraries,
                cpp_library_forms: rule.cpp_library_forms,
                configuration_types: rule.configuration_types,
            },
            include_directories: rule.include_directories,
            system_include_directories: rule.system_include_directories,
            defines: rule.defines,
            common_flags: rule.common_flags,
            c_flags: rule.c_flags,
            cpp_flags: rule.cpp_flags,
            options: rule.options,
            lib_directories: rule.lib_directories,
            libs: rule.libs,
            linker_flags: rule.linker_flags,
            post_linker_flags: rule.post_linker_flags,
            files: Vec::new(),
            output_directory: rule.output_directory,
        }
    }
}

fn strict_rules<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<Configuration>, D::Error> {
    let rules = Vec::<Rule>::deserialize(deserializer)?;
    Ok(rules.into_iter().map(Configuration::from).collect())
}

impl Manifest {
    /// Load `Project.toml` from `source_directory`; a missing file yields
    /// the defaults.
    pub fn load(source_directory: &Path) -> Result<Self> {
        let path = source_directory.join(MANIFEST_FILE_NAME);
        if !path.is_file() {
            debug!("no {} in {}", MANIFEST_FILE_NAME, source_directory.display());
            return Ok(Manifest::default());
        }
        info!("Config File: {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let manifest: Manifest =
            toml::from_str(&text).map_err(|source| Error::ManifestParse { path, source })?;
        for rule in &manifest.rules {
            rule.check_option_scopes()?;
        }
        Ok(manifest)
    }

    pub fn solution_name(&self, environment: &Environment) -> String {
        self.solution.clone().unwrap_or_else(|| {
            environment
                .source_directory
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "Solution".to_string())
        })
    }

    pub fn platform(&self, operating_system: OperatingSystemType) -> Option<&Platform> {
        self.platform.get(&operating_system.as_str().to_lowercase())
    }

    /// Direct requirements of `project` declared in the manifest.
    pub fn requirements(&self, project: &str) -> &[String] {
        self.dependencies.get(project).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Override the environment's tools with the target platform's table.
    pub fn apply_tools(&self, environment: &mut Environment) {
        let Some(platform) = self.platform(environment.target_operating_system) else {
            return;
        };
        let tools = &mut environment.tools;
        for (slot, value) in [
            (&mut tools.cc, &platform.cc),
            (&mut tools.cxx, &platform.cxx),
            (&mut tools.ar, &platform.ar),
            (&mut tools.strip, &platform.strip),
        ] {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }
}

impl Platform {
    /// The flags as an unconditional rule.
    pub fn external_configuration(&self) -> Configuration {
        Configuration {
            common_flags: self.common_flags.clone(),
            c_flags: self.c_flags.clone(),
            cpp_flags: self.cpp_flags.clone(),
            linker_flags: self.linker_flags.clone(),
            post_linker_flags: self.post_linker_flags.clone(),
            ..Configuration::default()
        }
    }
}
