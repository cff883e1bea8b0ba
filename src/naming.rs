//! File names, output paths and identities of generated projects.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::types::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project file name relative to `<build>/projects`.
pub fn project_file_name(toolchain: ToolchainType, project_name: &str) -> PathBuf {
    match toolchain {
        ToolchainType::VisualStudio => {
            Path::new(project_name).join(format!("{}.vcxproj", project_name))
        }
        ToolchainType::XCode => PathBuf::from(format!("{}.xcodeproj", project_name)),
        ToolchainType::Ninja | ToolchainType::GradleNinja => PathBuf::from(project_name),
    }
}

pub fn project_working_directory(toolchain: ToolchainType, build_directory: &Path, project_name: &str) -> PathBuf {
    let projects = build_directory.join("projects");
    match toolchain {
        ToolchainType::VisualStudio => projects.join(project_name),
        _ => projects,
    }
}

/// Artifact file name of a target on the given operating system.
pub fn output_file_name(
    operating_system: OperatingSystemType,
    target_name: &str,
    target_type: TargetType,
) -> Result<String> {
    use OperatingSystemType::*;
    use TargetType::*;

    let target_type_for_name = match target_type {
        IntermediateStaticLibrary => StaticLibrary,
        other => other,
    };
    let name = match (operating_system, target_type_for_name) {
        (Windows, Executable) => format!("{}.exe", target_name),
        (Windows, StaticLibrary) => format!("{}.lib", target_name),
        (Windows, DynamicLibrary) => format!("{}.dll", target_name),

        (Linux | MacOS | Android | IOS, Executable) => target_name.to_string(),
        (Linux | MacOS | Android | IOS, StaticLibrary) => format!("lib{}.a", target_name),
        (Linux | Android, DynamicLibrary) => format!("lib{}.so", target_name),
        (MacOS | IOS, DynamicLibrary) => format!("lib{}.dylib", target_name),
        (MacOS | IOS, DarwinApplication) => format!("{}.app", target_name),
        (MacOS | IOS, DarwinStaticFramework | DarwinSharedFramework) => {
            format!("{}.framework", target_name)
        }
        (MacOS, MacBundle) => format!("{}.bundle", target_name),

        (Android, GradleApplication) => format!("{}.apk", target_name),
        (Android, GradleLibrary) => format!("{}.aar", target_name),

        _ => {
            return Err(Error::UnsupportedTargetType {
                target_type,
                operating_system,
            })
        }
    };
    Ok(name)
}

/// Output path of a project relative to the build directory.
pub fn output_file_path(
    environment: &Environment,
    project_name: &str,
    target_name: &str,
    target_type: TargetType,
    output_directory: Option<&Path>,
    configuration_type: ConfigurationType,
) -> Result<PathBuf> {
    let file_name = output_file_name(environment.target_operating_system, target_name, target_type)?;

    if target_type.is_gradle() {
        // Gradle project names carry a `:<TargetType>` suffix.
        let simple_name = project_name.split(':').next().unwrap_or(project_name);
        return match environment.toolchain {
            ToolchainType::GradleNinja => {
                let config = configuration_type.as_str().to_lowercase();
                let stem = Path::new(&file_name)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| target_name.to_string());
                let path = match target_type {
                    TargetType::GradleApplication => format!(
                        "gradle/{}/build/outputs/apk/{}/{}-{}.apk",
                        simple_name, config, stem, config
                    ),
                    _ => {
                        let unsigned = if configuration_type == ConfigurationType::Release {
                            "-unsigned"
                        } else {
                            ""
                        };
                        format!(
                            "gradle/{}/build/outputs/aar/{}-{}{}.aar",
                            simple_name, stem, config, unsigned
                        )
                    }
                };
                Ok(PathBuf::from(path))
            }
            ToolchainType::Ninja => Ok(Path::new("batch").join(simple_name).join(file_name)),
            other => Err(Error::UnsupportedToolchain(other)),
        };
    }

    if let Some(dir) = output_directory {
        return Ok(dir.join(file_name));
    }

    let config_dir = match (environment.toolchain, environment.target_operating_system) {
        (ToolchainType::XCode, OperatingSystemType::IOS) if environment.enable_mac_catalyst => {
            format!("{}-maccatalyst", configuration_type)
        }
        (ToolchainType::XCode, OperatingSystemType::IOS) => format!("{}-iphoneos", configuration_type),
        _ => configuration_type.to_string(),
    };
    Ok(Path::new(&config_dir).join(file_name))
}

fn hash_prefix(text: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hex = format!("{:X}", hasher.finalize());
    hex[..length].to_string()
}

/// Identity of a project in the given toolchain's project files.
pub fn project_id(toolchain: ToolchainType, project_name: &str) -> String {
    match toolchain {
        ToolchainType::VisualStudio => {
            let h = hash_prefix(project_name, 32);
            format!("{}-{}-{}-{}-{}", &h[0..8], &h[8..12], &h[12..16], &h[16..20], &h[20..32])
        }
        ToolchainType::XCode => hash_prefix(project_name, 24),
        ToolchainType::Ninja | ToolchainType::GradleNinja => String::new(),
    }
}

/// Project identities, computed once per run.
#[derive(Debug, Clone, Default)]
pub struct ProjectIds {
    ids: BTreeMap<String, String>,
}

impl ProjectIds {
    pub fn new<'a>(toolchain: ToolchainType, names: impl IntoIterator<Item = &'a str>) -> Self {
        let ids = names
            .into_iter()
            .map(|name| (name.to_string(), project_id(toolchain, name)))
            .collect();
        ProjectIds { ids }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }
}
