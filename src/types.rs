use crate::configuration::Configuration;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Declares a closed enumeration whose variants have a canonical spelling.
/// Parsing is case-insensitive; serialization uses the canonical spelling.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $kind:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| Error::UnknownValue {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

named_enum! {
    pub enum TargetType: "target type" {
        Executable => "Executable",
        StaticLibrary => "StaticLibrary",
        IntermediateStaticLibrary => "IntermediateStaticLibrary",
        DynamicLibrary => "DynamicLibrary",
        DarwinApplication => "DarwinApplication",
        DarwinStaticFramework => "DarwinStaticFramework",
        DarwinSharedFramework => "DarwinSharedFramework",
        MacBundle => "MacBundle",
        GradleApplication => "GradleApplication",
        GradleLibrary => "GradleLibrary",
    }
}

named_enum! {
    pub enum OperatingSystemType: "operating system" {
        Windows => "Windows",
        Linux => "Linux",
        MacOS => "MacOS",
        Android => "Android",
        IOS => "iOS",
    }
}

named_enum! {
    pub enum ArchitectureType: "architecture" {
        X86 => "x86",
        X64 => "x64",
        Armv7a => "armv7a",
        Arm64 => "arm64",
        Riscv64 => "riscv64",
        Unknown => "Unknown",
    }
}

named_enum! {
    pub enum WindowsRuntimeType: "windows runtime" {
        Win32 => "Win32",
        WinRT => "WinRT",
    }
}

named_enum! {
    pub enum ToolchainType: "toolchain" {
        VisualStudio => "VisualStudio",
        XCode => "XCode",
        Ninja => "Ninja",
        GradleNinja => "Gradle_Ninja",
    }
}

named_enum! {
    pub enum CompilerType: "compiler" {
        VisualCpp => "VisualCpp",
        Gcc => "gcc",
        Clang => "clang",
        ClangCl => "clangcl",
    }
}

named_enum! {
    pub enum CLibraryType: "C library" {
        VisualCRuntime => "VisualCRuntime",
        Glibc => "glibc",
        Musl => "musl",
        LibSystem => "libSystem",
        Bionic => "Bionic",
    }
}

named_enum! {
    pub enum CLibraryForm: "C library form" {
        Static => "Static",
        Dynamic => "Dynamic",
    }
}

named_enum! {
    pub enum CppLibraryType: "C++ library" {
        VisualCppRuntime => "VisualCppRuntime",
        Libstdcxx => "libstdcxx",
        Libcxx => "libcxx",
    }
}

named_enum! {
    pub enum CppLibraryForm: "C++ library form" {
        Static => "Static",
        Dynamic => "Dynamic",
    }
}

named_enum! {
    pub enum ConfigurationType: "configuration type" {
        Debug => "Debug",
        Release => "Release",
    }
}

named_enum! {
    pub enum FileType: "file type" {
        Unknown => "Unknown",
        Header => "Header",
        CSource => "CSource",
        CppSource => "CppSource",
        ObjectiveCSource => "ObjectiveCSource",
        ObjectiveCppSource => "ObjectiveCppSource",
        EmbeddedContent => "EmbeddedContent",
        NatVis => "NatVis",
    }
}

impl TargetType {
    /// Targets built from C/C++ sources by the native toolchain.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            TargetType::Executable
                | TargetType::StaticLibrary
                | TargetType::DynamicLibrary
                | TargetType::DarwinApplication
                | TargetType::DarwinStaticFramework
                | TargetType::DarwinSharedFramework
                | TargetType::MacBundle
        )
    }

    pub fn is_gradle(&self) -> bool {
        matches!(self, TargetType::GradleApplication | TargetType::GradleLibrary)
    }
}

impl OperatingSystemType {
    pub fn is_darwin(&self) -> bool {
        matches!(self, OperatingSystemType::MacOS | OperatingSystemType::IOS)
    }
}

impl FileType {
    pub fn is_c_family(&self) -> bool {
        matches!(self, FileType::CSource | FileType::ObjectiveCSource)
    }

    pub fn is_cpp_family(&self) -> bool {
        matches!(self, FileType::CppSource | FileType::ObjectiveCppSource)
    }

    pub fn is_compilable(&self) -> bool {
        self.is_c_family() || self.is_cpp_family()
    }
}

/// A concrete (or partially concrete) combination of build dimensions.
/// `None` means the dimension is unspecified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub target_type: Option<TargetType>,
    pub host_operating_system: Option<OperatingSystemType>,
    pub host_architecture: Option<ArchitectureType>,
    pub target_operating_system: Option<OperatingSystemType>,
    pub target_architecture: Option<ArchitectureType>,
    pub windows_runtime: Option<WindowsRuntimeType>,
    pub toolchain: Option<ToolchainType>,
    pub compiler: Option<CompilerType>,
    pub c_library: Option<CLibraryType>,
    pub c_library_form: Option<CLibraryForm>,
    pub cpp_library: Option<CppLibraryType>,
    pub cpp_library_form: Option<CppLibraryForm>,
    pub configuration_type: Option<ConfigurationType>,
}

/// A preprocessor define, `NAME` or `NAME=VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn new(name: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Define {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl FromStr for Define {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (name, value) = match s.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (s, None),
        };
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::InvalidDefine(s.to_string()));
        }
        Ok(Define {
            name: name.to_string(),
            value,
        })
    }
}

impl TryFrom<String> for Define {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Define> for String {
    fn from(d: Define) -> String {
        d.to_string()
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// A source file together with its own per-file rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    #[serde(rename = "type", default = "unknown_file_type")]
    pub file_type: FileType,
    #[serde(default)]
    pub exported: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<Configuration>,
}

fn unknown_file_type() -> FileType {
    FileType::Unknown
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, file_type: FileType) -> Self {
        SourceFile {
            path: path.into(),
            file_type,
            exported: false,
            configurations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    /// Solution folder the project is grouped under.
    pub virtual_dir: PathBuf,
    /// Location of the generated project file.
    pub file_path: PathBuf,
    pub target_type: TargetType,
    /// On-disk artifact name; defaults to `name`.
    pub target_name: Option<String>,
    pub configurations: Vec<Configuration>,
}

impl Project {
    pub fn artifact_name(&self) -> &str {
        self.target_name.as_deref().unwrap_or(&self.name)
    }
}

/// A discovered project before dependency resolution.
#[derive(Debug, Clone)]
pub struct ProjectDescription {
    pub definition: Project,
    /// Host/platform defaults applied to the project itself.
    pub base_configurations: Vec<Configuration>,
    /// Settings imported by dependents.
    pub export_configurations: Vec<Configuration>,
    pub physical_path: PathBuf,
    /// Names of the projects this one directly depends on.
    pub requirements: Vec<String>,
}

/// Resolved identity of a project used for cross-project wiring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReference {
    pub id: String,
    pub name: String,
    pub virtual_dir: PathBuf,
    pub file_path: PathBuf,
    pub target_type: TargetType,
    pub target_name: String,
    /// Artifact per configuration, joined onto the build directory.
    pub output_file_paths: BTreeMap<ConfigurationType, PathBuf>,
}
