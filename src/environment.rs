//! Host and target environment of a generator run.

use crate::error::{Error, Result};
use crate::types::*;
use std::env::consts;
use std::path::PathBuf;
use tracing::debug;

/// Command-line tools written into generated build scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub cc: String,
    pub cxx: String,
    pub ar: String,
    pub strip: String,
}

impl Tools {
    pub fn for_compiler(compiler: CompilerType) -> Self {
        let (cc, cxx, ar) = match compiler {
            CompilerType::Gcc => ("gcc", "g++", "ar"),
            CompilerType::Clang => ("clang", "clang++", "llvm-ar"),
            CompilerType::ClangCl => ("clang-cl", "clang-cl", "llvm-lib"),
            CompilerType::VisualCpp => ("cl", "cl", "lib"),
        };
        Tools {
            cc: cc.to_string(),
            cxx: cxx.to_string(),
            ar: ar.to_string(),
            strip: "strip".to_string(),
        }
    }
}

/// Choices supplied by the user. Anything left `None` gets a default
/// derived from the host and the target operating system.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOptions {
    pub source_directory: PathBuf,
    pub build_directory: Option<PathBuf>,
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
    pub enable_dummy: bool,
    pub enable_libcxx_build: bool,
    pub enable_mac_catalyst: bool,
}

/// Fully resolved environment.
#[derive(Debug, Clone)]
pub struct Environment {
    pub source_directory: PathBuf,
    pub build_directory: PathBuf,
    pub host_operating_system: OperatingSystemType,
    pub host_architecture: ArchitectureType,
    pub target_operating_system: OperatingSystemType,
    pub target_architecture: ArchitectureType,
    /// Only set when targeting Windows.
    pub windows_runtime: Option<WindowsRuntimeType>,
    pub toolchain: ToolchainType,
    pub compiler: CompilerType,
    pub c_library: CLibraryType,
    pub c_library_form: CLibraryForm,
    pub cpp_library: CppLibraryType,
    pub cpp_library_form: CppLibraryForm,
    /// Configuration baked into single-configuration generators.
    pub configuration_type: ConfigurationType,
    /// Keep projects for other operating systems as inert stubs.
    pub enable_dummy: bool,
    pub enable_libcxx_build: bool,
    pub enable_mac_catalyst: bool,
    pub tools: Tools,
}

pub fn host_operating_system() -> Result<OperatingSystemType> {
    match consts::OS {
        "windows" => Ok(OperatingSystemType::Windows),
        "linux" => Ok(OperatingSystemType::Linux),
        "macos" => Ok(OperatingSystemType::MacOS),
        "android" => Ok(OperatingSystemType::Android),
        "ios" => Ok(OperatingSystemType::IOS),
        other => Err(Error::UnknownValue {
            kind: "host operating system",
            value: other.to_string(),
        }),
    }
}

pub fn host_architecture() -> ArchitectureType {
    match consts::ARCH {
        "x86" => ArchitectureType::X86,
        "x86_64" => ArchitectureType::X64,
        "arm" => ArchitectureType::Armv7a,
        "aarch64" => ArchitectureType::Arm64,
        "riscv64" => ArchitectureType::Riscv64,
        _ => ArchitectureType::Unknown,
    }
}

impl Environment {
    pub fn resolve(options: EnvironmentOptions) -> Result<Self> {
        Self::resolve_for_host(options, host_operating_system()?, host_architecture())
    }

    pub fn resolve_for_host(
        options: EnvironmentOptions,
        host_operating_system: OperatingSystemType,
        host_architecture: ArchitectureType,
    ) -> Result<Self> {
        use OperatingSystemType::*;

        let target_os = options.target_operating_system.unwrap_or(host_operating_system);
        let target_architecture = options.target_architecture.unwrap_or(match target_os {
            Android | IOS => ArchitectureType::Arm64,
            _ if target_os == host_operating_system => host_architecture,
            _ => ArchitectureType::X64,
        });
        let windows_runtime = match target_os {
            Windows => Some(options.windows_runtime.unwrap_or(WindowsRuntimeType::Win32)),
            _ => None,
        };
        let toolchain = options.toolchain.unwrap_or(match target_os {
            Windows => ToolchainType::VisualStudio,
            Linux | Android => ToolchainType::Ninja,
            MacOS | IOS => ToolchainType::XCode,
        });
        let compiler = options.compiler.unwrap_or(match (target_os, toolchain) {
            (Windows, ToolchainType::VisualStudio) => CompilerType::VisualCpp,
            _ => CompilerType::Clang,
        });
        let c_library = options.c_library.unwrap_or(match target_os {
            Windows => CLibraryType::VisualCRuntime,
            Linux => CLibraryType::Glibc,
            MacOS | IOS => CLibraryType::LibSystem,
            Android => CLibraryType::Bionic,
        });
        let c_library_form = options.c_library_form.unwrap_or(CLibraryForm::Dynamic);
        let cpp_library = options.cpp_library.unwrap_or(match (target_os, compiler) {
            (Windows, _) => CppLibraryType::VisualCppRuntime,
            (Linux, CompilerType::Gcc) => CppLibraryType::Libstdcxx,
            _ => CppLibraryType::Libcxx,
        });
        let cpp_library_form = options.cpp_library_form.unwrap_or(match c_library_form {
            CLibraryForm::Static => CppLibraryForm::Static,
            CLibraryForm::Dynamic => CppLibraryForm::Dynamic,
        });
        let build_directory = options.build_directory.unwrap_or_else(|| {
            options
                .source_directory
                .join("build")
                .join(target_os.as_str().to_lowercase())
        });

        let environment = Environment {
            source_directory: options.source_directory,
            build_directory,
            host_operating_system,
            host_architecture,
            target_operating_system: target_os,
            target_architecture,
            windows_runtime,
            toolchain,
            compiler,
            c_library,
            c_library_form,
            cpp_library,
            cpp_library_form,
            configuration_type: options.configuration_type.unwrap_or(ConfigurationType::Debug),
            enable_dummy: options.enable_dummy,
            enable_libcxx_build: options.enable_libcxx_build,
            enable_mac_catalyst: options.enable_mac_catalyst && target_os == IOS,
            tools: Tools::for_compiler(compiler),
        };
        debug!(?environment, "resolved environment");
        Ok(environment)
    }

    /// Selector for one project in one configuration.
    pub fn selector(&self, target_type: TargetType, configuration_type: ConfigurationType) -> Selector {
        Selector {
            target_type: Some(target_type),
            host_operating_system: Some(self.host_operating_system),
            host_architecture: Some(self.host_architecture),
            target_operating_system: Some(self.target_operating_system),
            target_architecture: Some(self.target_architecture),
            windows_runtime: self.windows_runtime,
            toolchain: Some(self.toolchain),
            compiler: Some(self.compiler),
            c_library: Some(self.c_library),
            c_library_form: Some(self.c_library_form),
            cpp_library: Some(self.cpp_library),
            cpp_library_form: Some(self.cpp_library_form),
            configuration_type: Some(configuration_type),
        }
    }

    /// Configuration types a generated project must describe.
    pub fn configuration_types(&self) -> Vec<ConfigurationType> {
        match self.toolchain {
            ToolchainType::Ninja | ToolchainType::GradleNinja => vec![self.configuration_type],
            _ => ConfigurationType::ALL.to_vec(),
        }
    }

    pub fn projects_directory(&self) -> PathBuf {
        self.build_directory.join("projects")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(options: EnvironmentOptions) -> Environment {
        Environment::resolve_for_host(options, OperatingSystemType::Linux, ArchitectureType::X64).unwrap()
    }

    #[test]
    fn linux_defaults() {
        let env = resolve(EnvironmentOptions {
            source_directory: "/src".into(),
            ..Default::default()
        });
        assert_eq!(env.target_operating_system, OperatingSystemType::Linux);
        assert_eq!(env.target_architecture, ArchitectureType::X64);
        assert_eq!(env.toolchain, ToolchainType::Ninja);
        assert_eq!(env.compiler, CompilerType::Clang);
        assert_eq!(env.c_library, CLibraryType::Glibc);
        assert_eq!(env.cpp_library, CppLibraryType::Libcxx);
        assert_eq!(env.windows_runtime, None);
        assert_eq!(env.build_directory, PathBuf::from("/src/build/linux"));
        assert_eq!(env.configuration_types(), vec![ConfigurationType::Debug]);
    }

    #[test]
    fn gcc_on_linux_uses_libstdcxx() {
        let env = resolve(EnvironmentOptions {
            compiler: Some(CompilerType::Gcc),
            ..Default::default()
        });
        assert_eq!(env.cpp_library, CppLibraryType::Libstdcxx);
        assert_eq!(env.tools.cxx, "g++");
    }

    #[test]
    fn windows_target_defaults() {
        let env = resolve(EnvironmentOptions {
            target_operating_system: Some(OperatingSystemType::Windows),
            ..Default::default()
        });
        assert_eq!(env.toolchain, ToolchainType::VisualStudio);
        assert_eq!(env.compiler, CompilerType::VisualCpp);
        assert_eq!(env.windows_runtime, Some(WindowsRuntimeType::Win32));
        assert_eq!(env.cpp_library, CppLibraryType::VisualCppRuntime);
        assert_eq!(env.configuration_types().len(), 2);
    }

    #[test]
    fn mac_catalyst_only_applies_to_ios() {
        let env = resolve(EnvironmentOptions {
            enable_mac_catalyst: true,
            ..Default::default()
        });
        assert!(!env.enable_mac_catalyst);
        let env = resolve(EnvironmentOptions {
            target_operating_system: Some(OperatingSystemType::IOS),
            enable_mac_catalyst: true,
            ..Default::default()
        });
        assert!(env.enable_mac_catalyst);
        assert_eq!(env.target_architecture, ArchitectureType::Arm64);
    }

    #[test]
    fn static_c_runtime_implies_static_cpp_runtime() {
        let env = resolve(EnvironmentOptions {
            c_library: Some(CLibraryType::Musl),
            c_library_form: Some(CLibraryForm::Static),
            ..Default::default()
        });
        assert_eq!(env.cpp_library_form, CppLibraryForm::Static);
    }

    #[test]
    fn selector_supplies_every_dimension_but_runtime_off_windows() {
        let env = resolve(EnvironmentOptions::default());
        let s = env.selector(TargetType::Executable, ConfigurationType::Release);
        assert_eq!(s.target_type, Some(TargetType::Executable));
        assert_eq!(s.configuration_type, Some(ConfigurationType::Release));
        assert_eq!(s.windows_runtime, None);
        assert_eq!(s.compiler, Some(CompilerType::Clang));
    }
}
