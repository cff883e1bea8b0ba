//! Built-in base rules applied to every C/C++ project before its own rules.

use crate::configuration::{parse_defines, Configuration};
use crate::environment::Environment;
use crate::error::Result;
use crate::types::{
    ArchitectureType as Arch, CLibraryForm, CLibraryType, CompilerType as C, ConfigurationType as Cfg,
    CppLibraryForm, CppLibraryType, OperatingSystemType as Os, TargetType as T, ToolchainType as Tc,
    WindowsRuntimeType,
};

fn rule() -> Configuration {
    Configuration::default()
}

/// The common table, in priority order. `solution` names the export macro.
pub fn common_configurations(environment: &Environment, solution: &str) -> Result<Vec<Configuration>> {
    let solution = solution.to_uppercase();
    let win32 = environment.windows_runtime == Some(WindowsRuntimeType::Win32);
    let use_modules = environment.compiler == C::VisualCpp && win32;
    let export_defines = if use_modules {
        format!("{0}_USE_MODULE;{0}_EXPORT=export", solution)
    } else {
        format!("{}_EXPORT=", solution)
    };
    let gnu = [C::Gcc, C::Clang];
    let msvc = [C::VisualCpp, C::ClangCl];
    let ninja = [Tc::Ninja, Tc::GradleNinja];

    let rules = vec![
        rule()
            .matching_compilers([C::ClangCl])
            .option("vc.Configuration.PlatformToolset", "ClangCL")?,
        rule()
            .matching_target_types([T::StaticLibrary])
            .matching_compilers([C::ClangCl])
            .option("vc.Lib.LinkTimeCodeGeneration", "false")?,
        rule().defines(parse_defines(&export_defines)?),
        rule()
            .matching_compilers(msvc)
            .option("vc.ClCompile.LanguageStandard", if win32 { "stdcpp20" } else { "stdcpp17" })?,
        rule()
            .matching_target_operating_systems([Os::Windows])
            .matching_windows_runtimes([WindowsRuntimeType::WinRT])
            .matching_compilers([C::VisualCpp])
            .option("vc.ClCompile.CompileAsWinRT", "false")?,
        rule()
            .matching_target_types([T::Executable, T::DynamicLibrary])
            .matching_target_operating_systems([Os::Windows])
            .matching_windows_runtimes([WindowsRuntimeType::WinRT])
            .matching_compilers([C::VisualCpp])
            .option("vc.Link.GenerateWindowsMetadata", "false")?,
        rule().matching_compilers(gnu).cpp_flags("-std=c++20"),
        rule()
            .matching_compilers(msvc)
            .defines(parse_defines(
                "_CRT_SECURE_NO_DEPRECATE;_CRT_NONSTDC_NO_DEPRECATE;_SCL_SECURE_NO_WARNINGS;_CRT_SECURE_NO_WARNINGS",
            )?)
            .common_flags("/bigobj /JMC /we4172 /we4715")
            .option("vc.Configuration.UseNativeEnvironment", "true")?,
        rule()
            .matching_compilers(gnu)
            .common_flags("-fsigned-char -fvisibility=hidden")
            .cpp_flags("-fvisibility-inlines-hidden"),
        rule()
            .matching_compilers(gnu)
            .common_flags(
                "-Wno-unused-function -Wno-comment -Werror=return-type -Werror=address \
                 -Werror=sequence-point -Werror=int-to-pointer-cast -Werror=format \
                 -Werror=format-security -Werror=init-self -Werror=pointer-arith \
                 -Wuninitialized -Wundef -Wformat-nonliteral -Wno-error=uninitialized \
                 -Wno-error=undef -Wno-error=format-nonliteral",
            )
            .c_flags(
                "-Werror=strict-prototypes -Werror=implicit-int \
                 -Werror=implicit-function-declaration -Werror=pointer-to-int-cast",
            )
            .cpp_flags("-Wsign-promo -Wno-error=sign-promo"),
        rule().matching_compilers([C::Gcc]).common_flags("-Werror=return-local-addr"),
        rule().matching_compilers([C::Clang]).common_flags(
            "-Werror=return-stack-address -Werror=incomplete-implementation \
             -Werror=mismatched-return-types -Werror=unguarded-availability",
        ),
        rule()
            .matching_target_operating_systems([Os::Windows])
            .defines(parse_defines("WIN32;_WINDOWS")?),
        rule()
            .matching_target_operating_systems([Os::Linux, Os::Android])
            .common_flags("-fPIC"),
        rule()
            .matching_c_libraries([CLibraryType::Glibc])
            .common_flags("-pthread")
            .linker_flags("-pthread")
            .libs(["dl", "rt"]),
        rule()
            .matching_compilers(gnu)
            .matching_target_architectures([Arch::Armv7a])
            .common_flags("-mfpu=neon -fno-omit-frame-pointer"),
        rule()
            .matching_compilers([C::Clang])
            .matching_cpp_libraries([CppLibraryType::Libcxx])
            .cpp_flags("-stdlib=libc++")
            .linker_flags("-stdlib=libc++"),
        rule()
            .matching_compilers(msvc)
            .matching_c_library_forms([CLibraryForm::Static])
            .matching_configuration_types([Cfg::Debug])
            .option("vc.ClCompile.RuntimeLibrary", "MultiThreadedDebug")?,
        rule()
            .matching_compilers(msvc)
            .matching_c_library_forms([CLibraryForm::Dynamic])
            .matching_configuration_types([Cfg::Debug])
            .option("vc.ClCompile.RuntimeLibrary", "MultiThreadedDebugDLL")?,
        rule()
            .matching_compilers(msvc)
            .matching_c_library_forms([CLibraryForm::Static])
            .matching_configuration_types([Cfg::Release])
            .option("vc.ClCompile.RuntimeLibrary", "MultiThreaded")?,
        rule()
            .matching_compilers(msvc)
            .matching_c_library_forms([CLibraryForm::Dynamic])
            .matching_configuration_types([Cfg::Release])
            .option("vc.ClCompile.RuntimeLibrary", "MultiThreadedDLL")?,
        rule()
            .matching_compilers(gnu)
            .matching_c_libraries([CLibraryType::Musl])
            .matching_cpp_library_forms([CppLibraryForm::Static])
            .common_flags("-static")
            .linker_flags("-static -Wl,-static"),
        rule()
            .matching_compilers(gnu)
            .matching_c_library_forms([CLibraryForm::Dynamic])
            .matching_cpp_library_forms([CppLibraryForm::Static])
            .matching_target_operating_systems([Os::Linux])
            .linker_flags("-static-libgcc"),
        rule()
            .matching_compilers(gnu)
            .matching_c_library_forms([CLibraryForm::Dynamic])
            .matching_cpp_libraries([CppLibraryType::Libstdcxx, CppLibraryType::Libcxx])
            .matching_cpp_library_forms([CppLibraryForm::Static])
            .matching_target_operating_systems([Os::Linux, Os::Android])
            .linker_flags("-static-libstdc++"),
        rule()
            .matching_configuration_types([Cfg::Debug])
            .defines(parse_defines("DEBUG=1")?),
        rule()
            .matching_configuration_types([Cfg::Release])
            .defines(parse_defines("NDEBUG")?),
        rule()
            .matching_compilers([C::Clang])
            .matching_target_operating_systems([Os::Windows])
            .matching_configuration_types([Cfg::Debug])
            .defines(parse_defines("_DEBUG;_MT;_DLL")?)
            .common_flags("-gcodeview-ghash")
            .linker_flags(
                "-Wl,/debug -Wl,/nodefaultlib:libucrt -Wl,/nodefaultlib:libvcruntime -Wl,/nodefaultlib:libcmt",
            )
            .libs(["ucrtd", "vcruntimed", "msvcrtd"]),
        rule()
            .matching_compilers([C::Clang])
            .matching_target_operating_systems([Os::Windows])
            .matching_configuration_types([Cfg::Release])
            .defines(parse_defines("_MT")?)
            .common_flags("-gcodeview-ghash")
            .linker_flags("-Wl,/debug"),
        rule()
            .matching_compilers(gnu)
            .matching_configuration_types([Cfg::Debug])
            .common_flags("-O0"),
        rule()
            .matching_target_operating_systems([Os::Windows, Os::Linux, Os::MacOS, Os::IOS])
            .matching_compilers(gnu)
            .matching_configuration_types([Cfg::Release])
            .common_flags("-O3"),
        rule()
            .matching_target_operating_systems([Os::Android])
            .matching_compilers([C::Gcc])
            .matching_configuration_types([Cfg::Release])
            .common_flags("-O3"),
        rule()
            .matching_target_operating_systems([Os::Android])
            .matching_target_architectures([Arch::X86, Arch::X64, Arch::Arm64])
            .matching_compilers([C::Clang])
            .matching_configuration_types([Cfg::Release])
            .common_flags("-O3"),
        // NDK armv7a libraries are built with -Oz
        rule()
            .matching_target_operating_systems([Os::Android])
            .matching_target_architectures([Arch::Armv7a])
            .matching_compilers([C::Clang])
            .matching_configuration_types([Cfg::Release])
            .common_flags("-Oz"),
        rule().matching_compilers(gnu).common_flags("-g"),
        rule()
            .matching_compilers(gnu)
            .matching_host_architectures([Arch::X64])
            .matching_target_architectures([Arch::X86])
            .common_flags("-m32")
            .linker_flags("-m32"),
        rule()
            .matching_target_types([T::Executable, T::DynamicLibrary])
            .matching_target_operating_systems([Os::Linux])
            .linker_flags("-Wl,-rpath -Wl,$ORIGIN"),
        rule()
            .matching_target_types([T::Executable, T::DynamicLibrary])
            .matching_target_operating_systems([Os::MacOS])
            .matching_toolchains([Tc::Ninja])
            .linker_flags("-Wl,-rpath -Wl,@executable_path"),
        rule()
            .matching_target_types([T::Executable, T::DynamicLibrary])
            .matching_target_operating_systems([Os::MacOS])
            .matching_toolchains([Tc::XCode])
            .option("xcode.project.LD_RUNPATH_SEARCH_PATHS", "@executable_path")?,
        rule()
            .matching_target_operating_systems([Os::MacOS])
            .option("xcode.project.MACOSX_DEPLOYMENT_TARGET", "10.10")?,
        rule()
            .matching_target_operating_systems([Os::IOS])
            .option("xcode.project.IPHONEOS_DEPLOYMENT_TARGET", "9.0")?,
        rule()
            .matching_toolchains(ninja)
            .matching_target_operating_systems([Os::Android])
            .common_flags(
                "-fno-addrsig -fPIE -fPIC -DANDROID -D_FORTIFY_SOURCE=2 -fdata-sections \
                 -ffunction-sections -funwind-tables -fstack-protector-strong \
                 -no-canonical-prefixes -Wa,--noexecstack -Werror=fortify-source",
            )
            .linker_flags(
                "-Wl,--no-rosegment -Wl,--exclude-libs,libgcc.a -Wl,--exclude-libs,libgcc_real.a \
                 -Wl,--exclude-libs,libatomic.a -Wl,--build-id=sha1 -Wl,--warn-shared-textrel \
                 -Wl,--fatal-warnings -Wl,--no-undefined -Wl,-z,noexecstack -Wl,-z,relro -Wl,-z,now",
            ),
        rule()
            .matching_toolchains(ninja)
            .matching_target_operating_systems([Os::Android])
            .matching_target_architectures([Arch::Armv7a])
            .linker_flags("-Wl,--exclude-libs,libunwind.a"),
        rule()
            .matching_toolchains(ninja)
            .matching_target_operating_systems([Os::Android])
            .matching_target_architectures([Arch::X86])
            .common_flags("-mstackrealign"),
        rule()
            .matching_target_operating_systems([Os::Linux, Os::Android])
            .matching_compilers(gnu)
            .matching_configuration_types([Cfg::Release])
            .linker_flags("-Wl,--gc-sections"),
        rule()
            .matching_toolchains(ninja)
            .matching_compilers([C::Gcc])
            .common_flags("-fdiagnostics-color")
            .linker_flags("-fdiagnostics-color"),
        rule()
            .matching_toolchains(ninja)
            .matching_compilers([C::Clang])
            .common_flags("-fcolor-diagnostics -fansi-escape-codes")
            .linker_flags("-fcolor-diagnostics -fansi-escape-codes"),
    ];
    Ok(rules)
}
