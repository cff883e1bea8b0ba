//! End-to-end generation over a temporary source tree.

use projmake::discovery::discover_projects;
use projmake::emit::emitter_for;
use projmake::environment::{Environment, EnvironmentOptions};
use projmake::generation::{generate, resolve, select, Summary};
use projmake::manifest::{Manifest, MANIFEST_FILE_NAME};
use projmake::types::*;
use projmake::Error;
use std::fs;
use std::path::Path;
use std::process::Command;

const MANIFEST: &str = r#"
solution = "Sample"

[dependencies]
math = ["core"]
hello = ["math"]

[[rules]]
compilers = ["clang"]
common_flags = ["-Wall"]

[platform.linux]
cxx = "clang++-17"
linker_flags = ["-fuse-ld=lld"]
"#;

fn touch(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, MANIFEST_FILE_NAME, MANIFEST);
    touch(root, "modules/core/include/core/core.h", "#pragma once\n");
    touch(root, "modules/core/src/core.cpp", "int core() { return 1; }\n");
    touch(root, "modules/core/src/core_windows.cpp", "\n");
    touch(root, "modules/core/test/core_test.cpp", "int main() {}\n");
    touch(root, "modules/math/include/math/math.h", "#pragma once\n");
    touch(root, "modules/math/src/math.cpp", "\n");
    touch(root, "products/hello/main.cpp", "int main() {}\n");
    dir
}

fn environment(root: &Path) -> Environment {
    Environment::resolve_for_host(
        EnvironmentOptions {
            source_directory: root.canonicalize().unwrap(),
            target_operating_system: Some(OperatingSystemType::Linux),
            toolchain: Some(ToolchainType::Ninja),
            compiler: Some(CompilerType::Clang),
            ..Default::default()
        },
        OperatingSystemType::Linux,
        ArchitectureType::X64,
    )
    .unwrap()
}

fn run(root: &Path, names: &[String], force: bool) -> projmake::Result<Summary> {
    let mut env = environment(root);
    let manifest = Manifest::load(&env.source_directory)?;
    manifest.apply_tools(&mut env);
    let solution = manifest.solution_name(&env);
    let projects = discover_projects(&env, &manifest)?;
    let selected = select(&projects, names)?;
    let external: Vec<_> = manifest
        .platform(env.target_operating_system)
        .map(|p| p.external_configuration())
        .into_iter()
        .collect();
    let resolution = resolve(&env, &solution, &selected, &external)?;
    let emitter = emitter_for(&env, force)?;
    generate(&resolution, emitter.as_ref())
}

#[test]
fn generates_ninja_scripts() {
    let dir = sample_tree();
    let summary = run(dir.path(), &[], false).unwrap();
    // core, core_test_core_test, math, hello, build.ninja
    assert_eq!(summary, Summary { written: 5, unchanged: 0, skipped: 0 });

    let projects = dir.path().join("build/linux/projects");
    let solution = fs::read_to_string(projects.join("build.ninja")).unwrap();
    assert!(solution.starts_with("# Sample\n"));
    assert!(solution.contains("cxx = clang++-17\n"));
    let position = |name: &str| solution.find(&format!("subninja {}.ninja", name)).unwrap();
    assert!(position("core") < position("math"));
    assert!(position("math") < position("hello"));
    assert!(position("core") < position("core_test_core_test"));

    let core = fs::read_to_string(projects.join("core.ninja")).unwrap();
    assert!(core.contains("-Wall"));
    assert!(core.contains("core.cpp.o: cxx"));
    assert!(!core.contains("core_windows.cpp"));

    let hello = fs::read_to_string(projects.join("hello.ninja")).unwrap();
    assert!(hello.contains("build ../Debug/hello: link"));
    assert!(hello.contains("| ../Debug/libmath.a ../Debug/libcore.a"));
    assert!(hello.contains("-fuse-ld=lld"));
    assert!(hello.contains("math/include"));
    assert!(hello.contains("core/include"));
}

#[test]
fn unchanged_scripts_are_not_rewritten() {
    let dir = sample_tree();
    run(dir.path(), &[], false).unwrap();
    assert_eq!(run(dir.path(), &[], false).unwrap(), Summary { written: 0, unchanged: 5, skipped: 0 });
    assert_eq!(run(dir.path(), &[], true).unwrap(), Summary { written: 5, unchanged: 0, skipped: 0 });

    touch(dir.path(), "modules/core/src/extra.cpp", "\n");
    assert_eq!(run(dir.path(), &[], false).unwrap(), Summary { written: 1, unchanged: 4, skipped: 0 });
}

#[test]
fn selection_must_be_dependency_closed() {
    let dir = sample_tree();
    let names = vec!["hello".to_string()];
    match run(dir.path(), &names, false) {
        Err(Error::UnresolvedDependencies(missing)) => {
            assert_eq!(missing["hello"], vec!["math"]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!dir.path().join("build").exists());

    let names = vec!["core".to_string(), "math".to_string()];
    assert_eq!(run(dir.path(), &names, false).unwrap().written, 3);
}

#[test]
fn unknown_dependency_blocks_generation() {
    let dir = sample_tree();
    touch(
        dir.path(),
        MANIFEST_FILE_NAME,
        "[dependencies]\nhello = [\"network\"]\n",
    );
    assert!(matches!(
        run(dir.path(), &[], false),
        Err(Error::UnresolvedDependencies(_))
    ));
    assert!(!dir.path().join("build").exists());
}

#[test]
fn cli_check_and_generate() {
    let dir = sample_tree();
    let projmake_with = |toolchain: &str, args: &[&str]| {
        Command::new(env!("CARGO_BIN_EXE_projmake"))
            .arg("--source")
            .arg(dir.path())
            .args(["--target-os", "linux", "--toolchain", toolchain, "--compiler", "clang", "-q"])
            .args(args)
            .output()
            .expect("failed to run projmake")
    };
    let projmake = |args: &[&str]| projmake_with("ninja", args);

    let output = projmake(&["check"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let core = stdout.find("core ").unwrap();
    let hello = stdout.find("hello ").unwrap();
    assert!(core < hello);

    let output = projmake(&["dump", "hello", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let merged: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(merged["target_types"], serde_json::json!(["Executable"]));

    let output = projmake(&["generate", "--cpp-flags=-std=c++20", "--post-linker-flags", "-lpthread"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let projects = dir.path().join("build/linux/projects");
    assert!(projects.join("build.ninja").is_file());
    let hello = fs::read_to_string(projects.join("hello.ninja")).unwrap();
    assert!(hello.contains("cxxflags = ") && hello.contains("-std=c++20"));
    assert!(hello.contains("  postlinkflags = ") && hello.contains("-lpthread"));

    let output = projmake_with("VisualStudio", &["generate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not supported"));
}
