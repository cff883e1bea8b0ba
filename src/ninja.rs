//! Ninja build scripts: `build.ninja` for the solution plus one
//! `<project>.ninja` per project, all under `<build>/projects`.

use crate::configuration::{Configuration, ConfigurationsExt};
use crate::emit::{Emitted, Emitter};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::fileutils::{relative_path, write_if_changed};
use crate::generation::ResolvedProject;
use crate::naming::project_working_directory;
use crate::types::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SOLUTION_FILE_NAME: &str = "build.ninja";

const RULES: &str = r#"
rule cc
  command = $cc -MMD -MF $out.d $cflags -c $in -o $out
  depfile = $out.d
  deps = gcc
  description = CC $out

rule cxx
  command = $cxx -MMD -MF $out.d $cxxflags -c $in -o $out
  depfile = $out.d
  deps = gcc
  description = CXX $out

rule ar
  command = rm -f $out && $ar rcs $out $in
  description = AR $out

rule arthin
  command = rm -f $out && $ar rcsT $out $in
  description = AR $out

rule link
  command = $cxx -o $out $in $linkflags $libs $postlinkflags
  description = LINK $out

rule strip
  command = $strip -o $out $in
  description = STRIP $out

rule stripx
  command = $strip -x -o $out $in
  description = STRIP $out
"#;

/// `$`, space and colon are significant in ninja paths.
fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if matches!(c, '$' | ' ' | ':') {
            escaped.push('$');
        }
        escaped.push(c);
    }
    escaped
}

/// Quote an argument for the shell running ninja commands. Arguments that
/// carry their own double quotes pass through untouched.
fn shell_quote(arg: &str) -> String {
    if arg.contains('"') {
        return arg.to_string();
    }
    let special = |c: char| c.is_whitespace() || "$`'\\()<>|&;*?!#~[]{}".contains(c);
    if !arg.chars().any(special) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Arguments as a ninja variable value.
fn join_args(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_quote(a).replace('$', "$$"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn compile_args(configuration: &Configuration, c_family: bool) -> Vec<String> {
    let mut args = configuration.common_flags.clone();
    if c_family {
        args.extend(configuration.c_flags.iter().cloned());
    } else {
        args.extend(configuration.cpp_flags.iter().cloned());
    }
    for dir in &configuration.include_directories {
        args.push(format!("-I{}", dir.display()));
    }
    for dir in &configuration.system_include_directories {
        args.push("-isystem".to_string());
        args.push(dir.display().to_string());
    }
    for define in &configuration.defines {
        args.push(format!("-D{}", define));
    }
    args
}

/// Bare names such as `dl` become `-ldl`; anything else is a path.
fn lib_arg(lib: &Path) -> String {
    if lib.components().count() == 1 && lib.extension().is_none() {
        format!("-l{}", lib.display())
    } else {
        lib.display().to_string()
    }
}

fn is_linkable(target_type: TargetType) -> bool {
    matches!(
        target_type,
        TargetType::StaticLibrary | TargetType::IntermediateStaticLibrary | TargetType::DynamicLibrary
    )
}

pub struct NinjaEmitter {
    environment: Environment,
    force: bool,
}

impl NinjaEmitter {
    pub fn new(environment: Environment, force: bool) -> Self {
        NinjaEmitter { environment, force }
    }

    pub fn project_file(&self, name: &str) -> PathBuf {
        self.environment
            .projects_directory()
            .join(format!("{}.ninja", name))
    }

    pub fn solution_file(&self) -> PathBuf {
        self.environment.projects_directory().join(SOLUTION_FILE_NAME)
    }

    /// A path as written in a script run from `base`.
    fn path(&self, path: &Path, base: &Path) -> String {
        escape_path(&relative_path(path, base).to_string_lossy())
    }

    fn output_path(&self, reference: &ProjectReference, base: &Path) -> Option<String> {
        reference
            .output_file_paths
            .get(&self.environment.configuration_type)
            .map(|p| self.path(p, base))
    }

    fn object_path(&self, project: &ResolvedProject, source: &Path, base: &Path) -> String {
        let relative = source
            .strip_prefix(&project.physical_path)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(source.file_name().unwrap_or_default()));
        let mut object = self
            .environment
            .build_directory
            .join("obj")
            .join(self.environment.configuration_type.as_str())
            .join(&project.definition.name)
            .join(relative)
            .into_os_string();
        object.push(".o");
        self.path(Path::new(&object), base)
    }

    /// Script of one project; `None` for projects ninja does not build.
    pub fn project_script(&self, project: &ResolvedProject) -> Result<Option<String>> {
        let env = &self.environment;
        let definition = &project.definition;
        if definition.target_type.is_gradle() {
            return Ok(None);
        }
        let rule = match definition.target_type {
            TargetType::StaticLibrary => "ar",
            TargetType::IntermediateStaticLibrary => "arthin",
            TargetType::Executable | TargetType::DynamicLibrary => "link",
            target_type => {
                return Err(Error::UnsupportedTargetType {
                    target_type,
                    operating_system: env.target_operating_system,
                })
            }
        };

        let base = project_working_directory(env.toolchain, &env.build_directory, &definition.name);
        let selector = env.selector(definition.target_type, env.configuration_type);
        let merged = definition.configurations.merged(&selector);

        let mut out = String::new();
        out.push_str(&format!("# {} ({})\n", definition.name, definition.target_type));
        out.push_str(&format!("cflags = {}\n", join_args(&compile_args(&merged, true))));
        out.push_str(&format!("cxxflags = {}\n\n", join_args(&compile_args(&merged, false))));

        let mut objects = Vec::new();
        for file in &merged.files {
            if !file.file_type.is_compilable() {
                continue;
            }
            let c_family = file.file_type.is_c_family();
            let (compile, variable) = if c_family { ("cc", "cflags") } else { ("cxx", "cxxflags") };
            let object = self.object_path(project, &file.path, &base);
            out.push_str(&format!("build {}: {} {}\n", object, compile, self.path(&file.path, &base)));
            let extra = compile_args(&file.configurations.merged(&selector), c_family);
            if !extra.is_empty() {
                out.push_str(&format!("  {0} = ${0} {1}\n", variable, join_args(&extra)));
            }
            objects.push(object);
        }
        debug!("{}: {} objects", definition.name, objects.len());

        let Some(output) = self.output_path(&project.reference, &base) else {
            return Ok(Some(out));
        };
        // references are already ordered dependents first
        let dependencies: Vec<String> = project
            .references
            .iter()
            .filter(|r| is_linkable(r.target_type))
            .filter_map(|r| self.output_path(r, &base))
            .collect();
        let os = env.target_operating_system;
        let strip = rule == "link"
            && env.configuration_type == ConfigurationType::Release
            && matches!(
                os,
                OperatingSystemType::Linux | OperatingSystemType::MacOS | OperatingSystemType::Android
            );
        let linked = if strip {
            format!("{}.unstripped", output)
        } else {
            output.clone()
        };

        out.push('\n');
        out.push_str(&format!("build {}: {} {}", linked, rule, objects.join(" ")));
        if !dependencies.is_empty() {
            out.push_str(&format!(" | {}", dependencies.join(" ")));
        }
        out.push('\n');
        if rule == "link" {
            let mut link_flags = Vec::new();
            if definition.target_type == TargetType::DynamicLibrary {
                link_flags.push(if os.is_darwin() {
                    "-dynamiclib".to_string()
                } else {
                    "-shared".to_string()
                });
            }
            link_flags.extend(merged.lib_directories.iter().map(|d| format!("-L{}", d.display())));
            link_flags.extend(merged.linker_flags.iter().cloned());
            let mut post_link_flags: Vec<String> = merged.libs.iter().map(|l| lib_arg(l)).collect();
            post_link_flags.extend(merged.post_linker_flags.iter().cloned());
            let mut libs = dependencies.clone();
            if !libs.is_empty() && matches!(os, OperatingSystemType::Linux | OperatingSystemType::Android) {
                libs.insert(0, "-Wl,--start-group".to_string());
                libs.push("-Wl,--end-group".to_string());
            }
            out.push_str(&format!("  linkflags = {}\n", join_args(&link_flags)));
            out.push_str(&format!("  libs = {}\n", libs.join(" ")));
            out.push_str(&format!("  postlinkflags = {}\n", join_args(&post_link_flags)));
        }
        if strip {
            let strip_rule = if definition.target_type == TargetType::DynamicLibrary && os == OperatingSystemType::MacOS {
                "stripx"
            } else {
                "strip"
            };
            out.push_str(&format!("build {}: {} {}\n", output, strip_rule, linked));
        }
        out.push_str(&format!("build {}: phony {}\n", escape_path(&definition.name), output));
        Ok(Some(out))
    }

    pub fn solution_script(&self, solution: &str, projects: &[ProjectReference]) -> String {
        let tools = &self.environment.tools;
        let mut out = format!("# {}\nninja_required_version = 1.7\n\n", solution);
        out.push_str(&format!("cc = {}\n", tools.cc));
        out.push_str(&format!("cxx = {}\n", tools.cxx));
        out.push_str(&format!("ar = {}\n", tools.ar));
        out.push_str(&format!("strip = {}\n", tools.strip));
        out.push_str(RULES);
        out.push('\n');
        let base = self.environment.projects_directory();
        for project in projects {
            out.push_str(&format!("subninja {}\n", self.path(&self.project_file(&project.name), &base)));
        }
        out
    }
}

impl Emitter for NinjaEmitter {
    fn emit_project(&self, project: &ResolvedProject) -> Result<Emitted> {
        let Some(script) = self.project_script(project)? else {
            warn!("Skipping {}: not built by ninja", project.definition.name);
            return Ok(Emitted::Skipped);
        };
        write_if_changed(&self.project_file(&project.definition.name), &script, self.force)
            .map(Emitted::from_written)
    }

    fn emit_solution(&self, solution: &str, projects: &[ProjectReference]) -> Result<Emitted> {
        let script = self.solution_script(solution, projects);
        write_if_changed(&self.solution_file(), &script, self.force).map(Emitted::from_written)
    }
}
