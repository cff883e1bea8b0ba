//! Discovery of projects under `<source>/modules` and `<source>/products`.

use crate::configuration::{parse_defines, Configuration};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::naming::project_file_name;
use crate::rules::common_configurations;
use crate::types::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A file or directory name split into its base and its tags,
/// e.g. `hello.ios` or `window_win32.cpp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTags {
    pub base: String,
    pub tags: Vec<String>,
}

impl NameTags {
    /// Project directories separate tags with dots only.
    pub fn for_project(name: &str) -> Self {
        Self::split(name, &['.'])
    }

    /// Files and nested directories separate tags with dots or underscores.
    pub fn for_file(name: &str) -> Self {
        Self::split(name, &['.', '_'])
    }

    fn split(name: &str, separators: &[char]) -> Self {
        let mut parts = name.split(separators);
        let base = parts.next().unwrap_or_default().to_string();
        NameTags {
            base,
            tags: parts.map(str::to_string).collect(),
        }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether a name with these tags applies to `target`. Untagged names
    /// apply everywhere unless `exact` is set.
    pub fn applies_to(&self, target: OperatingSystemType, exact: bool) -> bool {
        let mut names_any_os = false;
        for tag in &self.tags {
            match operating_system_of_tag(tag) {
                Some(os) if os == target => return true,
                Some(_) => names_any_os = true,
                None => {}
            }
        }
        !names_any_os && !exact
    }
}

fn operating_system_of_tag(tag: &str) -> Option<OperatingSystemType> {
    const ALIASES: &[(&str, OperatingSystemType)] = &[
        ("Win", OperatingSystemType::Windows),
        ("WinRT", OperatingSystemType::Windows),
        ("Mac", OperatingSystemType::MacOS),
    ];
    ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(tag))
        .map(|(_, os)| *os)
        .or_else(|| tag.parse().ok())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Immediate subdirectories and files of `dir`, each sorted by name.
/// A missing directory has no entries.
fn list_directory(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok((dirs, files));
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        } else {
            files.push(entry.into_path());
        }
    }
    Ok((dirs, files))
}

/// Walks the source tree and builds project descriptions.
pub struct Discovery<'a> {
    environment: &'a Environment,
    manifest: &'a Manifest,
    solution: String,
    base_configurations: Vec<Configuration>,
}

impl<'a> Discovery<'a> {
    pub fn new(environment: &'a Environment, manifest: &'a Manifest) -> Result<Self> {
        let solution = manifest.solution_name(environment);
        let mut base_configurations = common_configurations(environment, &solution)?;
        base_configurations.extend(manifest.rules.iter().cloned());
        Ok(Discovery {
            environment,
            manifest,
            solution,
            base_configurations,
        })
    }

    fn project_file_path(&self, name: &str) -> PathBuf {
        self.environment
            .projects_directory()
            .join(project_file_name(self.environment.toolchain, name))
    }

    fn requirements(&self, name: &str) -> Vec<String> {
        self.manifest.requirements(name).to_vec()
    }

    fn catalyst_mac_only(&self, tags: &NameTags) -> bool {
        self.environment.enable_mac_catalyst
            && self.environment.target_operating_system == OperatingSystemType::IOS
            && tags.applies_to(OperatingSystemType::MacOS, true)
    }

    /// All files below `dir`, recursing into subdirectories first.
    pub fn files_in_directory(&self, dir: &Path, applicable: bool) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        self.fill_files(dir, applicable, &mut files)?;
        Ok(files)
    }

    fn fill_files(&self, dir: &Path, applicable: bool, out: &mut Vec<SourceFile>) -> Result<()> {
        if !dir.is_dir() {
            return Ok(());
        }
        let tags = NameTags::for_file(&file_name_of(dir));
        let target = self.environment.target_operating_system;
        let applicable_here = applicable && (tags.applies_to(target, false) || self.catalyst_mac_only(&tags));

        let (dirs, files) = list_directory(dir)?;
        for sub in dirs {
            let is_asset_catalog = sub
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("xcassets"));
            if is_asset_catalog {
                out.push(SourceFile::new(sub, FileType::EmbeddedContent));
            } else {
                self.fill_files(&sub, applicable_here, out)?;
            }
        }
        for file in files {
            out.push(self.classify(file, applicable_here)?);
        }
        Ok(())
    }

    /// Classify a file by extension and tags.
    pub fn classify(&self, path: PathBuf, applicable: bool) -> Result<SourceFile> {
        let env = self.environment;
        let target = env.target_operating_system;
        let tags = NameTags::for_file(&file_name_of(&path));
        let catalyst_mac = applicable && self.catalyst_mac_only(&tags);

        if !(applicable && tags.applies_to(target, false)) && !catalyst_mac {
            return Ok(SourceFile::new(path, FileType::Unknown));
        }

        let mut configurations = Vec::new();
        if env.enable_mac_catalyst && target == OperatingSystemType::IOS {
            let ios_only = tags.applies_to(target, true);
            if ios_only && !catalyst_mac {
                configurations.push(Configuration::default().option("xcode.buildFile.platformFilter", "ios")?);
            } else if !ios_only && catalyst_mac {
                configurations.push(Configuration::default().option("xcode.buildFile.platformFilter", "maccatalyst")?);
            }
        }

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let file_type = if target.is_darwin() && tags.has("mm") {
            FileType::ObjectiveCppSource
        } else {
            match extension.as_str() {
                "h" | "hh" | "hpp" | "hxx" => FileType::Header,
                "c" => FileType::CSource,
                "cc" | "cpp" | "cxx" => FileType::CppSource,
                "ixx" if env.compiler == CompilerType::VisualCpp
                    && env.windows_runtime == Some(WindowsRuntimeType::Win32) =>
                {
                    FileType::CppSource
                }
                "m" if target.is_darwin() => FileType::ObjectiveCSource,
                "mm" if target.is_darwin() => FileType::ObjectiveCppSource,
                "storyboard" | "xib" => FileType::EmbeddedContent,
                "natvis" => FileType::NatVis,
                _ => FileType::Unknown,
            }
        };

        Ok(SourceFile {
            path,
            file_type,
            exported: false,
            configurations,
        })
    }

    /// Step 1: every project the source tree describes for this environment.
    pub fn discover(&self) -> Result<BTreeMap<String, ProjectDescription>> {
        let source = &self.environment.source_directory;
        let mut projects = Vec::new();

        if self.environment.enable_libcxx_build {
            projects.push(self.libcxx_project()?);
        }

        let (modules, _) = list_directory(&source.join("modules"))?;
        info!("Found {} modules", modules.len());
        for module in modules {
            self.add_module(&module, &mut projects)?;
        }

        let (products, _) = list_directory(&source.join("products"))?;
        info!("Found {} products", products.len());
        for product in products {
            self.add_product(&product, &mut projects)?;
        }

        check_duplicates(&projects)?;

        if self.environment.enable_libcxx_build {
            for project in &mut projects {
                if project.definition.name != LIBCXX && !project.requirements.iter().any(|r| r == LIBCXX) {
                    project.requirements.push(LIBCXX.to_string());
                }
            }
        }

        Ok(projects
            .into_iter()
            .map(|p| (p.definition.name.clone(), p))
            .collect())
    }

    fn add_module(&self, dir: &Path, projects: &mut Vec<ProjectDescription>) -> Result<()> {
        use OperatingSystemType::*;

        let env = self.environment;
        let name = file_name_of(dir);
        let applicable = NameTags::for_project(&name).applies_to(env.target_operating_system, false);
        if !applicable && !env.enable_dummy {
            debug!("skipping module {}", name);
            return Ok(());
        }

        let include_dirs = vec![dir.join("include"), dir.join("src")];
        let mut files = Vec::new();
        for d in &include_dirs {
            files.extend(self.files_in_directory(d, applicable)?);
        }
        let requirements = self.requirements(&name);
        debug!("module {} with {} files", name, files.len());

        projects.push(ProjectDescription {
            definition: Project {
                name: name.clone(),
                virtual_dir: PathBuf::from("modules"),
                file_path: self.project_file_path(&name),
                target_type: TargetType::StaticLibrary,
                target_name: None,
                configurations: vec![Configuration::default()
                    .include_directories(include_dirs.clone())
                    .files(files)],
            },
            base_configurations: self.base_configurations.clone(),
            export_configurations: vec![Configuration::default().include_directories([dir.join("include")])],
            physical_path: dir.to_path_buf(),
            requirements: requirements.clone(),
        });

        let no_tests = matches!(env.target_operating_system, Android | IOS)
            || (env.target_operating_system == Windows && env.windows_runtime == Some(WindowsRuntimeType::WinRT));
        if no_tests {
            return Ok(());
        }
        for test in self.files_in_directory(&dir.join("test"), applicable)? {
            if test.file_type != FileType::CppSource {
                continue;
            }
            let test_name = test_project_name(&name, dir, &test.path);
            let mut test_requirements = requirements.clone();
            if !test_requirements.contains(&name) {
                test_requirements.push(name.clone());
            }
            debug!("test {} for module {}", test_name, name);
            projects.push(ProjectDescription {
                definition: Project {
                    name: test_name.clone(),
                    virtual_dir: PathBuf::from("modules"),
                    file_path: self.project_file_path(&test_name),
                    target_type: TargetType::Executable,
                    target_name: None,
                    configurations: vec![Configuration::default()
                        .include_directories(include_dirs.clone())
                        .files([test])],
                },
                base_configurations: self.base_configurations.clone(),
                export_configurations: Vec::new(),
                physical_path: dir.to_path_buf(),
                requirements: test_requirements,
            });
        }
        Ok(())
    }

    fn add_product(&self, dir: &Path, projects: &mut Vec<ProjectDescription>) -> Result<()> {
        let env = self.environment;
        let target = env.target_operating_system;
        let name = file_name_of(dir);
        let tags = NameTags::for_project(&name);

        let mut target_type = if tags.has("dynamic") {
            TargetType::DynamicLibrary
        } else if tags.has("static") {
            TargetType::StaticLibrary
        } else {
            TargetType::Executable
        };
        if target_type == TargetType::Executable && dir.join("Info.plist").is_file() {
            target_type = TargetType::DarwinApplication;
        }
        let mut gradle_target_type = None;
        if dir.join("AndroidManifest.xml").is_file() {
            if target_type == TargetType::DynamicLibrary {
                gradle_target_type = Some(TargetType::GradleLibrary);
            } else {
                target_type = TargetType::DynamicLibrary;
                gradle_target_type = Some(TargetType::GradleApplication);
            }
        }

        let mut applicable = tags.applies_to(target, false);
        if target_type == TargetType::DarwinApplication && env.toolchain != ToolchainType::XCode {
            applicable = false;
        }
        if target_type == TargetType::Executable
            && (target == OperatingSystemType::IOS
                || (target == OperatingSystemType::Windows
                    && env.windows_runtime == Some(WindowsRuntimeType::WinRT)))
        {
            applicable = false;
        }
        if !applicable && !env.enable_dummy {
            debug!("skipping product {}", name);
            return Ok(());
        }

        let is_library = matches!(target_type, TargetType::StaticLibrary | TargetType::DynamicLibrary);
        let macro_prefix = self.solution.to_uppercase();
        let defines = match target_type {
            TargetType::StaticLibrary => parse_defines(&format!("{0}_BUILD;{0}_STATIC", macro_prefix))?,
            TargetType::DynamicLibrary => parse_defines(&format!("{0}_BUILD;{0}_DYNAMIC", macro_prefix))?,
            _ => Vec::new(),
        };
        let target_name = tags.base.clone();

        let include_dir = dir.join("include");
        let mut files = self.files_in_directory(dir, applicable)?;
        if is_library {
            for file in &mut files {
                file.exported = file.path.starts_with(&include_dir);
            }
        }

        let mut configurations = vec![Configuration::default()
            .include_directories([include_dir.clone(), dir.join("src"), dir.to_path_buf()])
            .defines(defines)
            .files(files)];
        let version_script = env.source_directory.join("products").join("export.version");
        if version_script.is_file() {
            configurations.push(
                Configuration::default()
                    .matching_compilers([CompilerType::Gcc, CompilerType::Clang])
                    .matching_target_operating_systems([OperatingSystemType::Linux, OperatingSystemType::Android])
                    .matching_target_types([TargetType::DynamicLibrary])
                    .linker_flags(&format!("-Wl,--version-script={}", version_script.display())),
            );
        }
        configurations.push(
            Configuration::default()
                .matching_target_operating_systems([OperatingSystemType::MacOS, OperatingSystemType::IOS])
                .matching_target_types([
                    TargetType::DarwinApplication,
                    TargetType::DarwinStaticFramework,
                    TargetType::DarwinSharedFramework,
                    TargetType::MacBundle,
                ])
                .option(
                    "xcode.target.PRODUCT_BUNDLE_IDENTIFIER",
                    format!("{}.{}", self.solution, target_name),
                )?,
        );

        let requirements = self.requirements(&name);
        let export_configurations = if is_library {
            vec![Configuration::default().include_directories([include_dir])]
        } else {
            Vec::new()
        };

        if target != OperatingSystemType::IOS || target_type != TargetType::DynamicLibrary {
            debug!("product {} as {}", name, target_type);
            projects.push(ProjectDescription {
                definition: Project {
                    name: name.clone(),
                    virtual_dir: PathBuf::from("products"),
                    file_path: self.project_file_path(&name),
                    target_type: if applicable { target_type } else { TargetType::StaticLibrary },
                    target_name: Some(target_name.clone()),
                    configurations: configurations.clone(),
                },
                base_configurations: self.base_configurations.clone(),
                export_configurations,
                physical_path: dir.to_path_buf(),
                requirements: requirements.clone(),
            });
        }

        if target.is_darwin() && env.toolchain == ToolchainType::XCode && target_type == TargetType::DynamicLibrary {
            let framework = format!("{}.framework", name);
            debug!("framework {} for {}", framework, name);
            projects.push(ProjectDescription {
                definition: Project {
                    name: framework.clone(),
                    virtual_dir: PathBuf::from("products"),
                    file_path: self.project_file_path(&framework),
                    target_type: TargetType::DarwinSharedFramework,
                    target_name: Some(target_name.clone()),
                    configurations,
                },
                base_configurations: self.base_configurations.clone(),
                export_configurations: Vec::new(),
                physical_path: dir.to_path_buf(),
                requirements,
            });
        }

        if let (OperatingSystemType::Android, Some(gradle_type)) = (target, gradle_target_type) {
            let wrapper = format!("{}:{}", name, gradle_type);
            debug!("gradle wrapper {}", wrapper);
            let sources = ["java", "include", "src"]
                .into_iter()
                .map(|d| SourceFile::new(dir.join(d), FileType::Unknown));
            projects.push(ProjectDescription {
                definition: Project {
                    name: wrapper,
                    virtual_dir: PathBuf::from("products"),
                    file_path: env
                        .build_directory
                        .join("gradle")
                        .join(project_file_name(env.toolchain, &name)),
                    target_type: gradle_type,
                    target_name: Some(target_name),
                    configurations: vec![Configuration::default().files(sources)],
                },
                base_configurations: Vec::new(),
                export_configurations: Vec::new(),
                physical_path: dir.to_path_buf(),
                requirements: vec![name],
            });
        }
        Ok(())
    }

    fn libcxx_project(&self) -> Result<ProjectDescription> {
        use OperatingSystemType::*;

        let env = self.environment;
        let input = env
            .build_directory
            .parent()
            .unwrap_or(env.build_directory.as_path())
            .join("lib")
            .join(LIBCXX)
            .join("generic");
        let libcxx_dir = single_source_dir(&input, "libcxx-", "libcxx")?;
        let libcxxabi_dir = single_source_dir(&input, "libcxxabi-", "libcxxabi")?;
        info!("Building libcxx from {}", libcxx_dir.display());

        let support = libcxx_dir.join("src").join("support");
        let runtime = support.join("runtime");
        let mut libcxx_sources = self.files_in_directory(&libcxx_dir.join("include"), true)?;
        libcxx_sources.extend(
            self.files_in_directory(&libcxx_dir.join("src"), true)?
                .into_iter()
                .filter(|f| !f.path.starts_with(&support) || f.path.starts_with(&runtime)),
        );
        let mut libcxxabi_sources = self.files_in_directory(&libcxxabi_dir.join("include"), true)?;
        libcxxabi_sources.extend(self.files_in_directory(&libcxxabi_dir.join("src"), true)?);

        let hidden = r#"_LIBCPP_HIDDEN=__attribute__ ((__visibility__("hidden")))"#;
        let darwin_defines = parse_defines(&format!(
            "_LIBCPP_BUILDING_LIBRARY;_LIBCPP_BUILDING_HAS_NO_ABI_LIBRARY;_LIBCPP_DISABLE_VISIBILITY_ANNOTATIONS;_LIBCPP_DISABLE_AVAILABILITY;{}",
            hidden
        ))?;
        let linux_defines = parse_defines(&format!(
            "_LIBCPP_BUILDING_LIBRARY;LIBCXX_BUILDING_LIBCXXABI;_LIBCPP_DISABLE_VISIBILITY_ANNOTATIONS;_LIBCPP_DISABLE_AVAILABILITY;{}",
            hidden
        ))?;
        let export_defines = parse_defines(&format!(
            "_LIBCPP_DISABLE_VISIBILITY_ANNOTATIONS;_LIBCPP_DISABLE_AVAILABILITY;{}",
            hidden
        ))?;
        let musl = Configuration::default()
            .matching_c_libraries([CLibraryType::Musl])
            .defines(parse_defines("_LIBCPP_HAS_MUSL_LIBC")?);

        let mut all_sources = libcxx_sources.clone();
        all_sources.extend(libcxxabi_sources);

        Ok(ProjectDescription {
            definition: Project {
                name: LIBCXX.to_string(),
                virtual_dir: PathBuf::from("lib"),
                file_path: self.project_file_path(LIBCXX),
                target_type: TargetType::StaticLibrary,
                target_name: None,
                configurations: vec![
                    Configuration::default()
                        .matching_target_operating_systems([MacOS, IOS])
                        .include_directories([libcxx_dir.join("include")])
                        .defines(darwin_defines)
                        .cpp_flags("-nostdinc++")
                        .files(libcxx_sources),
                    Configuration::default()
                        .matching_target_operating_systems([Linux])
                        .include_directories([libcxxabi_dir.join("include"), libcxx_dir.join("include")])
                        .defines(linux_defines)
                        .cpp_flags("-nostdinc++")
                        .files(all_sources),
                    musl.clone(),
                ],
            },
            base_configurations: self.base_configurations.clone(),
            export_configurations: vec![
                Configuration::default()
                    .matching_target_operating_systems([MacOS, IOS])
                    .matching_cpp_library_forms([CppLibraryForm::Static])
                    .include_directories([libcxx_dir.join("include")])
                    .defines(export_defines.clone())
                    .cpp_flags("-nostdinc++")
                    .linker_flags("-nostdlib++ -lc++abi"),
                Configuration::default()
                    .matching_target_operating_systems([Linux])
                    .matching_cpp_libraries([CppLibraryType::Libcxx])
                    .matching_cpp_library_forms([CppLibraryForm::Static])
                    .include_directories([libcxxabi_dir.join("include"), libcxx_dir.join("include")])
                    .defines(export_defines)
                    .cpp_flags("-nostdinc++")
                    .linker_flags("-nostdlib++"),
                musl,
            ],
            physical_path: input,
            requirements: self.requirements(LIBCXX),
        })
    }
}

pub const LIBCXX: &str = "libcxx";

/// Discover every project for the environment.
pub fn discover_projects(
    environment: &Environment,
    manifest: &Manifest,
) -> Result<BTreeMap<String, ProjectDescription>> {
    Discovery::new(environment, manifest)?.discover()
}

/// `<module>_<path below the module with separators as _, no extension>`
fn test_project_name(module: &str, module_dir: &Path, test_file: &Path) -> String {
    let relative = test_file.strip_prefix(module_dir).unwrap_or(test_file);
    let joined = relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{}", module, joined)
}

fn single_source_dir(parent: &Path, prefix: &str, what: &str) -> Result<PathBuf> {
    let (dirs, _) = list_directory(parent)?;
    let mut matches: Vec<PathBuf> = dirs
        .into_iter()
        .filter(|d| {
            let name = file_name_of(d);
            name.starts_with(prefix) && name.ends_with(".src")
        })
        .collect();
    match matches.len() {
        0 => Err(Error::SourceNotFound(what.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::SourceAmbiguity(what.to_string())),
    }
}

fn check_duplicates(projects: &[ProjectDescription]) -> Result<()> {
    let mut counts: HashMap<String, (usize, &str)> = HashMap::new();
    for project in projects {
        let name = project.definition.name.as_str();
        counts.entry(name.to_lowercase()).or_insert((0, name)).0 += 1;
    }
    let mut duplicates: Vec<String> = counts
        .into_values()
        .filter(|(count, _)| *count > 1)
        .map(|(_, name)| name.to_string())
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    duplicates.sort();
    Err(Error::DuplicateProjectNames(duplicates))
}
