use crate::configuration::{Configuration, ConfigurationsExt};
use crate::depgraph::DependencyGraph;
use crate::emit::{Emitted, Emitter};
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::naming::{output_file_path, ProjectIds};
use crate::types::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// A project ready for emission.
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    /// Configurations are the full ordered list: base, imported exports,
    /// own, external.
    pub definition: Project,
    pub physical_path: PathBuf,
    pub reference: ProjectReference,
    /// Every project reachable from this one, each before the projects it
    /// depends on, so archives can be linked in this order.
    pub references: Vec<ProjectReference>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub solution: String,
    pub projects: BTreeMap<String, ResolvedProject>,
    /// All references, each after its dependencies.
    pub sorted_references: Vec<ProjectReference>,
}

impl Resolution {
    pub fn project(&self, name: &str) -> Result<&ResolvedProject> {
        self.projects
            .get(name)
            .ok_or_else(|| Error::ProjectNotFound(name.to_string()))
    }

    /// Merged settings of one project in one configuration.
    pub fn merged(
        &self,
        environment: &Environment,
        name: &str,
        configuration_type: ConfigurationType,
    ) -> Result<Configuration> {
        let project = &self.project(name)?.definition;
        let selector = environment.selector(project.target_type, configuration_type);
        Ok(project.configurations.merged(&selector))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl Summary {
    fn record(&mut self, emitted: Emitted) {
        match emitted {
            Emitted::Written => self.written += 1,
            Emitted::Unchanged => self.unchanged += 1,
            Emitted::Skipped => self.skipped += 1,
        }
    }
}

/// Requirement edges of every project.
pub fn dependency_graph(projects: &BTreeMap<String, ProjectDescription>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for (name, project) in projects {
        graph.add_project(name);
        for requirement in &project.requirements {
            graph.add_dependency(name, requirement);
        }
    }
    graph
}

/// The named projects, or all of them when `names` is empty.
pub fn select(
    projects: &BTreeMap<String, ProjectDescription>,
    names: &[String],
) -> Result<BTreeMap<String, ProjectDescription>> {
    if names.is_empty() {
        return Ok(projects.clone());
    }
    names
        .iter()
        .map(|name| {
            projects
                .get(name)
                .map(|p| (name.clone(), p.clone()))
                .ok_or_else(|| Error::ProjectNotFound(name.clone()))
        })
        .collect()
}

fn is_static(target_type: TargetType) -> bool {
    matches!(
        target_type,
        TargetType::StaticLibrary | TargetType::IntermediateStaticLibrary
    )
}

/// ! Step 1 : Validate the selection and assemble each project's configuration list
/// ! Step 2 : Compute references with output paths for every configuration type
pub fn resolve(
    environment: &Environment,
    solution: &str,
    selected: &BTreeMap<String, ProjectDescription>,
    external: &[Configuration],
) -> Result<Resolution> {
    let graph = dependency_graph(selected);
    graph.check_resolved()?;

    let ids = ProjectIds::new(environment.toolchain, selected.keys().map(String::as_str));
    let mut projects = BTreeMap::new();
    for (name, description) in selected {
        let imported = graph.transitive_dependencies(name, |dep| {
            selected
                .get(dep)
                .is_some_and(|p| is_static(p.definition.target_type))
        });
        let mut configurations = description.base_configurations.clone();
        for dep in &imported.dependencies {
            configurations.extend(selected[dep].export_configurations.iter().cloned());
        }
        configurations.extend(description.definition.configurations.iter().cloned());
        configurations.extend(external.iter().cloned());
        debug!(
            "{}: {} configurations, exports imported from {:?}",
            name,
            configurations.len(),
            imported.dependencies
        );
        let definition = Project {
            configurations,
            ..description.definition.clone()
        };
        let reference = project_reference(environment, &ids, &definition)?;
        projects.insert(
            name.clone(),
            ResolvedProject {
                definition,
                physical_path: description.physical_path.clone(),
                reference,
                references: Vec::new(),
            },
        );
    }

    let references: BTreeMap<String, ProjectReference> = projects
        .iter()
        .map(|(name, p)| (name.clone(), p.reference.clone()))
        .collect();
    for (name, project) in projects.iter_mut() {
        project.references = graph
            .link_order(name)?
            .iter()
            .map(|dep| references[dep].clone())
            .collect();
    }

    let order = graph.build_order()?;
    let sorted_references = order.iter().map(|name| references[name].clone()).collect();
    info!("Resolved {} projects", projects.len());

    Ok(Resolution {
        solution: solution.to_string(),
        projects,
        sorted_references,
    })
}

fn project_reference(environment: &Environment, ids: &ProjectIds, project: &Project) -> Result<ProjectReference> {
    let mut output_file_paths = BTreeMap::new();
    for configuration_type in environment.configuration_types() {
        let selector = environment.selector(project.target_type, configuration_type);
        let merged = project.configurations.merged(&selector);
        let path = output_file_path(
            environment,
            &project.name,
            project.artifact_name(),
            project.target_type,
            merged.output_directory.as_deref(),
            configuration_type,
        )?;
        output_file_paths.insert(configuration_type, environment.build_directory.join(path));
    }
    Ok(ProjectReference {
        id: ids.get(&project.name).unwrap_or_default().to_string(),
        name: project.name.clone(),
        virtual_dir: project.virtual_dir.clone(),
        file_path: project.file_path.clone(),
        target_type: project.target_type,
        target_name: project.artifact_name().to_string(),
        output_file_paths,
    })
}

/// ! Step 3 : Emit every project, then the solution over the C/C++ projects
pub fn generate(resolution: &Resolution, emitter: &dyn Emitter) -> Result<Summary> {
    let mut summary = Summary::default();
    for reference in &resolution.sorted_references {
        let project = resolution.project(&reference.name)?;
        summary.record(emitter.emit_project(project)?);
    }
    let native: Vec<ProjectReference> = resolution
        .sorted_references
        .iter()
        .filter(|r| r.target_type.is_native())
        .cloned()
        .collect();
    summary.record(emitter.emit_solution(&resolution.solution, &native)?);
    info!(
        "Generated {} files, {} unchanged, {} skipped",
        summary.written, summary.unchanged, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentOptions;
    use std::cell::RefCell;
    use std::path::Path;

    fn environment() -> Environment {
        Environment::resolve_for_host(
            EnvironmentOptions {
                source_directory: "/src".into(),
                ..Default::default()
            },
            OperatingSystemType::Linux,
            ArchitectureType::X64,
        )
        .unwrap()
    }

    fn description(name: &str, target_type: TargetType, requirements: &[&str]) -> ProjectDescription {
        let dir = Path::new("/src").join(name);
        ProjectDescription {
            definition: Project {
                name: name.to_string(),
                virtual_dir: PathBuf::from("modules"),
                file_path: PathBuf::from(format!("/src/build/linux/projects/{}", name)),
                target_type,
                target_name: None,
                configurations: vec![Configuration::default().include_directories([dir.join("src")])],
            },
            base_configurations: vec![Configuration::default().common_flags("-Wall")],
            export_configurations: vec![Configuration::default().include_directories([dir.join("include")])],
            physical_path: dir,
            requirements: requirements.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn projects(list: Vec<ProjectDescription>) -> BTreeMap<String, ProjectDescription> {
        list.into_iter().map(|p| (p.definition.name.clone(), p)).collect()
    }

    #[test]
    fn configuration_list_order_and_static_export_import() {
        let selected = projects(vec![
            description("core", TargetType::StaticLibrary, &[]),
            description("math", TargetType::StaticLibrary, &["core"]),
            description("app", TargetType::Executable, &["math"]),
        ]);
        let external = vec![Configuration::default().linker_flags("-fuse-ld=lld")];
        let env = environment();
        let resolution = resolve(&env, "Sample", &selected, &external).unwrap();

        let app = resolution.project("app").unwrap();
        let configurations = &app.definition.configurations;
        assert_eq!(configurations.len(), 5);
        assert_eq!(configurations[0].common_flags, vec!["-Wall"]);
        assert_eq!(configurations[1].include_directories, vec![PathBuf::from("/src/math/include")]);
        assert_eq!(configurations[2].include_directories, vec![PathBuf::from("/src/core/include")]);
        assert_eq!(configurations[3].include_directories, vec![PathBuf::from("/src/app/src")]);
        assert_eq!(configurations[4].linker_flags, vec!["-fuse-ld=lld"]);

        let names: Vec<&str> = app.references.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["math", "core"]);

        let core = &app.references[1];
        assert_eq!(
            core.output_file_paths[&ConfigurationType::Debug],
            PathBuf::from("/src/build/linux/Debug/libcore.a")
        );

        let merged = resolution.merged(&env, "app", ConfigurationType::Debug).unwrap();
        assert_eq!(merged.include_directories.len(), 3);
        assert!(matches!(
            resolution.merged(&env, "nope", ConfigurationType::Debug),
            Err(Error::ProjectNotFound(_))
        ));
    }

    #[test]
    fn dynamic_library_stops_export_import() {
        let selected = projects(vec![
            description("core", TargetType::StaticLibrary, &[]),
            description("engine", TargetType::DynamicLibrary, &["core"]),
            description("app", TargetType::Executable, &["engine"]),
        ]);
        let resolution = resolve(&environment(), "Sample", &selected, &[]).unwrap();
        let app = resolution.project("app").unwrap();
        let includes: Vec<&PathBuf> = app
            .definition
            .configurations
            .iter()
            .flat_map(|c| &c.include_directories)
            .collect();
        assert!(includes.contains(&&PathBuf::from("/src/engine/include")));
        assert!(!includes.contains(&&PathBuf::from("/src/core/include")));
        assert_eq!(app.references.len(), 2);
    }

    #[test]
    fn sorted_references_follow_dependencies() {
        let selected = projects(vec![
            description("app", TargetType::Executable, &["net", "core"]),
            description("core", TargetType::StaticLibrary, &[]),
            description("net", TargetType::StaticLibrary, &["core"]),
        ]);
        let resolution = resolve(&environment(), "Sample", &selected, &[]).unwrap();
        let order: Vec<&str> = resolution
            .sorted_references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(order, vec!["core", "net", "app"]);
    }

    #[test]
    fn references_list_dependents_before_dependencies() {
        let selected = projects(vec![
            description("core", TargetType::StaticLibrary, &[]),
            description("net", TargetType::StaticLibrary, &["core"]),
            description("app", TargetType::Executable, &["core", "net"]),
        ]);
        let resolution = resolve(&environment(), "Sample", &selected, &[]).unwrap();
        let names: Vec<&str> = resolution
            .project("app")
            .unwrap()
            .references
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["net", "core"]);
    }

    #[test]
    fn unresolved_dependencies_fail_before_resolution() {
        let selected = projects(vec![
            description("app", TargetType::Executable, &["ghost", "core"]),
            description("core", TargetType::StaticLibrary, &["phantom"]),
        ]);
        match resolve(&environment(), "Sample", &selected, &[]) {
            Err(Error::UnresolvedDependencies(missing)) => {
                assert_eq!(missing["app"], vec!["ghost", "phantom"]);
                assert_eq!(missing["core"], vec!["phantom"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn selecting_projects() {
        let all = projects(vec![
            description("core", TargetType::StaticLibrary, &[]),
            description("app", TargetType::Executable, &["core"]),
        ]);
        assert_eq!(select(&all, &[]).unwrap().len(), 2);
        assert_eq!(select(&all, &["core".to_string()]).unwrap().len(), 1);
        assert!(matches!(
            select(&all, &["nope".to_string()]),
            Err(Error::ProjectNotFound(_))
        ));

        let app_only = select(&all, &["app".to_string()]).unwrap();
        assert!(matches!(
            resolve(&environment(), "Sample", &app_only, &[]),
            Err(Error::UnresolvedDependencies(_))
        ));
    }

    #[test]
    fn requirement_cycles_fail() {
        let all = projects(vec![
            description("a", TargetType::StaticLibrary, &["b"]),
            description("b", TargetType::StaticLibrary, &["a"]),
        ]);
        assert!(matches!(
            dependency_graph(&all).build_order(),
            Err(Error::DependencyCycle(_))
        ));
        assert!(matches!(
            resolve(&environment(), "Sample", &all, &[]),
            Err(Error::DependencyCycle(_))
        ));
    }

    #[derive(Default)]
    struct Recorder {
        projects: RefCell<Vec<String>>,
        solution: RefCell<Vec<String>>,
    }

    impl Emitter for Recorder {
        fn emit_project(&self, project: &ResolvedProject) -> Result<Emitted> {
            self.projects.borrow_mut().push(project.definition.name.clone());
            if project.definition.target_type.is_gradle() {
                Ok(Emitted::Skipped)
            } else {
                Ok(Emitted::Written)
            }
        }

        fn emit_solution(&self, _solution: &str, projects: &[ProjectReference]) -> Result<Emitted> {
            *self.solution.borrow_mut() = projects.iter().map(|p| p.name.clone()).collect();
            Ok(Emitted::Unchanged)
        }
    }

    #[test]
    fn solution_lists_native_projects_only() {
        let mut env = environment();
        env.target_operating_system = OperatingSystemType::Android;
        let selected = projects(vec![
            description("hello", TargetType::DynamicLibrary, &[]),
            description("hello:GradleApplication", TargetType::GradleApplication, &["hello"]),
        ]);
        let resolution = resolve(&env, "Sample", &selected, &[]).unwrap();
        let recorder = Recorder::default();
        let summary = generate(&resolution, &recorder).unwrap();
        assert_eq!(
            summary,
            Summary {
                written: 1,
                unchanged: 1,
                skipped: 1
            }
        );
        assert_eq!(
            *recorder.projects.borrow(),
            vec!["hello", "hello:GradleApplication"]
        );
        assert_eq!(*recorder.solution.borrow(), vec!["hello"]);
    }
}
