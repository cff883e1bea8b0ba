use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use projmake::configuration::{parse_flags, Configuration};
use projmake::discovery::discover_projects;
use projmake::emit::emitter_for;
use projmake::environment::{Environment, EnvironmentOptions};
use projmake::fileutils::canonicalize;
use projmake::generation::{dependency_graph, generate, resolve, select};
use projmake::manifest::Manifest;
use projmake::types::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// ! projmake check -> projmake generate
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    #[arg(long, default_value = ".", global = true)]
    source: PathBuf,

    /// Defaults to `<source>/build/<target-os>`
    #[arg(long, global = true)]
    build: Option<PathBuf>,

    #[arg(long, global = true)]
    target_os: Option<OperatingSystemType>,

    #[arg(long, global = true)]
    target_arch: Option<ArchitectureType>,

    #[arg(long, global = true)]
    toolchain: Option<ToolchainType>,

    #[arg(long, global = true)]
    compiler: Option<CompilerType>,

    #[arg(long, global = true)]
    configuration: Option<ConfigurationType>,

    #[arg(long, global = true)]
    windows_runtime: Option<WindowsRuntimeType>,

    #[arg(long, global = true)]
    c_library: Option<CLibraryType>,

    #[arg(long, global = true)]
    c_library_form: Option<CLibraryForm>,

    #[arg(long, global = true)]
    cpp_library: Option<CppLibraryType>,

    #[arg(long, global = true)]
    cpp_library_form: Option<CppLibraryForm>,

    /// Extra flags for every compile, applied after project settings
    #[arg(long, global = true, allow_hyphen_values = true)]
    common_flags: Option<String>,

    /// Extra flags for C sources only
    #[arg(long, global = true, allow_hyphen_values = true)]
    c_flags: Option<String>,

    /// Extra flags for C++ sources only
    #[arg(long, global = true, allow_hyphen_values = true)]
    cpp_flags: Option<String>,

    /// Extra flags for every link, applied after project settings
    #[arg(long, global = true, allow_hyphen_values = true)]
    linker_flags: Option<String>,

    /// Flags placed after the libraries on every link line
    #[arg(long, global = true, allow_hyphen_values = true)]
    post_linker_flags: Option<String>,

    /// Keep projects for other operating systems as stubs
    #[arg(long, global = true)]
    dummy: bool,

    /// Build libc++ from source
    #[arg(long, global = true)]
    libcxx: bool,

    #[arg(long, global = true)]
    mac_catalyst: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and validate projects, then print the build order
    Check,
    /// Print the merged configuration of one project
    Dump {
        project: String,
        #[arg(long)]
        json: bool,
    },
    /// Write project files
    Generate {
        /// Rewrite files even when unchanged
        #[arg(long)]
        force: bool,
        /// Only these projects; they must include their dependencies
        projects: Vec<String>,
    },
}

impl TargetArgs {
    fn environment(&self) -> Result<Environment> {
        let source_directory = canonicalize(&self.source).context("Source directory not found")?;
        let options = EnvironmentOptions {
            source_directory,
            build_directory: self.build.clone(),
            target_operating_system: self.target_os,
            target_architecture: self.target_arch,
            windows_runtime: self.windows_runtime,
            toolchain: self.toolchain,
            compiler: self.compiler,
            c_library: self.c_library,
            c_library_form: self.c_library_form,
            cpp_library: self.cpp_library,
            cpp_library_form: self.cpp_library_form,
            configuration_type: self.configuration,
            enable_dummy: self.dummy,
            enable_libcxx_build: self.libcxx,
            enable_mac_catalyst: self.mac_catalyst,
        };
        Ok(Environment::resolve(options)?)
    }

    /// Command-line flags as a trailing rule.
    fn external_configuration(&self) -> Configuration {
        let flags = |value: &Option<String>| value.as_deref().map(parse_flags).unwrap_or_default();
        Configuration {
            common_flags: flags(&self.common_flags),
            c_flags: flags(&self.c_flags),
            cpp_flags: flags(&self.cpp_flags),
            linker_flags: flags(&self.linker_flags),
            post_linker_flags: flags(&self.post_linker_flags),
            ..Configuration::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "warn",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut environment = cli.target.environment()?;
    let manifest = Manifest::load(&environment.source_directory).context("Failed to load manifest")?;
    manifest.apply_tools(&mut environment);
    let solution = manifest.solution_name(&environment);
    info!(
        "{} for {} {} with {}",
        solution, environment.target_operating_system, environment.target_architecture, environment.toolchain
    );

    let projects = discover_projects(&environment, &manifest).context("Project discovery failed")?;
    let mut external = Vec::new();
    if let Some(platform) = manifest.platform(environment.target_operating_system) {
        external.push(platform.external_configuration());
    }
    external.push(cli.target.external_configuration());

    match cli.command {
        Commands::Check => {
            let graph = dependency_graph(&projects);
            graph.check_resolved()?;
            for name in graph.build_order()? {
                let project = &projects[&name];
                println!(
                    "{:<40} {:<24} {}",
                    name,
                    project.definition.target_type.to_string(),
                    project.requirements.join(" ")
                );
            }
        }
        Commands::Dump { project, json } => {
            let resolution = resolve(&environment, &solution, &projects, &external)?;
            let merged = resolution.merged(&environment, &project, environment.configuration_type)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&merged)?);
            } else {
                println!("{:#?}", merged);
            }
        }
        Commands::Generate { force, projects: names } => {
            let selected = select(&projects, &names)?;
            let resolution = resolve(&environment, &solution, &selected, &external)?;
            let emitter = emitter_for(&environment, force)?;
            let summary = generate(&resolution, emitter.as_ref())?;
            println!(
                "Generated {} files ({} unchanged, {} skipped) in {}",
                summary.written,
                summary.unchanged,
                summary.skipped,
                environment.projects_directory().display()
            );
        }
    }
    Ok(())
}
