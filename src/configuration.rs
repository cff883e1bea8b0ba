//! Conditional build settings and the rules for combining them.
//!
//! A [`Configuration`] is a rule: a set of [`Conditions`] saying which build
//! variants it applies to, plus a payload of include paths, defines, flags,
//! options and files. Rules are selected against a [`Selector`] and merged
//! in list order; the list order encodes override priority (base rules,
//! then imported export rules, then the project's own rules, then external
//! flags).

use crate::error::{Error, Result};
use crate::types::*;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;

/// The acceptable values of one selector dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchSet<T> {
    /// Any value, including an unspecified one.
    Unrestricted,
    OneOf(Vec<T>),
}

impl<T> Default for MatchSet<T> {
    fn default() -> Self {
        MatchSet::Unrestricted
    }
}

impl<T: PartialEq> MatchSet<T> {
    pub fn one_of(values: impl IntoIterator<Item = T>) -> Self {
        MatchSet::OneOf(values.into_iter().collect())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, MatchSet::Unrestricted)
    }

    /// An unspecified selector value is accepted.
    pub fn matches(&self, value: Option<&T>) -> bool {
        match (self, value) {
            (MatchSet::Unrestricted, _) | (_, None) => true,
            (MatchSet::OneOf(values), Some(v)) => values.contains(v),
        }
    }

    /// An unspecified selector value is rejected unless unrestricted.
    pub fn strictly_matches(&self, value: Option<&T>) -> bool {
        match (self, value) {
            (MatchSet::Unrestricted, _) => true,
            (MatchSet::OneOf(values), Some(v)) => values.contains(v),
            (MatchSet::OneOf(_), None) => false,
        }
    }

    fn pinned(value: Option<T>) -> Self {
        match value {
            Some(v) => MatchSet::OneOf(vec![v]),
            None => MatchSet::Unrestricted,
        }
    }
}

impl<T: Serialize> Serialize for MatchSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MatchSet::Unrestricted => serializer.serialize_none(),
            MatchSet::OneOf(values) => serializer.serialize_some(values),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for MatchSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let values = Option::<Vec<T>>::deserialize(deserializer)?;
        Ok(values.map_or(MatchSet::Unrestricted, MatchSet::OneOf))
    }
}

/// Per-dimension predicates of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conditions {
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub target_types: MatchSet<TargetType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub host_operating_systems: MatchSet<OperatingSystemType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub host_architectures: MatchSet<ArchitectureType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub target_operating_systems: MatchSet<OperatingSystemType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub target_architectures: MatchSet<ArchitectureType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub windows_runtimes: MatchSet<WindowsRuntimeType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub toolchains: MatchSet<ToolchainType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub compilers: MatchSet<CompilerType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub c_libraries: MatchSet<CLibraryType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub c_library_forms: MatchSet<CLibraryForm>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub cpp_libraries: MatchSet<CppLibraryType>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub cpp_library_forms: MatchSet<CppLibraryForm>,
    #[serde(skip_serializing_if = "MatchSet::is_unrestricted")]
    pub configuration_types: MatchSet<ConfigurationType>,
}

impl Conditions {
    pub fn matches(&self, s: &Selector) -> bool {
        self.target_types.matches(s.target_type.as_ref())
            && self
                .host_operating_systems
                .matches(s.host_operating_system.as_ref())
            && self.host_architectures.matches(s.host_architecture.as_ref())
            && self
                .target_operating_systems
                .matches(s.target_operating_system.as_ref())
            && self
                .target_architectures
                .matches(s.target_architecture.as_ref())
            && self.windows_runtimes.matches(s.windows_runtime.as_ref())
            && self.toolchains.matches(s.toolchain.as_ref())
            && self.compilers.matches(s.compiler.as_ref())
            && self.c_libraries.matches(s.c_library.as_ref())
            && self.c_library_forms.matches(s.c_library_form.as_ref())
            && self.cpp_libraries.matches(s.cpp_library.as_ref())
            && self.cpp_library_forms.matches(s.cpp_library_form.as_ref())
            && self
                .configuration_types
                .matches(s.configuration_type.as_ref())
    }

    pub fn strictly_matches(&self, s: &Selector) -> bool {
        self.target_types.strictly_matches(s.target_type.as_ref())
            && self
                .host_operating_systems
                .strictly_matches(s.host_operating_system.as_ref())
            && self
                .host_architectures
                .strictly_matches(s.host_architecture.as_ref())
            && self
                .target_operating_systems
                .strictly_matches(s.target_operating_system.as_ref())
            && self
                .target_architectures
                .strictly_matches(s.target_architecture.as_ref())
            && self
                .windows_runtimes
                .strictly_matches(s.windows_runtime.as_ref())
            && self.toolchains.strictly_matches(s.toolchain.as_ref())
            && self.compilers.strictly_matches(s.compiler.as_ref())
            && self.c_libraries.strictly_matches(s.c_library.as_ref())
            && self
                .c_library_forms
                .strictly_matches(s.c_library_form.as_ref())
            && self.cpp_libraries.strictly_matches(s.cpp_library.as_ref())
            && self
                .cpp_library_forms
                .strictly_matches(s.cpp_library_form.as_ref())
            && self
                .configuration_types
                .strictly_matches(s.configuration_type.as_ref())
    }

    /// Conditions pinning exactly the dimensions the selector supplies.
    /// Each dimension is gated on its own presence.
    pub fn pinned(s: &Selector) -> Self {
        Conditions {
            target_types: MatchSet::pinned(s.target_type),
            host_operating_systems: MatchSet::pinned(s.host_operating_system),
            host_architectures: MatchSet::pinned(s.host_architecture),
            target_operating_systems: MatchSet::pinned(s.target_operating_system),
            target_architectures: MatchSet::pinned(s.target_architecture),
            windows_runtimes: MatchSet::pinned(s.windows_runtime),
            toolchains: MatchSet::pinned(s.toolchain),
            compilers: MatchSet::pinned(s.compiler),
            c_libraries: MatchSet::pinned(s.c_library),
            c_library_forms: MatchSet::pinned(s.c_library_form),
            cpp_libraries: MatchSet::pinned(s.cpp_library),
            cpp_library_forms: MatchSet::pinned(s.cpp_library_form),
            configuration_types: MatchSet::pinned(s.configuration_type),
        }
    }
}

/// Toolchain family an option is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionScope {
    Vc,
    Xcode,
    Gradle,
}

impl OptionScope {
    pub const ALL: &'static [OptionScope] = &[OptionScope::Vc, OptionScope::Xcode, OptionScope::Gradle];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionScope::Vc => "vc",
            OptionScope::Xcode => "xcode",
            OptionScope::Gradle => "gradle",
        }
    }

    /// Emission stages accepted for this scope; `None` means the scope has
    /// no stage segment.
    pub fn stages(&self) -> Option<&'static [&'static str]> {
        match self {
            OptionScope::Vc => Some(&[
                "Globals",
                "Configuration",
                "PropertyGroup",
                "ClCompile",
                "Link",
                "Lib",
            ]),
            OptionScope::Xcode => Some(&["project", "target", "buildFile"]),
            OptionScope::Gradle => None,
        }
    }

    /// Toolchains that read options of this scope.
    pub fn toolchains(&self) -> &'static [ToolchainType] {
        match self {
            OptionScope::Vc => &[ToolchainType::VisualStudio],
            OptionScope::Xcode => &[ToolchainType::XCode],
            OptionScope::Gradle => &[ToolchainType::GradleNinja, ToolchainType::Ninja],
        }
    }
}

/// Key of a toolchain passthrough setting, e.g. `vc.ClCompile.LanguageStandard`
/// or `gradle.applicationId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionKey {
    pub scope: OptionScope,
    pub stage: Option<String>,
    pub name: String,
}

impl OptionKey {
    pub fn new(scope: OptionScope, stage: Option<&str>, name: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidOptionKey {
            key: match stage {
                Some(stage) => format!("{}.{}.{}", scope.as_str(), stage, name),
                None => format!("{}.{}", scope.as_str(), name),
            },
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("empty option name"));
        }
        let stage = match (scope.stages(), stage) {
            (Some(stages), Some(stage)) => match stages.iter().find(|s| s.eq_ignore_ascii_case(stage)) {
                Some(canonical) => Some(canonical.to_string()),
                None => return Err(invalid("unknown stage")),
            },
            (Some(_), None) => return Err(invalid("missing stage")),
            (None, Some(_)) => return Err(invalid("scope takes no stage")),
            (None, None) => None,
        };
        Ok(OptionKey {
            scope,
            stage,
            name: name.to_string(),
        })
    }
}

impl FromStr for OptionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidOptionKey {
            key: s.to_string(),
            reason: reason.to_string(),
        };
        let (scope, rest) = s.split_once('.').ok_or_else(|| invalid("missing scope"))?;
        let scope = OptionScope::ALL
            .iter()
            .copied()
            .find(|v| v.as_str().eq_ignore_ascii_case(scope))
            .ok_or_else(|| invalid("unknown scope"))?;
        if scope.stages().is_some() {
            let (stage, name) = rest.split_once('.').ok_or_else(|| invalid("missing stage"))?;
            OptionKey::new(scope, Some(stage), name)
        } else {
            OptionKey::new(scope, None, rest)
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stage {
            Some(stage) => write!(f, "{}.{}.{}", self.scope.as_str(), stage, self.name),
            None => write!(f, "{}.{}", self.scope.as_str(), self.name),
        }
    }
}

impl Serialize for OptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OptionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A conditional bundle of build settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    #[serde(flatten)]
    pub conditions: Conditions,

    pub include_directories: Vec<PathBuf>,
    pub system_include_directories: Vec<PathBuf>,
    pub defines: Vec<Define>,
    pub common_flags: Vec<String>,
    pub c_flags: Vec<String>,
    pub cpp_flags: Vec<String>,
    pub options: BTreeMap<OptionKey, String>,

    pub lib_directories: Vec<PathBuf>,
    pub libs: Vec<PathBuf>,
    pub linker_flags: Vec<String>,
    pub post_linker_flags: Vec<String>,

    pub files: Vec<SourceFile>,

    pub output_directory: Option<PathBuf>,
}

impl Configuration {
    pub fn matches(&self, selector: &Selector) -> bool {
        self.conditions.matches(selector)
    }

    pub fn strictly_matches(&self, selector: &Selector) -> bool {
        self.conditions.strictly_matches(selector)
    }

    pub fn matching_target_types(mut self, values: impl IntoIterator<Item = TargetType>) -> Self {
        self.conditions.target_types = MatchSet::one_of(values);
        self
    }

    pub fn matching_host_architectures(
        mut self,
        values: impl IntoIterator<Item = ArchitectureType>,
    ) -> Self {
        self.conditions.host_architectures = MatchSet::one_of(values);
        self
    }

    pub fn matching_target_operating_systems(
        mut self,
        values: impl IntoIterator<Item = OperatingSystemType>,
    ) -> Self {
        self.conditions.target_operating_systems = MatchSet::one_of(values);
        self
    }

    pub fn matching_target_architectures(
        mut self,
        values: impl IntoIterator<Item = ArchitectureType>,
    ) -> Self {
        self.conditions.target_architectures = MatchSet::one_of(values);
        self
    }

    pub fn matching_windows_runtimes(
        mut self,
        values: impl IntoIterator<Item = WindowsRuntimeType>,
    ) -> Self {
        self.conditions.windows_runtimes = MatchSet::one_of(values);
        self
    }

    pub fn matching_toolchains(mut self, values: impl IntoIterator<Item = ToolchainType>) -> Self {
        self.conditions.toolchains = MatchSet::one_of(values);
        self
    }

    pub fn matching_compilers(mut self, values: impl IntoIterator<Item = CompilerType>) -> Self {
        self.conditions.compilers = MatchSet::one_of(values);
        self
    }

    pub fn matching_c_libraries(mut self, values: impl IntoIterator<Item = CLibraryType>) -> Self {
        self.conditions.c_libraries = MatchSet::one_of(values);
        self
    }

    pub fn matching_c_library_forms(mut self, values: impl IntoIterator<Item = CLibraryForm>) -> Self {
        self.conditions.c_library_forms = MatchSet::one_of(values);
        self
    }

    pub fn matching_cpp_libraries(
        mut self,
        values: impl IntoIterator<Item = CppLibraryType>,
    ) -> Self {
        self.conditions.cpp_libraries = MatchSet::one_of(values);
        self
    }

    pub fn matching_cpp_library_forms(
        mut self,
        values: impl IntoIterator<Item = CppLibraryForm>,
    ) -> Self {
        self.conditions.cpp_library_forms = MatchSet::one_of(values);
        self
    }

    pub fn matching_configuration_types(
        mut self,
        values: impl IntoIterator<Item = ConfigurationType>,
    ) -> Self {
        self.conditions.configuration_types = MatchSet::one_of(values);
        self
    }

    pub fn include_directories(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.include_directories.extend(dirs);
        self
    }

    pub fn defines(mut self, defines: impl IntoIterator<Item = Define>) -> Self {
        self.defines.extend(defines);
        self
    }

    pub fn common_flags(mut self, flags: &str) -> Self {
        self.common_flags.extend(parse_flags(flags));
        self
    }

    pub fn c_flags(mut self, flags: &str) -> Self {
        self.c_flags.extend(parse_flags(flags));
        self
    }

    pub fn cpp_flags(mut self, flags: &str) -> Self {
        self.cpp_flags.extend(parse_flags(flags));
        self
    }

    pub fn linker_flags(mut self, flags: &str) -> Self {
        self.linker_flags.extend(parse_flags(flags));
        self
    }

    pub fn libs<S: Into<PathBuf>>(mut self, libs: impl IntoIterator<Item = S>) -> Self {
        self.libs.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn files(mut self, files: impl IntoIterator<Item = SourceFile>) -> Self {
        self.files.extend(files);
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<String>) -> Result<Self> {
        self.options.insert(key.parse()?, value.into());
        Ok(self)
    }

    /// A rule restricted to some toolchains may only carry options one of
    /// them reads.
    pub fn check_option_scopes(&self) -> Result<()> {
        let MatchSet::OneOf(toolchains) = &self.conditions.toolchains else {
            return Ok(());
        };
        for key in self.options.keys() {
            if !key.scope.toolchains().iter().any(|t| toolchains.contains(t)) {
                return Err(Error::InvalidOptionKey {
                    key: key.to_string(),
                    reason: format!(
                        "not read by {}",
                        toolchains.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Merging over an ordered list of rules.
pub trait ConfigurationsExt {
    fn merged(&self, selector: &Selector) -> Configuration;
}

impl ConfigurationsExt for [Configuration] {
    fn merged(&self, selector: &Selector) -> Configuration {
        merge(self.iter(), selector)
    }
}

/// Merge the rules that strictly match `selector`, in order.
pub fn merge<'a>(rules: impl IntoIterator<Item = &'a Configuration>, selector: &Selector) -> Configuration {
    let mut merged = Configuration {
        conditions: Conditions::pinned(selector),
        ..Configuration::default()
    };
    for rule in rules.into_iter().filter(|c| c.strictly_matches(selector)) {
        merged
            .include_directories
            .extend(rule.include_directories.iter().cloned());
        merged
            .system_include_directories
            .extend(rule.system_include_directories.iter().cloned());
        merged.defines.extend(rule.defines.iter().cloned());
        merged.common_flags.extend(rule.common_flags.iter().cloned());
        merged.c_flags.extend(rule.c_flags.iter().cloned());
        merged.cpp_flags.extend(rule.cpp_flags.iter().cloned());
        for (key, value) in &rule.options {
            merged.options.insert(key.clone(), value.clone());
        }
        merged
            .lib_directories
            .extend(rule.lib_directories.iter().cloned());
        merged.libs.extend(rule.libs.iter().cloned());
        merged.linker_flags.extend(rule.linker_flags.iter().cloned());
        merged
            .post_linker_flags
            .extend(rule.post_linker_flags.iter().cloned());
        merged.files.extend(rule.files.iter().cloned());
        if rule.output_directory.is_some() {
            merged.output_directory = rule.output_directory.clone();
        }
    }
    dedup_in_order(&mut merged.include_directories);
    dedup_in_order(&mut merged.system_include_directories);
    dedup_in_order(&mut merged.lib_directories);
    dedup_in_order(&mut merged.libs);
    merged
}

/// Remove later duplicates, keeping the first occurrence of each item.
fn dedup_in_order<T: Clone + Eq + Hash>(items: &mut Vec<T>) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Parse `"A;B=1"` into defines. A blank string yields no defines.
pub fn parse_defines(defines: &str) -> Result<Vec<Define>> {
    if defines.trim().is_empty() {
        return Ok(Vec::new());
    }
    defines.split(';').map(str::parse).collect()
}

/// Split a flag string on spaces, keeping double-quoted spans intact.
pub fn parse_flags(flags: &str) -> Vec<String> {
    static FLAG: OnceLock<Regex> = OnceLock::new();
    let re = FLAG.get_or_init(|| Regex::new(r#"([^ "]|"[^"]*")+"#).expect("valid flag regex"));
    re.find_iter(flags).map(|m| m.as_str().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_linux_clang() -> Selector {
        Selector {
            target_type: Some(TargetType::StaticLibrary),
            host_operating_system: Some(OperatingSystemType::Linux),
            host_architecture: Some(ArchitectureType::X64),
            target_operating_system: Some(OperatingSystemType::Linux),
            target_architecture: Some(ArchitectureType::X64),
            windows_runtime: None,
            toolchain: Some(ToolchainType::Ninja),
            compiler: Some(CompilerType::Clang),
            c_library: Some(CLibraryType::Glibc),
            c_library_form: Some(CLibraryForm::Dynamic),
            cpp_library: Some(CppLibraryType::Libstdcxx),
            cpp_library_form: Some(CppLibraryForm::Dynamic),
            configuration_type: Some(ConfigurationType::Release),
        }
    }

    #[test]
    fn unrestricted_rule_strictly_matches_any_selector() {
        let rule = Configuration::default();
        assert!(rule.strictly_matches(&Selector::default()));
        assert!(rule.strictly_matches(&release_linux_clang()));
    }

    #[test]
    fn strict_and_loose_diverge_on_unspecified_dimension() {
        let rule = Configuration::default().matching_compilers([CompilerType::Gcc]);
        let selector = Selector {
            compiler: None,
            ..release_linux_clang()
        };
        assert!(rule.matches(&selector));
        assert!(!rule.strictly_matches(&selector));
    }

    #[test]
    fn restricted_dimension_requires_membership() {
        let rule = Configuration::default()
            .matching_compilers([CompilerType::Gcc, CompilerType::Clang])
            .matching_configuration_types([ConfigurationType::Debug]);
        assert!(!rule.matches(&release_linux_clang()));
        assert!(!rule.strictly_matches(&release_linux_clang()));
        let debug = Selector {
            configuration_type: Some(ConfigurationType::Debug),
            ..release_linux_clang()
        };
        assert!(rule.strictly_matches(&debug));
    }

    #[test]
    fn union_fields_keep_first_occurrence() {
        let rules = vec![
            Configuration::default().include_directories(["a".into(), "b".into()]),
            Configuration::default().include_directories(["b".into(), "c".into()]),
        ];
        let merged = rules.merged(&release_linux_clang());
        assert_eq!(
            merged.include_directories,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
    }

    #[test]
    fn libs_are_deduplicated_but_flags_are_not() {
        let rules = vec![
            Configuration::default().libs(["dl", "rt"]).common_flags("-g"),
            Configuration::default().libs(["rt", "m"]).common_flags("-g"),
        ];
        let merged = rules.merged(&release_linux_clang());
        assert_eq!(
            merged.libs,
            vec![PathBuf::from("dl"), PathBuf::from("rt"), PathBuf::from("m")]
        );
        assert_eq!(merged.common_flags, vec!["-g", "-g"]);
    }

    #[test]
    fn options_last_write_wins() {
        let rules = vec![
            Configuration::default().option("gradle.k", "1").unwrap(),
            Configuration::default().option("gradle.k", "2").unwrap(),
        ];
        let merged = rules.merged(&release_linux_clang());
        let key: OptionKey = "gradle.k".parse().unwrap();
        assert_eq!(merged.options[&key], "2");
    }

    #[test]
    fn output_directory_last_non_null_wins() {
        let mut first = Configuration::default();
        first.output_directory = Some("out/a".into());
        let mut second = Configuration::default();
        second.output_directory = Some("out/b".into());
        let rules = vec![first, second, Configuration::default()];
        let merged = rules.merged(&release_linux_clang());
        assert_eq!(merged.output_directory, Some(PathBuf::from("out/b")));
    }

    #[test]
    fn defines_concatenate_in_order() {
        let rules = vec![
            Configuration::default().defines([Define::with_value("LEVEL", "1")]),
            Configuration::default().defines([Define::with_value("LEVEL", "2")]),
        ];
        let merged = rules.merged(&release_linux_clang());
        assert_eq!(
            merged.defines,
            vec![Define::with_value("LEVEL", "1"), Define::with_value("LEVEL", "2")]
        );
    }

    #[test]
    fn empty_filter_yields_empty_configuration() {
        let rules = vec![Configuration::default()
            .matching_compilers([CompilerType::VisualCpp])
            .common_flags("/bigobj")];
        let merged = rules.merged(&release_linux_clang());
        assert!(merged.common_flags.is_empty());
        assert!(merged.files.is_empty());
        assert_eq!(merged.output_directory, None);
    }

    #[test]
    fn merge_is_idempotent_on_its_result() {
        let rules = vec![
            Configuration::default()
                .include_directories(["a".into(), "b".into()])
                .libs(["z"])
                .option("vc.ClCompile.LanguageStandard", "stdcpp20")
                .unwrap(),
            Configuration::default()
                .include_directories(["b".into()])
                .option("vc.ClCompile.LanguageStandard", "stdcpp17")
                .unwrap(),
        ];
        let selector = release_linux_clang();
        let once = rules.merged(&selector);
        let twice = std::slice::from_ref(&once).merged(&selector);
        assert_eq!(once.include_directories, twice.include_directories);
        assert_eq!(once.libs, twice.libs);
        assert_eq!(once.options, twice.options);
        assert_eq!(once, rules.merged(&selector));
    }

    #[test]
    fn merged_conditions_pin_selector_dimensions() {
        let selector = Selector {
            toolchain: None,
            ..release_linux_clang()
        };
        let merged = Vec::<Configuration>::new().merged(&selector);
        assert_eq!(
            merged.conditions.target_types,
            MatchSet::OneOf(vec![TargetType::StaticLibrary])
        );
        assert!(merged.conditions.toolchains.is_unrestricted());
        assert!(merged.conditions.windows_runtimes.is_unrestricted());
    }

    #[test]
    fn release_static_library_scenario() {
        let rules = vec![
            Configuration::default()
                .matching_configuration_types([ConfigurationType::Release])
                .defines([Define::new("NDEBUG")]),
            Configuration::default()
                .matching_configuration_types([ConfigurationType::Release])
                .matching_compilers([CompilerType::Gcc, CompilerType::Clang])
                .common_flags("-O3"),
            Configuration::default().include_directories(["./include".into()]),
        ];
        let merged = rules.merged(&release_linux_clang());
        assert_eq!(merged.defines, vec![Define::new("NDEBUG")]);
        assert!(merged.common_flags.contains(&"-O3".to_string()));
        assert_eq!(merged.include_directories, vec![PathBuf::from("./include")]);
    }

    #[test]
    fn option_keys_follow_scope_schema() {
        let key: OptionKey = "vc.clcompile.RuntimeLibrary".parse().unwrap();
        assert_eq!(key.stage.as_deref(), Some("ClCompile"));
        assert_eq!(key.to_string(), "vc.ClCompile.RuntimeLibrary");

        let key: OptionKey = "gradle.applicationId".parse().unwrap();
        assert_eq!(key.stage, None);
        assert_eq!(key.name, "applicationId");

        let key: OptionKey = "xcode.target.PRODUCT_BUNDLE_IDENTIFIER".parse().unwrap();
        assert_eq!(key.scope, OptionScope::Xcode);

        assert!("vc.Nowhere.X".parse::<OptionKey>().is_err());
        assert!("vc.Link".parse::<OptionKey>().is_err());
        assert!("cmake.x".parse::<OptionKey>().is_err());
        assert!("plain".parse::<OptionKey>().is_err());
    }

    #[test]
    fn option_scopes_must_fit_restricted_toolchains() {
        let rule = Configuration::default()
            .option("vc.Link.GenerateWindowsMetadata", "false")
            .unwrap()
            .option("gradle.applicationId", "sample.hello")
            .unwrap();
        assert!(rule.check_option_scopes().is_ok());

        let vc_only = rule.clone().matching_toolchains([ToolchainType::VisualStudio]);
        match vc_only.check_option_scopes() {
            Err(Error::InvalidOptionKey { key, .. }) => assert_eq!(key, "gradle.applicationId"),
            other => panic!("unexpected result: {other:?}"),
        }

        let both = rule.matching_toolchains([ToolchainType::VisualStudio, ToolchainType::Ninja]);
        assert!(both.check_option_scopes().is_ok());
    }

    #[test]
    fn flags_keep_quoted_spans() {
        assert_eq!(
            parse_flags(r#"-DNAME="a b" -O2  -g"#),
            vec![r#"-DNAME="a b""#, "-O2", "-g"]
        );
        assert!(parse_flags("   ").is_empty());
    }

    #[test]
    fn defines_split_on_semicolons() {
        let defines = parse_defines("_CRT_SECURE_NO_WARNINGS;DEBUG=1").unwrap();
        assert_eq!(
            defines,
            vec![
                Define::new("_CRT_SECURE_NO_WARNINGS"),
                Define::with_value("DEBUG", "1")
            ]
        );
        assert!(parse_defines("  ").unwrap().is_empty());
    }

    #[test]
    fn rules_deserialize_from_toml() {
        let rule: Configuration = toml::from_str(
            r#"
            compilers = ["gcc", "Clang"]
            configuration_types = ["Release"]
            defines = ["NDEBUG", "LEVEL=3"]
            common_flags = ["-O3"]
            options = { "vc.ClCompile.LanguageStandard" = "stdcpp20" }
            "#,
        )
        .unwrap();
        assert_eq!(
            rule.conditions.compilers,
            MatchSet::OneOf(vec![CompilerType::Gcc, CompilerType::Clang])
        );
        assert!(rule.conditions.target_types.is_unrestricted());
        assert_eq!(rule.defines[1], Define::with_value("LEVEL", "3"));
        assert_eq!(rule.options.len(), 1);
    }

    #[test]
    fn invalid_option_key_fails_deserialization() {
        let result: std::result::Result<Configuration, _> =
            toml::from_str(r#"options = { "vc.Bogus.X" = "1" }"#);
        assert!(result.is_err());
    }
}
