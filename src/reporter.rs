//! Turns parser output, an optional reference tree and the SCM changes of a
//! build into the statistics consumed by the quality gates.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info_span};

use crate::changes::{
    attach_changed_code_lines, attach_file_coverage_deltas, attach_indirect_coverage_changes,
    create_old_path_mapping, map_changes_to_report_paths, CodeDelta,
};
use crate::error::{CovmetricsError, Result};
use crate::log::FilteredLog;
use crate::merge::ProcessingMode;
use crate::metric::{Metric, NodeKind};
use crate::node::Node;
use crate::statistics::CoverageStatistics;
use crate::value::Value;

/// Name of the root holding test results when no coverage was reported.
pub const TESTS_NAME: &str = "Tests";

/// Name of the package for test classes without a package.
const DEFAULT_PACKAGE: &str = "-";

/// What a parsed tree contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserType {
    Coverage,
    Test,
}

/// The tree produced by one parser run.
#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub parser_type: ParserType,
    pub tree: Node,
}

impl ParsedReport {
    pub fn coverage(tree: Node) -> Self {
        Self {
            parser_type: ParserType::Coverage,
            tree,
        }
    }

    pub fn tests(tree: Node) -> Self {
        Self {
            parser_type: ParserType::Test,
            tree,
        }
    }
}

/// Combines all parser results into one tree: coverage trees are merged and
/// test classes are attached to the classes they test.
pub fn aggregate_results(reports: Vec<ParsedReport>, mode: ProcessingMode, log: &mut FilteredLog) -> Result<Node> {
    if reports.is_empty() {
        log.log_error("No coverage results were found! Configuration error?");
        return Ok(Node::empty());
    }
    let (coverage, tests): (Vec<ParsedReport>, Vec<ParsedReport>) = reports
        .into_iter()
        .partition(|report| report.parser_type == ParserType::Coverage);

    let mut test_classes = Vec::new();
    for report in &tests {
        collect_test_classes(&report.tree, None, &mut test_classes);
    }

    if coverage.is_empty() {
        log.log_error("No coverage results were found, just tests! Configuration error?");
        let mut root = Node::module(TESTS_NAME);
        root.add_children(test_classes.into_iter().map(|(_, class)| class))?;
        return Ok(root);
    }

    let trees: Vec<Node> = coverage.into_iter().map(|report| report.tree).collect();
    log.log_info(format!("Merging {} coverage trees", trees.len()));
    let mut root = Node::merge(trees, mode, log)?;
    if !test_classes.is_empty() {
        let count = test_classes.len();
        let unmapped = map_tests(&mut root, test_classes)?;
        log.log_info(format!(
            "Mapped {} of {count} test classes to the tested classes",
            count - unmapped
        ));
    }
    Ok(root)
}

/// Collects classes that are not nested in another class, together with
/// the name of their enclosing package.
fn collect_test_classes(node: &Node, package: Option<&str>, found: &mut Vec<(Option<String>, Node)>) {
    match node.kind() {
        NodeKind::Class => found.push((package.map(str::to_string), node.clone())),
        NodeKind::Package => {
            for child in node.children() {
                collect_test_classes(child, Some(node.name()), found);
            }
        }
        _ => {
            for child in node.children() {
                collect_test_classes(child, package, found);
            }
        }
    }
}

/// Adds the test count of each test class to the class it tests. Test
/// classes without such a class are added to their package, which is
/// created when missing. Returns the number of unmapped test classes.
fn map_tests(root: &mut Node, test_classes: Vec<(Option<String>, Node)>) -> Result<usize> {
    let mut unmapped = 0;
    for (package, test_class) in test_classes {
        let tested = tested_class_name(test_class.name());
        let tests = test_class.own_value(Metric::Tests);
        if let (Some(target), Some(tests)) = (root.find_mut(NodeKind::Class, tested), tests) {
            let combined = match target.own_value(Metric::Tests) {
                Some(existing) => existing.add(&tests)?,
                None => tests,
            };
            target.add_value(combined);
            continue;
        }

        unmapped += 1;
        let package_name = package.unwrap_or_else(|| package_of(test_class.name()));
        debug!(class = test_class.name(), package = %package_name, "adding unmapped test class");
        match root.find_package_mut(&package_name) {
            Some(target) => target.add_child(test_class)?,
            None => {
                let mut created = Node::package(package_name);
                created.add_child(test_class)?;
                root.add_child(created)?;
            }
        }
    }
    Ok(unmapped)
}

fn tested_class_name(test_class: &str) -> &str {
    ["Tests", "Test"]
        .iter()
        .find_map(|suffix| test_class.strip_suffix(suffix))
        .filter(|name| !name.is_empty())
        .unwrap_or(test_class)
}

fn package_of(class: &str) -> String {
    match class.rsplit_once('.') {
        Some((package, _)) => package.to_string(),
        None => DEFAULT_PACKAGE.to_string(),
    }
}

/// The output of a [`CoverageReporter`] run.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    /// The tree annotated with modified lines and coverage changes.
    pub root: Node,
    pub statistics: CoverageStatistics,
}

/// Computes the statistics of a build.
#[derive(Debug, Default, Clone, Copy)]
pub struct CoverageReporter;

impl CoverageReporter {
    pub fn new() -> Self {
        Self
    }

    /// Without a reference only project values are computed. With a
    /// reference the changes are attached to the tree first; when that fails
    /// the modified and indirect baselines stay empty.
    pub fn run(
        &self,
        mut root: Node,
        reference: Option<&Node>,
        delta: Option<&CodeDelta>,
        log: &mut FilteredLog,
    ) -> Result<CoverageReport> {
        let _span = info_span!("coverage_reporter", root = root.name()).entered();
        let project = root.aggregate_values()?;

        let Some(reference) = reference else {
            log.log_info("No reference build found - computing project statistics only");
            let statistics = CoverageStatistics::builder().project(project).build();
            return Ok(CoverageReport { root, statistics });
        };

        let mut old_paths = BTreeMap::new();
        if let Some(delta) = delta {
            log.log_info("Calculating the code delta...");
            match process_changes(&mut root, reference, delta) {
                Ok(mapping) => old_paths = mapping,
                Err(error @ CovmetricsError::AmbiguousChange { .. }) => {
                    log.log_error(format!("An error occurred while processing code changes: {error}"));
                    log.log_error("-> Skipping calculating modified lines coverage, modified files coverage and indirect coverage changes");
                }
                Err(error) => return Err(error),
            }
        }

        let mut builder = CoverageStatistics::builder()
            .project(project)
            .project_delta(root.compute_delta(reference)?.into_values());

        let modified_lines = root.filter_by_modified_lines();
        let has_line_coverage =
            modified_lines.get_value(Metric::Line)?.is_some() || modified_lines.get_value(Metric::Branch)?.is_some();
        if has_line_coverage {
            let modified_files = root.filter_by_modified_files();
            let reference_names: BTreeSet<String> = modified_files
                .files()
                .into_iter()
                .map(|path| old_paths.get(&path).cloned().unwrap_or(path))
                .collect();
            let reference_files = reference.filter_by_file_names(&reference_names);

            builder = builder
                .modified_lines(modified_lines.aggregate_values()?)
                .modified_lines_delta(modified_lines.compute_delta(&modified_files)?.into_values())
                .modified_files(modified_files.aggregate_values()?)
                .modified_files_delta(modified_files.compute_delta(&reference_files)?.into_values());
        } else if root.has_modified_lines() {
            log.log_info("No detected code changes affect the code coverage");
        }

        let indirect = root.filter_by_indirect_changes();
        let indirect_values: Vec<Value> = indirect.aggregate_values()?;
        builder = builder.indirect(indirect_values);

        Ok(CoverageReport {
            root,
            statistics: builder.build(),
        })
    }
}

/// Attaches the changes of `delta` to `root`. Returns the mapping of current
/// to reference file paths.
fn process_changes(root: &mut Node, reference: &Node, delta: &CodeDelta) -> Result<BTreeMap<String, String>> {
    let changes = map_changes_to_report_paths(delta, root)?;
    let old_paths = create_old_path_mapping(root, reference, &changes)?;
    attach_changed_code_lines(root, &changes);
    attach_indirect_coverage_changes(root, reference, &changes, &old_paths);
    attach_file_coverage_deltas(root, reference, &old_paths)?;
    Ok(old_paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_class(name: &str, count: i64) -> Node {
        let mut class = Node::class(name);
        class.add_value(Value::integer(Metric::Tests, count));
        class
    }

    fn coverage_tree() -> Node {
        let mut class = Node::class("com.example.Parser");
        class.add_value(Value::coverage(Metric::Line, 3, 1));
        let mut file = Node::file("Parser.java", "com/example/Parser.java");
        file.add_child(class).unwrap();
        let mut package = Node::package("com.example");
        package.add_child(file).unwrap();
        let mut root = Node::module("app");
        root.add_child(package).unwrap();
        root
    }

    #[test]
    fn test_no_results() {
        let mut log = FilteredLog::default();
        let root = aggregate_results(vec![], ProcessingMode::FailFast, &mut log).unwrap();
        assert_eq!(root.name(), "Empty");
        assert_eq!(log.error_messages(), vec!["No coverage results were found! Configuration error?"]);
    }

    #[test]
    fn test_only_tests() {
        let mut package = Node::package("com.example");
        package.add_child(test_class("com.example.ParserTest", 4)).unwrap();
        let mut tests = Node::module("junit");
        tests.add_child(package).unwrap();

        let mut log = FilteredLog::default();
        let root = aggregate_results(vec![ParsedReport::tests(tests)], ProcessingMode::FailFast, &mut log).unwrap();
        assert_eq!(root.name(), TESTS_NAME);
        assert_eq!(root.children().len(), 1);
        assert_eq!(root.get_value(Metric::Tests).unwrap(), Some(Value::integer(Metric::Tests, 4)));
        assert!(log.error_messages()[0].contains("just tests"));
    }

    #[test]
    fn test_tests_are_spliced_into_coverage() {
        let mut tests = Node::module("junit");
        tests.add_child(test_class("com.example.ParserTest", 4)).unwrap();
        tests.add_child(test_class("org.other.HelperTest", 2)).unwrap();

        let mut log = FilteredLog::default();
        let root = aggregate_results(
            vec![ParsedReport::coverage(coverage_tree()), ParsedReport::tests(tests)],
            ProcessingMode::FailFast,
            &mut log,
        )
        .unwrap();

        let parser = root.find(NodeKind::Class, "com.example.Parser").unwrap();
        assert_eq!(parser.own_value(Metric::Tests), Some(Value::integer(Metric::Tests, 4)));
        let created = root.find_package("org.other").unwrap();
        assert_eq!(created.children()[0].name(), "org.other.HelperTest");
        assert_eq!(root.get_value(Metric::Tests).unwrap(), Some(Value::integer(Metric::Tests, 6)));
        assert!(!log.has_errors());
    }

    #[test]
    fn test_tested_class_name() {
        assert_eq!(tested_class_name("FooTest"), "Foo");
        assert_eq!(tested_class_name("FooTests"), "Foo");
        assert_eq!(tested_class_name("Test"), "Test");
        assert_eq!(package_of("Foo"), "-");
    }

    #[test]
    fn test_without_reference_only_project_values() {
        let report = CoverageReporter::new()
            .run(coverage_tree(), None, None, &mut FilteredLog::default())
            .unwrap();
        let statistics = report.statistics;
        assert!(statistics.contains_value(crate::statistics::Baseline::Project, Metric::Line));
        assert!(!statistics.contains_value(crate::statistics::Baseline::ProjectDelta, Metric::Line));
    }
}
