//! Source control changes of a build and their projection onto the metric
//! tree: modified lines, indirect coverage changes and per-file deltas.
//!
//! Changes are usually obtained by parsing a unified diff (`git diff`). Paths
//! in the diff are relative to the repository, paths in coverage reports are
//! often relative to a source folder, so both are matched by suffix.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CovmetricsError, Result};
use crate::node::Node;

/// Kind of change of a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Modify,
    Rename,
    Delete,
}

/// A contiguous block of removed and added lines. Line numbers start at the
/// first line of the block in the old and the new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

/// The changes of one file between the reference and the current build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChanges {
    pub new_path: String,
    pub old_path: String,
    pub kind: ChangeKind,
    pub modified_lines: BTreeSet<u32>,
    /// Edits in file order; empty when only the modified lines are known.
    pub edits: Vec<Edit>,
}

impl FileChanges {
    pub fn new(path: impl Into<String>, kind: ChangeKind, modified_lines: impl IntoIterator<Item = u32>) -> Self {
        let path = path.into();
        Self {
            old_path: path.clone(),
            new_path: path,
            kind,
            modified_lines: modified_lines.into_iter().collect(),
            edits: Vec::new(),
        }
    }

    pub fn renamed(
        old_path: impl Into<String>,
        new_path: impl Into<String>,
        modified_lines: impl IntoIterator<Item = u32>,
    ) -> Self {
        Self {
            old_path: old_path.into(),
            new_path: new_path.into(),
            kind: ChangeKind::Rename,
            modified_lines: modified_lines.into_iter().collect(),
            edits: Vec::new(),
        }
    }

    /// The number an unmodified line of the new version had in the old
    /// version. `None` for lines inside an edit.
    pub fn old_line(&self, new_line: u32) -> Option<u32> {
        if self.modified_lines.contains(&new_line) {
            return None;
        }
        let mut offset = 0i64;
        for edit in &self.edits {
            if new_line < edit.new_start {
                break;
            }
            if new_line < edit.new_start + edit.new_count {
                return None;
            }
            offset += i64::from(edit.old_count) - i64::from(edit.new_count);
        }
        u32::try_from(i64::from(new_line) + offset).ok()
    }
}

/// All file changes of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeDelta {
    pub files: Vec<FileChanges>,
}

impl CodeDelta {
    pub fn new(files: Vec<FileChanges>) -> Self {
        Self { files }
    }

    /// Changes that may affect coverage: deleted files have none.
    pub fn coverage_relevant_changes(&self) -> Vec<&FileChanges> {
        self.files
            .iter()
            .filter(|change| change.kind != ChangeKind::Delete)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parses a unified diff (e.g. `git diff`) into a [`CodeDelta`]. Modified
/// lines are the added lines numbered in the new file.
pub fn parse_diff(diff_text: &str) -> CodeDelta {
    let mut files: Vec<FileChanges> = Vec::new();
    let mut current: Option<FileChanges> = None;
    let mut hunk = HunkCursor::default();
    let mut seen_hunk = false;

    for line in diff_text.lines() {
        if hunk.is_open() {
            if let Some(change) = current.as_mut() {
                if is_hunk_line(line) {
                    hunk.consume(line, change);
                    continue;
                }
                // truncated hunk: the line counts promised more lines
                hunk.close(change);
            }
            hunk = HunkCursor::default();
        }

        if line.starts_with("diff --git ") {
            files.extend(current.take());
            current = Some(FileChanges::new(String::new(), ChangeKind::Modify, []));
            seen_hunk = false;
        } else if let Some(rest) = line.strip_prefix("--- ") {
            // plain `diff -u` output has no "diff --git" separator
            if seen_hunk {
                files.extend(current.take());
                seen_hunk = false;
            }
            let change = current.get_or_insert_with(|| FileChanges::new(String::new(), ChangeKind::Modify, []));
            if rest == "/dev/null" {
                change.kind = ChangeKind::Add;
            } else if change.old_path.is_empty() {
                change.old_path = strip_vcs_prefix(rest, "a/").to_string();
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(change) = current.as_mut() {
                if rest == "/dev/null" {
                    change.kind = ChangeKind::Delete;
                    change.new_path = change.old_path.clone();
                } else {
                    change.new_path = strip_vcs_prefix(rest, "b/").to_string();
                    if change.kind == ChangeKind::Add {
                        change.old_path = change.new_path.clone();
                    }
                }
            }
        } else if let Some(from) = line.strip_prefix("rename from ") {
            if let Some(change) = current.as_mut() {
                change.kind = ChangeKind::Rename;
                change.old_path = from.to_string();
            }
        } else if let Some(to) = line.strip_prefix("rename to ") {
            if let Some(change) = current.as_mut() {
                change.kind = ChangeKind::Rename;
                change.new_path = to.to_string();
            }
        } else if line.starts_with("@@ ") && current.is_some() {
            if let Some(header) = parse_hunk_header(line) {
                hunk = HunkCursor::start(header);
                seen_hunk = true;
            }
        }
    }
    if let Some(change) = current.as_mut() {
        hunk.close(change);
    }
    files.extend(current);

    for change in &mut files {
        if change.kind == ChangeKind::Modify && change.old_path != change.new_path && !change.old_path.is_empty() {
            change.kind = ChangeKind::Rename;
        }
        if change.old_path.is_empty() {
            change.old_path = change.new_path.clone();
        }
    }
    files.retain(|change| !change.new_path.is_empty());
    CodeDelta::new(files)
}

/// Line ranges announced by a hunk header "@@ -old_start,old_count +new_start,new_count @@".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    old_start: u32,
    old_count: u32,
    new_start: u32,
    new_count: u32,
}

/// Position inside the body of a hunk. Lines are consumed until both line
/// counts of the header are used up.
#[derive(Debug, Default)]
struct HunkCursor {
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
    edit: Option<Edit>,
}

impl HunkCursor {
    fn start(header: HunkHeader) -> Self {
        Self {
            old_line: header.old_start,
            new_line: header.new_start,
            old_remaining: header.old_count,
            new_remaining: header.new_count,
            edit: None,
        }
    }

    fn is_open(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    fn consume(&mut self, line: &str, change: &mut FileChanges) {
        match line.as_bytes().first() {
            // "\ No newline at end of file"
            Some(b'\\') => return,
            Some(b'-') => {
                self.edit_mut().old_count += 1;
                self.old_line += 1;
                self.old_remaining = self.old_remaining.saturating_sub(1);
            }
            Some(b'+') => {
                self.edit_mut().new_count += 1;
                change.modified_lines.insert(self.new_line);
                self.new_line += 1;
                self.new_remaining = self.new_remaining.saturating_sub(1);
            }
            _ => {
                self.close(change);
                self.old_line += 1;
                self.new_line += 1;
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
            }
        }
        if !self.is_open() {
            self.close(change);
        }
    }

    fn edit_mut(&mut self) -> &mut Edit {
        let (old_start, new_start) = (self.old_line, self.new_line);
        self.edit.get_or_insert(Edit {
            old_start,
            old_count: 0,
            new_start,
            new_count: 0,
        })
    }

    fn close(&mut self, change: &mut FileChanges) {
        if let Some(edit) = self.edit.take() {
            change.edits.push(edit);
        }
    }
}

/// Whether a line can belong to a hunk body. Empty lines are context lines
/// whose trailing space was stripped.
fn is_hunk_line(line: &str) -> bool {
    line.is_empty() || line.starts_with([' ', '+', '-', '\\'])
}

/// Strips the prefix git puts in front of paths. Also handles --no-prefix
/// diffs where no prefix is present.
fn strip_vcs_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let path = path.split('\t').next().unwrap_or(path);
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Parses a hunk header like "@@ -10,5 +20,8 @@". An omitted count is one.
fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let mut parts = line.strip_prefix("@@ ")?.split(' ');
    let (old_start, old_count) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(parts.next()?.strip_prefix('+')?)?;
    Some(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Whether an SCM path and a report path denote the same file.
fn paths_match(scm_path: &str, report_path: &str) -> bool {
    scm_path == report_path
        || scm_path.ends_with(&format!("/{report_path}"))
        || report_path.ends_with(&format!("/{scm_path}"))
}

/// Maps coverage relevant changes to the file paths used in `root`. Changes
/// of files the report does not know are dropped. Two changes claiming the
/// same report file make the mapping ambiguous.
pub fn map_changes_to_report_paths(delta: &CodeDelta, root: &Node) -> Result<BTreeMap<String, FileChanges>> {
    let report_paths = root.files();
    let mut mapped: BTreeMap<String, FileChanges> = BTreeMap::new();
    for change in delta.coverage_relevant_changes() {
        let Some(report_path) = find_report_path(&change.new_path, &report_paths) else {
            continue;
        };
        if let Some(previous) = mapped.get(report_path) {
            return Err(CovmetricsError::AmbiguousChange {
                report_path: report_path.clone(),
                first: previous.new_path.clone(),
                second: change.new_path.clone(),
            });
        }
        mapped.insert(report_path.clone(), change.clone());
    }
    Ok(mapped)
}

fn find_report_path<'a>(scm_path: &str, report_paths: &'a BTreeSet<String>) -> Option<&'a String> {
    report_paths
        .get(scm_path)
        .or_else(|| report_paths.iter().find(|path| paths_match(scm_path, path)))
}

/// Maps every file of `root` to the path of the same file in `reference`,
/// following renames. Files without a counterpart are left out.
pub fn create_old_path_mapping(
    root: &Node,
    reference: &Node,
    changes: &BTreeMap<String, FileChanges>,
) -> Result<BTreeMap<String, String>> {
    let reference_paths = reference.files();
    let mut mapping: BTreeMap<String, String> = BTreeMap::new();
    let mut claimed: BTreeMap<String, String> = BTreeMap::new();
    for path in root.files() {
        let old_path = match changes.get(&path) {
            Some(change) if change.kind == ChangeKind::Rename => change.old_path.as_str(),
            _ => path.as_str(),
        };
        let Some(reference_path) = find_report_path(old_path, &reference_paths) else {
            continue;
        };
        if let Some(other) = claimed.get(reference_path) {
            return Err(CovmetricsError::AmbiguousChange {
                report_path: reference_path.clone(),
                first: other.clone(),
                second: path,
            });
        }
        claimed.insert(reference_path.clone(), path.clone());
        mapping.insert(path, reference_path.clone());
    }
    Ok(mapping)
}

/// Marks the modified lines of every changed file.
pub fn attach_changed_code_lines(root: &mut Node, changes: &BTreeMap<String, FileChanges>) {
    root.for_each_file_mut(&mut |file: &mut Node| {
        let Some(change) = file.file_path().and_then(|path| changes.get(path)) else {
            return;
        };
        let lines = change.modified_lines.clone();
        if let Some(data) = file.file_data_mut() {
            data.modified_lines.extend(lines);
        }
    });
}

/// Records lines whose covered counter changed although the line itself was
/// not modified. Lines of changed files are mapped to their number in the
/// reference version first.
pub fn attach_indirect_coverage_changes(
    root: &mut Node,
    reference: &Node,
    changes: &BTreeMap<String, FileChanges>,
    old_paths: &BTreeMap<String, String>,
) {
    root.for_each_file_mut(&mut |file: &mut Node| {
        let Some(path) = file.file_path().map(str::to_string) else {
            return;
        };
        let Some(reference_file) = old_paths.get(&path).and_then(|old| reference.find_file(old)) else {
            return;
        };
        let Some(reference_lines) = reference_file.file_data().map(|data| &data.lines) else {
            return;
        };
        let change = changes.get(&path);
        let Some(data) = file.file_data_mut() else {
            return;
        };
        let changed: BTreeMap<u32, i64> = data
            .lines
            .iter()
            .filter(|(line, _)| !data.modified_lines.contains(*line))
            .filter_map(|(line, counters)| {
                let old_line = match change {
                    Some(change) => change.old_line(*line)?,
                    None => *line,
                };
                let previous = reference_lines.get(&old_line)?;
                let delta = i64::from(counters.covered) - i64::from(previous.covered);
                (delta != 0).then_some((*line, delta))
            })
            .collect();
        data.indirect_changes.extend(changed);
    });
}

/// Stores the delta of every file against its reference counterpart.
pub fn attach_file_coverage_deltas(root: &mut Node, reference: &Node, old_paths: &BTreeMap<String, String>) -> Result<()> {
    let mut result = Ok(());
    root.for_each_file_mut(&mut |file: &mut Node| {
        if result.is_err() {
            return;
        }
        let Some(reference_file) = file
            .file_path()
            .and_then(|path| old_paths.get(path))
            .and_then(|old| reference.find_file(old))
        else {
            return;
        };
        match file.compute_delta(reference_file) {
            Ok(deltas) => {
                if let Some(data) = file.file_data_mut() {
                    data.coverage_deltas = deltas;
                }
            }
            Err(error) => result = Err(error),
        }
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Metric;
    use crate::node::LineCounters;
    use crate::value::Value;

    const MODIFIED: &str = "\
diff --git a/src/main.rs b/src/main.rs
index 83db48f..bf269f4 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -8,6 +8,8 @@ fn main() {
     let x = 1;
     let a = 0;
     let b = 0;
+    let y = 2;
+    let z = x + y;
     println!(\"{}\", x);
-    println!(\"old\");
+    println!(\"{}\", z);
 }
";

    const RENAMED_AND_DELETED: &str = "\
diff --git a/src/old.rs b/src/new.rs
similarity index 90%
rename from src/old.rs
rename to src/new.rs
--- a/src/old.rs
+++ b/src/new.rs
@@ -1,2 +1,3 @@
 fn a() {}
+fn b() {}
 fn c() {}
diff --git a/src/gone.rs b/src/gone.rs
deleted file mode 100644
--- a/src/gone.rs
+++ /dev/null
@@ -1,1 +0,0 @@
-fn gone() {}
diff --git a/src/lib.rs b/src/lib.rs
new file mode 100644
--- /dev/null
+++ b/src/lib.rs
@@ -0,0 +1,2 @@
+fn hello() {}
+fn world() {}
\\ No newline at end of file
";

    #[test]
    fn test_parse_hunk_header() {
        let header = parse_hunk_header("@@ -10,5 +20,8 @@ fn main() {").unwrap();
        assert_eq!((header.old_start, header.old_count), (10, 5));
        assert_eq!((header.new_start, header.new_count), (20, 8));
        let added = parse_hunk_header("@@ -0,0 +1,3 @@").unwrap();
        assert_eq!((added.old_count, added.new_start, added.new_count), (0, 1, 3));
        let single = parse_hunk_header("@@ -5 +5 @@").unwrap();
        assert_eq!((single.old_count, single.new_count), (1, 1));
        assert!(parse_hunk_header("@@ garbage @@").is_none());
    }

    #[test]
    fn test_removed_line_looking_like_a_header() {
        let diff = "\
--- a/db/schema.sql
+++ b/db/schema.sql
@@ -1,3 +1,3 @@
 create table t (id int);
--- old comment
+-- new comment
 select 1;
";
        let delta = parse_diff(diff);
        assert_eq!(delta.files.len(), 1);
        let change = &delta.files[0];
        assert_eq!(change.new_path, "db/schema.sql");
        assert_eq!(change.kind, ChangeKind::Modify);
        assert_eq!(change.modified_lines.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_added_line_looking_like_a_header() {
        let diff = "\
diff --git a/src/a.c b/src/a.c
--- a/src/a.c
+++ b/src/a.c
@@ -1,2 +1,3 @@
 int main() {
+++ counter;
 }
diff --git a/src/b.c b/src/b.c
--- a/src/b.c
+++ b/src/b.c
@@ -1 +1 @@
-int b;
+long b;
";
        let delta = parse_diff(diff);
        assert_eq!(delta.files.len(), 2);
        let a = &delta.files[0];
        assert_eq!(a.new_path, "src/a.c");
        assert_eq!(a.kind, ChangeKind::Modify);
        assert_eq!(a.modified_lines.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(delta.files[1].new_path, "src/b.c");
        assert_eq!(delta.files[1].modified_lines.iter().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_plain_unified_diff_with_two_files() {
        let diff = "\
--- src/a.rs\t2024-01-01
+++ src/a.rs\t2024-01-02
@@ -1,1 +1,2 @@
 a
+b
--- src/b.rs
+++ src/b.rs
@@ -3,1 +3,1 @@
-c
+d
";
        let delta = parse_diff(diff);
        let paths: Vec<&str> = delta.files.iter().map(|f| f.new_path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs"]);
        assert_eq!(delta.files[1].modified_lines.iter().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_old_line_follows_edits() {
        let change = &parse_diff(MODIFIED).files[0];
        assert_eq!(
            change.edits,
            vec![
                Edit { old_start: 11, old_count: 0, new_start: 11, new_count: 2 },
                Edit { old_start: 12, old_count: 1, new_start: 14, new_count: 1 },
            ]
        );
        assert_eq!(change.old_line(8), Some(8));
        assert_eq!(change.old_line(11), None);
        assert_eq!(change.old_line(13), Some(11));
        assert_eq!(change.old_line(14), None);
        assert_eq!(change.old_line(15), Some(13));

        let deleted = &parse_diff(RENAMED_AND_DELETED).files[1];
        assert_eq!(deleted.old_line(1), Some(2));
    }

    #[test]
    fn test_parse_modified_file() {
        let delta = parse_diff(MODIFIED);
        assert_eq!(delta.files.len(), 1);
        let change = &delta.files[0];
        assert_eq!(change.new_path, "src/main.rs");
        assert_eq!(change.kind, ChangeKind::Modify);
        assert_eq!(change.modified_lines.iter().copied().collect::<Vec<_>>(), vec![11, 12, 14]);
    }

    #[test]
    fn test_parse_rename_delete_and_add() {
        let delta = parse_diff(RENAMED_AND_DELETED);
        assert_eq!(delta.files.len(), 3);

        let renamed = &delta.files[0];
        assert_eq!(renamed.kind, ChangeKind::Rename);
        assert_eq!(renamed.old_path, "src/old.rs");
        assert_eq!(renamed.new_path, "src/new.rs");
        assert_eq!(renamed.modified_lines.iter().copied().collect::<Vec<_>>(), vec![2]);

        assert_eq!(delta.files[1].kind, ChangeKind::Delete);
        assert_eq!(delta.files[2].kind, ChangeKind::Add);
        assert_eq!(delta.files[2].modified_lines.len(), 2);
        assert_eq!(delta.coverage_relevant_changes().len(), 2);
    }

    fn tree(paths: &[&str]) -> Node {
        let mut root = Node::module("root");
        for path in paths {
            let mut file = Node::file(path.rsplit('/').next().unwrap(), *path);
            file.add_line(1, LineCounters::new(1, 0));
            file.add_line(2, LineCounters::new(0, 1));
            file.add_value(Value::coverage(Metric::Line, 1, 1));
            root.add_child(file).unwrap();
        }
        root
    }

    #[test]
    fn test_map_changes_by_suffix() {
        let root = tree(&["com/example/A.java"]);
        let delta = CodeDelta::new(vec![
            FileChanges::new("module/src/main/java/com/example/A.java", ChangeKind::Modify, [1]),
            FileChanges::new("README.md", ChangeKind::Modify, [1]),
        ]);
        let mapped = map_changes_to_report_paths(&delta, &root).unwrap();
        assert_eq!(mapped.len(), 1);
        assert!(mapped.contains_key("com/example/A.java"));
    }

    #[test]
    fn test_ambiguous_mapping_fails() {
        let root = tree(&["A.java"]);
        let delta = CodeDelta::new(vec![
            FileChanges::new("one/A.java", ChangeKind::Modify, [1]),
            FileChanges::new("two/A.java", ChangeKind::Modify, [2]),
        ]);
        let err = map_changes_to_report_paths(&delta, &root).unwrap_err();
        assert!(matches!(err, CovmetricsError::AmbiguousChange { .. }));
    }

    #[test]
    fn test_old_path_mapping_follows_renames() {
        let root = tree(&["src/new.rs", "src/same.rs"]);
        let reference = tree(&["src/old.rs", "src/same.rs"]);
        let mut changes = BTreeMap::new();
        changes.insert("src/new.rs".to_string(), FileChanges::renamed("src/old.rs", "src/new.rs", [1]));

        let mapping = create_old_path_mapping(&root, &reference, &changes).unwrap();
        assert_eq!(mapping["src/new.rs"], "src/old.rs");
        assert_eq!(mapping["src/same.rs"], "src/same.rs");
    }

    #[test]
    fn test_attach_changes_and_indirect_coverage() {
        let mut root = tree(&["src/a.rs", "src/b.rs"]);
        let mut reference = tree(&["src/a.rs", "src/b.rs"]);
        reference
            .find_file_mut("src/b.rs")
            .unwrap()
            .add_line(2, LineCounters::new(1, 0));

        let delta = CodeDelta::new(vec![FileChanges::new("src/a.rs", ChangeKind::Modify, [2])]);
        let changes = map_changes_to_report_paths(&delta, &root).unwrap();
        attach_changed_code_lines(&mut root, &changes);
        let old_paths = create_old_path_mapping(&root, &reference, &changes).unwrap();
        attach_indirect_coverage_changes(&mut root, &reference, &changes, &old_paths);
        attach_file_coverage_deltas(&mut root, &reference, &old_paths).unwrap();

        let a = root.find_file("src/a.rs").unwrap().file_data().unwrap();
        assert_eq!(a.modified_lines.iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(a.indirect_changes.is_empty());

        let b = root.find_file("src/b.rs").unwrap().file_data().unwrap();
        assert_eq!(b.indirect_changes.get(&2), Some(&-1));
        assert!(b.coverage_deltas.contains_key(&Metric::Line));
    }

    #[test]
    fn test_indirect_changes_inside_modified_file() {
        // lines 3-4 inserted; old lines 3 and 4 moved to 5 and 6
        let diff = "\
--- a/src/c.rs
+++ b/src/c.rs
@@ -2,2 +2,4 @@
 fn a() {}
+fn b() {}
+fn c() {}
 fn d() {}
";
        let mut reference = Node::module("root");
        let mut old = Node::file("c.rs", "src/c.rs");
        for (line, covered) in [(1, 1), (2, 1), (3, 0), (4, 1)] {
            old.add_line(line, LineCounters::new(covered, 1 - covered));
        }
        reference.add_child(old).unwrap();

        let mut root = Node::module("root");
        let mut new = Node::file("c.rs", "src/c.rs");
        for (line, covered) in [(1, 1), (2, 0), (3, 1), (4, 1), (5, 1), (6, 0)] {
            new.add_line(line, LineCounters::new(covered, 1 - covered));
        }
        root.add_child(new).unwrap();

        let changes = map_changes_to_report_paths(&parse_diff(diff), &root).unwrap();
        attach_changed_code_lines(&mut root, &changes);
        let old_paths = create_old_path_mapping(&root, &reference, &changes).unwrap();
        attach_indirect_coverage_changes(&mut root, &reference, &changes, &old_paths);

        let data = root.find_file("src/c.rs").unwrap().file_data().unwrap();
        assert_eq!(data.modified_lines.iter().copied().collect::<Vec<_>>(), vec![3, 4]);
        let expected: BTreeMap<u32, i64> = [(2, -1), (5, 1), (6, -1)].into_iter().collect();
        assert_eq!(data.indirect_changes, expected);
    }
}
