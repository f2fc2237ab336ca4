use std::collections::BTreeMap;

use crate::wire::GeneratedFile;

/// Directory node for grouped display of generated files.
///
/// Children are keyed by path segment and iterate in name order; files keep
/// the order in which they were generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree<'a> {
    pub children: BTreeMap<String, FileTree<'a>>,
    pub files: Vec<&'a GeneratedFile>,
}

/// Split a path on `/` or `\`, ignoring leading, trailing and doubled separators.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty()).collect()
}

impl<'a> FileTree<'a> {
    pub fn build(files: &'a [GeneratedFile]) -> Self {
        let mut root = FileTree::default();
        for f in files {
            let parts = segments(&f.path);
            let dirs = parts.len().saturating_sub(1);
            let mut node = &mut root;
            for seg in &parts[..dirs] {
                node = node.children.entry((*seg).to_string()).or_default();
            }
            node.files.push(f);
        }
        root
    }

    /// Files at this node and everywhere below it.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.children.values().map(FileTree::file_count).sum::<usize>()
    }

    /// Descend along `path` (same separator rules as file paths).
    #[cfg(test)]
    pub fn get(&self, path: &str) -> Option<&FileTree<'a>> {
        segments(path)
            .into_iter()
            .try_fold(self, |node, seg| node.children.get(seg))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<GeneratedFile> {
        paths.iter().map(|p| GeneratedFile::new(*p, "x\n")).collect()
    }

    #[test]
    fn groups_by_directory() {
        let fs = files(&["A/B/x.yml", "A/C/y.sql", "z.txt"]);
        let tree = FileTree::build(&fs);

        assert_eq!(tree.files.len(), 1);
        assert_eq!(tree.files[0].path, "z.txt");
        assert_eq!(tree.file_count(), 3);

        let b = tree.get("A/B").unwrap();
        assert_eq!(b.files[0].path, "A/B/x.yml");
        let c = tree.get("A/C").unwrap();
        assert_eq!(c.files[0].path, "A/C/y.sql");
        assert_eq!(tree.get("A").unwrap().file_count(), 2);
        assert!(tree.get("A").unwrap().files.is_empty());
    }

    #[test]
    fn separators_are_normalized() {
        let fs = files(&["/Orders\\Feed\\sql/load.gql/", "Orders//Feed/config/feed.yml"]);
        let tree = FileTree::build(&fs);
        let feed = tree.get("Orders/Feed").unwrap();
        let names: Vec<&String> = feed.children.keys().collect();
        assert_eq!(names, ["config", "sql"]);
        assert_eq!(feed.get("sql").unwrap().files.len(), 1);
        assert!(tree.files.is_empty());
    }

    #[test]
    fn duplicates_land_in_same_node() {
        let fs = files(&["a/x.sql", "a/x.sql"]);
        let tree = FileTree::build(&fs);
        assert_eq!(tree.get("a").unwrap().files.len(), 2);
    }

    #[test]
    fn empty_input() {
        let tree = FileTree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.file_count(), 0);
    }
}
