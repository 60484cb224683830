use crate::error::Result;

/// Directory names whose presence in a path marks a test suite.
const TEST_DIRECTORIES: &[&str] = &["test", "tests", "__tests__"];

/// Substrings that mark a test file.
const TEST_FILE_FRAGMENTS: &[&str] = &[".test.", ".spec.", "_test.", "_spec.", "/test_"];

const README_PREFIXES: &[&str] = &["readme"];
const LICENSE_PREFIXES: &[&str] = &["license", "licence", "copying"];

/// What the repository tree says about code quality.
///
/// The matching is deliberately loose (substring and prefix checks) and its
/// false positives are part of the scoring behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeSignals {
    pub has_readme: bool,
    pub has_license: bool,
    pub has_tests: bool,
}

impl TreeSignals {
    pub fn from_paths(paths: &[String]) -> Self {
        Self {
            has_readme: has_root_file(paths, README_PREFIXES),
            has_license: has_root_file(paths, LICENSE_PREFIXES),
            has_tests: has_tests(paths),
        }
    }

    /// A tree that could not be listed yields no signals instead of an error.
    pub fn from_listing(listing: Result<Vec<String>>) -> Self {
        match listing {
            Ok(paths) => Self::from_paths(&paths),
            Err(e) => {
                tracing::warn!("Tree listing unavailable, assuming no tests: {}", e);
                Self::default()
            }
        }
    }
}

pub fn has_tests(paths: &[String]) -> bool {
    paths.iter().any(|path| {
        let path = format!("/{}", path.to_lowercase());
        TEST_DIRECTORIES
            .iter()
            .any(|dir| path.contains(&format!("/{}/", dir)))
            || TEST_FILE_FRAGMENTS.iter().any(|fragment| path.contains(fragment))
    })
}

fn has_root_file(paths: &[String], prefixes: &[&str]) -> bool {
    paths
        .iter()
        .filter(|path| !path.contains('/'))
        .map(|path| path.to_lowercase())
        .any(|name| prefixes.iter().any(|prefix| name.starts_with(prefix)))
}
