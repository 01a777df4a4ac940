//! Composable file discovery (spec §4.4).

use std::path::{Path, PathBuf};

use qa_core::FileDiscoveryConfig;

/// One source of candidate files. Strategies may be lazy; [`DiscoveryService`]
/// consumes them eagerly and in declared order.
pub trait DiscoveryStrategy: Send + Sync {
    fn discover(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf>;
}

/// Walks the tree under `root` honoring `.gitignore` unless the config asks
/// otherwise, yielding regular files only.
pub struct GitAwareWalkStrategy;

impl DiscoveryStrategy for GitAwareWalkStrategy {
    fn discover(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        let roots = if config.roots.is_empty() {
            vec![root.to_path_buf()]
        } else {
            config.roots.clone()
        };

        let mut out = Vec::new();
        for r in roots {
            let mut builder = ignore::WalkBuilder::new(&r);
            builder.git_ignore(config.respect_gitignore);
            builder.git_exclude(config.respect_gitignore);
            builder.hidden(false);
            builder.require_git(false);
            for entry in builder.build().flatten() {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    out.push(entry.into_path());
                }
            }
        }
        out
    }
}

/// Yields exactly the paths listed in `limit_to`, for callers that already
/// know which files to check (e.g. a pre-commit hook's staged-file list).
pub struct ExplicitFileStrategy;

impl DiscoveryStrategy for ExplicitFileStrategy {
    fn discover(&self, config: &FileDiscoveryConfig, _root: &Path) -> Vec<PathBuf> {
        config.limit_to.clone()
    }
}

/// Composes strategies into one deduplicated, root-bounded file list
/// (spec §4.4).
pub struct DiscoveryService {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl DiscoveryService {
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>) -> Self {
        Self { strategies }
    }

    /// Default pipeline: a gitignore-respecting tree walk.
    pub fn default_pipeline() -> Self {
        Self::new(vec![Box::new(GitAwareWalkStrategy)])
    }

    pub fn run(&self, config: &FileDiscoveryConfig, root: &Path) -> Vec<PathBuf> {
        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();

        for strategy in &self.strategies {
            for path in strategy.discover(config, root) {
                let resolved = path.canonicalize().unwrap_or(path);
                if seen.insert(resolved.clone()) {
                    results.push(resolved);
                }
            }
        }

        apply_limit_to(results, &config.limit_to, root)
    }
}

/// Drop any path not a descendant of one of the resolved `limit_to`
/// directories. An empty `limit_to` is a no-op (no restriction).
fn apply_limit_to(paths: Vec<PathBuf>, limit_to: &[PathBuf], root: &Path) -> Vec<PathBuf> {
    if limit_to.is_empty() {
        return paths;
    }
    let bounds: Vec<PathBuf> = limit_to
        .iter()
        .map(|p| {
            let absolute = if p.is_absolute() { p.clone() } else { root.join(p) };
            absolute.canonicalize().unwrap_or(absolute)
        })
        .collect();

    paths
        .into_iter()
        .filter(|path| bounds.iter().any(|bound| path.starts_with(bound) || path == bound))
        .collect()
}
