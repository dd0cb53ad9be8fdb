use std::path::Path;

/// Decides whether a changed path is relevant to this watch session.
///
/// Include patterns starting with a dot are compared against the file's
/// extension; every include pattern also matches as a plain substring of
/// the path. Exclude patterns are substrings and always win.
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl PatternFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn from_config(config: &crate::config::WatchConfig) -> Self {
        Self::new(config.include_patterns.clone(), config.exclude_patterns.clone())
    }

    pub fn should_process<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let path_str = path.to_string_lossy();

        if !self.include.is_empty()
            && !self.include.iter().any(|p| Self::include_matches(p, path, &path_str))
        {
            return false;
        }

        !self.exclude.iter().any(|p| path_str.contains(p.as_str()))
    }

    fn include_matches(pattern: &str, path: &Path, path_str: &str) -> bool {
        if pattern.starts_with('.') {
            if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
                if &pattern[1..] == ext {
                    return true;
                }
            }
        }
        path_str.contains(pattern)
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude
    }
}
