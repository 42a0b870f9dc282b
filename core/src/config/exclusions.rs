use serde::Serialize;

use super::types::EnvConfig;

/// Exclusion lists derived from the comma-separated configuration strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    pub files: Vec<String>,
    /// Folder prefixes, always ending in `/`.
    pub folders: Vec<String>,
    pub headings: Vec<String>,
    /// Glob patterns for the filesystem scan.
    pub fs_patterns: Vec<String>,
}

impl Exclusions {
    pub fn from_config(cfg: &EnvConfig) -> Self {
        let files = split_list(&cfg.file_exclusions);
        let folders: Vec<String> = split_list(&cfg.folder_exclusions)
            .into_iter()
            .map(|folder| {
                if folder.ends_with('/') {
                    folder
                } else {
                    format!("{folder}/")
                }
            })
            .collect();
        let headings = split_list(&cfg.excluded_headings);

        let mut fs_patterns = files.clone();
        fs_patterns.extend(folders.iter().map(|folder| format!("{folder}**")));
        let data_folder = cfg.smart_connections_folder.trim().trim_end_matches('/');
        if !data_folder.is_empty() {
            fs_patterns.push(format!("{data_folder}/**"));
        }

        Self {
            files,
            folders,
            headings,
            fs_patterns,
        }
    }

    /// True if a vault-relative path falls under a file or folder exclusion.
    pub fn excludes_path(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.trim_start_matches("./");
        self.folders
            .iter()
            .any(|folder| rel_path.starts_with(folder.as_str()))
            || self
                .files
                .iter()
                .any(|file| rel_path == file || rel_path.ends_with(&format!("/{file}")))
    }

    pub fn excludes_heading(&self, heading: &str) -> bool {
        let heading = heading.trim();
        self.headings.iter().any(|h| h == heading)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// A configuration snapshot paired with its derived exclusions.
///
/// Replaced wholesale on reload; the exclusions are never recomputed for a live snapshot.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    config: EnvConfig,
    exclusions: Exclusions,
}

impl ConfigSnapshot {
    pub fn new(config: EnvConfig) -> Self {
        let exclusions = Exclusions::from_config(&config);
        Self { config, exclusions }
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn exclusions(&self) -> &Exclusions {
        &self.exclusions
    }
}
