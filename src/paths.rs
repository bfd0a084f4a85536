use std::path::PathBuf;

use crate::settings::Settings;

#[derive(Clone)]
pub struct Paths {
    pub root: PathBuf,
    pub roster: PathBuf,
    pub state: PathBuf,
}

impl Paths {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            roster: root.join("repos.conf"),
            state: root.join("repos.json"),
            root,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::at(settings.target.clone())
    }

    pub fn repo_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}
