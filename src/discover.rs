use crate::import::IMPORT_EXTENSIONS;
use crate::loader::extension;
use ignore::WalkBuilder;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

/// Importable files under `dir`, honoring `.gitignore` and `.assetqignore`.
pub fn collect_import_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .add_custom_ignore_filename(".assetqignore")
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() && IMPORT_EXTENSIONS.contains(&extension(path).as_str()) {
            files.push(path.to_path_buf());
        }
    }

    files
}

pub fn read_paths_from_stdin() -> Vec<PathBuf> {
    let stdin = io::stdin();
    stdin
        .lock()
        .lines()
        .map_while(Result::ok)
        .filter(|line| !line.trim().is_empty())
        .map(|line| PathBuf::from(line.trim()))
        .collect()
}
