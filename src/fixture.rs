//! Golden-file fixtures.
//!
//! A fixture named `core__paragraph` consists of:
//!
//! - `core__paragraph.html`: the block-annotated input,
//! - `core__paragraph.server.html`: the expected rendered output,
//! - `core__paragraph.parsed.json` (optional): the expected parse tree.
//!
//! Names are collected from every `*.html` and `*.json` file in the fixture
//! directory by cutting the file name at its first `.`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FixtureError;

/// Input and expected-output paths for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePair {
    pub name: String,
    pub input: PathBuf,
    pub expected: PathBuf,
}

/// Contents of a loaded fixture, with `\r` removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFixture {
    pub input: String,
    pub expected: String,
}

impl FixturePair {
    /// The `<name>.html` / `<name>.server.html` pair inside `dir`.
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            input: dir.join(format!("{name}.html")),
            expected: dir.join(format!("{name}.server.html")),
        }
    }

    /// Read both files. Fails on the first missing file before reading any.
    pub fn load(&self) -> Result<LoadedFixture, FixtureError> {
        for path in [&self.input, &self.expected] {
            if !path.exists() {
                return Err(FixtureError::Missing(path.clone()));
            }
        }
        Ok(LoadedFixture {
            input: strip_r(&read(&self.input)?),
            expected: strip_r(&read(&self.expected)?),
        })
    }

    /// The optional `<name>.parsed.json` next to the input.
    pub fn parsed_json(&self) -> Option<PathBuf> {
        let path = self.input.with_file_name(format!("{}.parsed.json", self.name));
        path.exists().then_some(path)
    }
}

/// List the fixtures in `dir`, sorted by name.
pub fn discover(dir: &Path) -> Result<Vec<FixturePair>, FixtureError> {
    let entries = fs::read_dir(dir).map_err(|source| io_error(dir, source))?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let path = entry.map_err(|source| io_error(dir, source))?.path();
        let is_fixture = path
            .extension()
            .is_some_and(|ext| ext == "html" || ext == "json");
        if !is_fixture {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()).map(fixture_name) {
            names.insert(name.to_string());
        }
    }

    Ok(names
        .into_iter()
        .map(|name| FixturePair::new(dir, &name))
        .collect())
}

/// The fixture name for a file name: everything before the first `.`.
pub fn fixture_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Remove every carriage return.
pub fn strip_r(input: &str) -> String {
    input.replace('\r', "")
}

/// Read a fixture file, reporting the path on failure.
pub fn read(path: &Path) -> Result<String, FixtureError> {
    fs::read_to_string(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> FixtureError {
    FixtureError::Io {
        path: path.to_path_buf(),
        source,
    }
}
