use crate::constants::CORPUS_SIZE;
use crate::error::{MetadataError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

static CAP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<number>\d{3})(?P<bis>bis)?(?:.(?P<title>.*))?$")
        .expect("cap filename pattern compiles")
});

/// Last CPE number that needs no correction.
const LAST_UNSHIFTED: i64 = 282;
/// The CPE number that occurs twice, once as `283` and once as `283bis`.
const DUPLICATED: i64 = 283;

/// One score file of the DCML chorale dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapFile {
    pub number: i64,
    pub file_name: String,
    pub title: String,
}

/// Map the CPE file number onto the Riemenschneider numbering.
///
/// The DCML files carry a duplicated `283bis`, so it becomes 284 and every
/// later number moves up by one.
pub fn corrected_number(number: i64, bis: bool) -> i64 {
    if number <= LAST_UNSHIFTED {
        number
    } else if number == DUPLICATED {
        if bis {
            number + 1
        } else {
            number
        }
    } else {
        number + 1
    }
}

/// Parse `NNN[bis]<sep><title><extension>`; `None` when the name does not
/// follow that shape.
pub fn parse_cap_file_name(file_name: &str, extension: &str) -> Option<CapFile> {
    let stem = file_name.strip_suffix(extension)?;
    let caps = CAP_NAME_RE.captures(stem)?;
    let number: i64 = caps.name("number")?.as_str().parse().ok()?;
    Some(CapFile {
        number: corrected_number(number, caps.name("bis").is_some()),
        file_name: file_name.to_string(),
        title: caps
            .name("title")
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    })
}

/// Discovered files keyed by corrected number, restricted to the corpus.
#[derive(Debug, Clone, Default)]
pub struct CapListing {
    files: BTreeMap<i64, CapFile>,
}

impl CapListing {
    pub fn get(&self, number: i64) -> Option<&CapFile> {
        self.files.get(&number)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapFile> {
        self.files.values()
    }

    /// Corpus numbers with no file.
    pub fn missing(&self) -> Vec<i64> {
        (1..=CORPUS_SIZE)
            .filter(|n| !self.files.contains_key(n))
            .collect()
    }
}

impl FromIterator<CapFile> for CapListing {
    fn from_iter<I: IntoIterator<Item = CapFile>>(iter: I) -> Self {
        let mut files = BTreeMap::new();
        for file in iter {
            if (1..=CORPUS_SIZE).contains(&file.number) {
                files.insert(file.number, file);
            } else {
                debug!(
                    "Ignoring {} with number {} outside the corpus",
                    file.file_name, file.number
                );
            }
        }
        Self { files }
    }
}

/// List the files directly under `dir` ending in `extension`, in name order.
pub fn discover_cap_files(dir: &Path, extension: &str) -> Result<CapListing> {
    let entries = fs::read_dir(dir).map_err(|e| MetadataError::io(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| MetadataError::io(dir, e))?;
        match entry.file_name().into_string() {
            Ok(name) if name.ends_with(extension) => names.push(name),
            Ok(_) => {}
            Err(name) => warn!("Skipping non UTF-8 file name {:?}", name),
        }
    }
    names.sort();

    let listing: CapListing = names
        .iter()
        .filter_map(|name| {
            let parsed = parse_cap_file_name(name, extension);
            if parsed.is_none() {
                warn!("No number/title in file name {}", name);
            }
            parsed
        })
        .collect();

    info!(
        "Discovered {} {} files in {} ({} corpus numbers without a file)",
        listing.len(),
        extension,
        dir.display(),
        listing.missing().len()
    );
    Ok(listing)
}
