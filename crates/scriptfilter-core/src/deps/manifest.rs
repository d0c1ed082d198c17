//! Dependency manifest parsing.
//!
//! One requirement per line, in the format pip understands:
//! - `requests`
//! - `requests==2.31.0`
//! - `httpx[http2] >= 0.27, < 1`
//! - `tomli; python_version < "3.11"`
//! - `mypkg @ https://example.com/mypkg-1.0.tar.gz`
//!
//! `#` starts a comment (at line start or after whitespace); blank lines are
//! ignored. Option lines such as `-r other.txt` or `--index-url` are rejected.

use crate::error::Error;
use scriptfilter_util::fs::read_to_string_lossy;
use scriptfilter_util::hash::blake3_bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const SPECIFIER_OPERATORS: [&str; 8] = ["===", "==", "!=", "<=", ">=", "~=", "<", ">"];

/// Canonical form of a package name: lowercase, runs of `-`, `_`, `.` become `-`.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// One declared package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Package name as written.
    pub name: String,
    /// Optional extras, e.g. `http2` in `httpx[http2]`.
    pub extras: Vec<String>,
    /// Version specifier with whitespace removed (`>=0.27,<1`), or a direct
    /// reference (`@ https://...`).
    pub specifier: Option<String>,
    /// Environment marker after `;`, kept verbatim.
    pub marker: Option<String>,
    /// 1-based line number in the manifest.
    pub line: usize,
}

impl Requirement {
    /// Parse a single requirement.
    ///
    /// # Errors
    /// Returns [`Error::Manifest`] if the text is not a valid requirement.
    pub fn parse(input: &str) -> Result<Self, Error> {
        parse_requirement(input.trim(), 1).map_err(|message| Error::Manifest {
            path: PathBuf::from("<inline>"),
            line: 1,
            message,
        })
    }

    /// Canonical package name used for presence checks and de-duplication.
    #[must_use]
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether both declare the same thing, ignoring name spelling and extras order.
    #[must_use]
    pub fn same_declaration(&self, other: &Self) -> bool {
        self.normalized_name() == other.normalized_name()
            && self.normalized_extras() == other.normalized_extras()
            && self.specifier == other.specifier
            && self.marker == other.marker
    }

    fn normalized_extras(&self) -> Vec<String> {
        let mut extras: Vec<String> = self.extras.iter().map(|e| normalize_name(e)).collect();
        extras.sort();
        extras.dedup();
        extras
    }

    /// Canonical requirement string handed to the installer.
    #[must_use]
    pub fn spec(&self) -> String {
        let mut out = self.name.clone();
        if !self.extras.is_empty() {
            out.push('[');
            out.push_str(&self.extras.join(","));
            out.push(']');
        }
        if let Some(specifier) = &self.specifier {
            if specifier.starts_with('@') {
                out.push(' ');
            }
            out.push_str(specifier);
        }
        if let Some(marker) = &self.marker {
            out.push_str("; ");
            out.push_str(marker);
        }
        out
    }
}

/// Parsed manifest: ordered, de-duplicated requirements.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    /// BLAKE3 of the raw file contents, used to detect manifest changes.
    pub content_hash: String,
}

impl Manifest {
    /// Read and parse the manifest at `path`. A missing file yields `Ok(None)`.
    ///
    /// # Errors
    /// Returns [`Error::ManifestRead`] if the file exists but cannot be read, or
    /// [`Error::Manifest`] if a line is malformed.
    pub fn load(path: &Path) -> Result<Option<Self>, Error> {
        if !path.exists() {
            return Ok(None);
        }
        let text = read_to_string_lossy(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text).map(Some)
    }

    /// Parse manifest text.
    ///
    /// # Errors
    /// Returns [`Error::Manifest`] naming the first offending line.
    pub fn parse(path: &Path, text: &str) -> Result<Self, Error> {
        let invalid = |line: usize, message: String| Error::Manifest {
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut requirements: Vec<Requirement> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = strip_comment(raw).trim();
            if content.is_empty() {
                continue;
            }

            let requirement = parse_requirement(content, line).map_err(|m| invalid(line, m))?;
            let key = requirement.normalized_name();

            if let Some(&existing) = seen.get(&key) {
                let previous = &requirements[existing];
                if previous.same_declaration(&requirement) {
                    continue;
                }
                return Err(invalid(
                    line,
                    format!(
                        "conflicting declaration for '{}' (also declared on line {})",
                        requirement.name, previous.line
                    ),
                ));
            }

            seen.insert(key, requirements.len());
            requirements.push(requirement);
        }

        Ok(Self {
            path: path.to_path_buf(),
            requirements,
            content_hash: blake3_bytes(text.as_bytes()),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

fn parse_requirement(input: &str, line: usize) -> Result<Requirement, String> {
    if input.is_empty() {
        return Err("empty requirement".to_string());
    }
    if input.starts_with('-') {
        let option = input.split_whitespace().next().unwrap_or(input);
        return Err(format!("unsupported option '{option}'"));
    }

    let (body, marker) = match input.split_once(';') {
        Some((body, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err(format!("empty environment marker in '{input}'"));
            }
            (body.trim(), Some(marker.to_string()))
        }
        None => (input, None),
    };

    let name_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(body.len());
    let name = &body[..name_end];
    validate_name(name, input)?;

    let mut rest = body[name_end..].trim_start();
    let mut extras = Vec::new();
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let Some(close) = after_bracket.find(']') else {
            return Err(format!("unclosed extras in '{input}'"));
        };
        for extra in after_bracket[..close].split(',') {
            let extra = extra.trim();
            if extra.is_empty() {
                continue;
            }
            validate_name(extra, input)?;
            extras.push(extra.to_string());
        }
        rest = after_bracket[close + 1..].trim_start();
    }

    let specifier = if rest.is_empty() {
        None
    } else if let Some(reference) = rest.strip_prefix('@') {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(format!("empty direct reference in '{input}'"));
        }
        Some(format!("@ {reference}"))
    } else {
        Some(parse_specifier(rest, input)?)
    };

    Ok(Requirement {
        name: name.to_string(),
        extras,
        specifier,
        marker,
        line,
    })
}

fn parse_specifier(rest: &str, input: &str) -> Result<String, String> {
    let compact: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
    for clause in compact.split(',') {
        let Some(op) = SPECIFIER_OPERATORS.iter().find(|op| clause.starts_with(**op)) else {
            return Err(format!("invalid version specifier '{clause}' in '{input}'"));
        };
        let version = &clause[op.len()..];
        if version.is_empty() {
            return Err(format!("missing version after '{op}' in '{input}'"));
        }
        if let Some(c) = version
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '-' | '_')))
        {
            return Err(format!("invalid character '{c}' in version '{version}'"));
        }
    }
    Ok(compact)
}

fn validate_name(name: &str, input: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(format!("missing package name in '{input}'"));
    }
    let first = name.chars().next().unwrap_or('-');
    let last = name.chars().last().unwrap_or('-');
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(format!(
            "package name '{name}' must start and end with a letter or digit"
        ));
    }
    Ok(())
}
