use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::errors::HarnessError;
use crate::types::{BenchmarkConfig, Settings};

pub const CONFIG_FILE_NAME: &str = "config";
const DEFAULT_SECTION: &str = "DEFAULT";

/// Load `<benchmark_dir>/config`.
///
/// A missing file, a syntax error, or a missing or non-positive `maxtime` is
/// fatal. `args` is optional and split on whitespace.
pub fn load_benchmark_config(benchmark_dir: &Path) -> Result<BenchmarkConfig> {
    let path = benchmark_dir.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Err(HarnessError::ConfigNotFound { path }.into());
    }

    let text = std::fs::read_to_string(&path).map_err(|source| HarnessError::ConfigReadError {
        path: path.clone(),
        source,
    })?;

    parse_benchmark_config(&text, &path)
}

/// Parse config text; `path` is only used for error messages.
pub fn parse_benchmark_config(text: &str, path: &Path) -> Result<BenchmarkConfig> {
    let sections = parse_ini(text, path)?;
    let defaults = sections.get(DEFAULT_SECTION);

    let raw_max_time = defaults
        .and_then(|s| s.get("maxtime"))
        .ok_or_else(|| HarnessError::MissingMaxTime {
            path: path.to_path_buf(),
        })?;

    let max_time_secs = match raw_max_time.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => {
            return Err(HarnessError::InvalidMaxTime {
                path: path.to_path_buf(),
                value: raw_max_time.clone(),
            }
            .into());
        }
    };

    let extra_args = defaults
        .and_then(|s| s.get("args"))
        .map(|args| args.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(BenchmarkConfig {
        max_time_secs,
        extra_args,
    })
}

type Section = HashMap<String, String>;

/// Minimal INI reader: `[section]` headers, `key = value` or `key: value`,
/// full-line `#`/`;` comments, indented continuation lines. Keys are
/// lowercased.
fn parse_ini(text: &str, path: &Path) -> Result<HashMap<String, Section>> {
    let mut sections: HashMap<String, Section> = HashMap::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    let syntax = |line: usize, detail: &str| HarnessError::ConfigSyntaxError {
        path: path.to_path_buf(),
        line,
        detail: detail.to_string(),
    };

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();

        // Blank lines may sit inside a multi-line value.
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if raw.starts_with(char::is_whitespace)
            && let (Some(section), Some(key)) = (&current, &last_key)
        {
            if let Some(value) = sections.get_mut(section).and_then(|s| s.get_mut(key)) {
                value.push('\n');
                value.push_str(trimmed);
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| syntax(line_no, "unterminated section header"))?;
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            last_key = None;
            continue;
        }

        let section = current
            .as_ref()
            .ok_or_else(|| syntax(line_no, "key outside of any section"))?;

        let delim = trimmed
            .find(['=', ':'])
            .ok_or_else(|| syntax(line_no, "expected 'key = value'"))?;
        let key = trimmed[..delim].trim().to_lowercase();
        let value = trimmed[delim + 1..].trim().to_string();
        if key.is_empty() {
            return Err(syntax(line_no, "empty key").into());
        }

        let entries = sections.entry(section.clone()).or_default();
        if entries.contains_key(&key) {
            return Err(syntax(line_no, &format!("duplicate key '{}'", key)).into());
        }
        entries.insert(key.clone(), value);
        last_key = Some(key);
    }

    Ok(sections)
}

/// Load a TOML sweep settings file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let settings_error = |detail: String| HarnessError::SettingsError {
        path: PathBuf::from(path),
        detail,
    };

    let text = std::fs::read_to_string(path).map_err(|e| settings_error(e.to_string()))?;
    let settings: Settings = toml::from_str(&text).map_err(|e| settings_error(e.to_string()))?;

    if settings.allocators.is_empty() {
        return Err(settings_error("'allocators' must not be empty".to_string()).into());
    }
    if settings.max_threads == 0 {
        return Err(settings_error("'max_threads' must be at least 1".to_string()).into());
    }

    Ok(settings)
}
