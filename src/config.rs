//! Saved defaults for command-line flags.
//!
//! Both rc files hold one flag per line, `#` starts a comment. The local
//! `.livevtlrc` overrides the global file and the command line overrides both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Whether to start in dark mode. `Auto` asks `detect` and falls back to light.
    pub fn is_dark(self, detect: impl FnOnce() -> Option<bool>) -> bool {
        match self {
            Self::Light => false,
            Self::Dark => true,
            Self::Auto => detect().unwrap_or(false),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub strict: bool,
    pub theme: Option<ThemeMode>,
    pub log_file: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub template: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge two flag sets; `other` wins wherever it sets a value.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            strict: self.strict || other.strict,
            theme: other.theme.or(self.theme),
            log_file: other.log_file.clone().or_else(|| self.log_file.clone()),
            data: other.data.clone().or_else(|| self.data.clone()),
            template: other.template.clone().or_else(|| self.template.clone()),
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("livevtl").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("livevtl")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("livevtl").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("livevtl")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".livevtlrc")
}

/// Read flags from an rc file. A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    let flags = parse_flag_tokens(&tokens);
    tracing::debug!(path = %path.display(), ?flags, "loaded config");
    Ok(flags)
}

/// Write `flags` to `path`, creating the parent directory.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# livevtl defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if flags.strict {
        lines.push("--strict".to_string());
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(path) = &flags.log_file {
        lines.push(format!("--log-file {}", path.display()));
    }
    if let Some(path) = &flags.data {
        lines.push(format!("--data {}", path.display()));
    }
    if let Some(path) = &flags.template {
        lines.push(format!("--template {}", path.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// Remove the rc file at `path` if there is one.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the flags this module knows out of a token list. Unknown tokens are
/// skipped, so raw `std::env::args()` can be passed directly.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--watch" | "-w" => flags.watch = true,
            "--strict" => flags.strict = true,
            "--theme" | "--log-file" | "--data" | "--template" => {
                if let Some(next) = tokens.get(i + 1) {
                    apply_value(&mut flags, &token[2..], next);
                    i += 1;
                }
            }
            _ => {
                if let Some((name, value)) = token
                    .strip_prefix("--")
                    .and_then(|rest| rest.split_once('='))
                {
                    apply_value(&mut flags, name, value);
                }
            }
        }
        i += 1;
    }
    flags
}

fn apply_value(flags: &mut ConfigFlags, name: &str, value: &str) {
    match name {
        "theme" => flags.theme = parse_theme(value),
        "log-file" => flags.log_file = Some(PathBuf::from(value)),
        "data" => flags.data = Some(PathBuf::from(value)),
        "template" => flags.template = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

/// Guess the terminal background from a `COLORFGBG` value such as `15;0`.
///
/// The last field is the background's ANSI color index. Returns `Some(true)`
/// for a dark background and `None` when the value is unusable.
pub fn background_is_dark(colorfgbg: &str) -> Option<bool> {
    let background = colorfgbg.rsplit(';').next()?.trim().parse::<u8>().ok()?;
    // 7 is light gray and 9..=15 are the bright colors; 8 is dark gray.
    Some(!matches!(background, 7 | 9..=15))
}
