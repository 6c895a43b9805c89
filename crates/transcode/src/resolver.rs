//! Encoder binary resolution.
//!
//! Strategies are tried in order and the first existing executable wins.
//! Every attempt is recorded so that a failed lookup can say exactly where
//! it looked.

use std::path::{Path, PathBuf};

use gifcap_common::error::{GifcapError, GifcapResult};

/// Environment variable overriding the ffmpeg location.
pub const ENCODER_ENV: &str = "GIFCAP_FFMPEG";

/// Default encoder binary name.
pub const ENCODER_BINARY: &str = "ffmpeg";

/// Install locations checked after the packaged ones.
const KNOWN_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin"];

/// One way of finding the encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// A path given in configuration or on the command line.
    Explicit(PathBuf),
    /// A path read from an environment variable.
    Environment(String),
    /// `<dir>/<binary>` for a packaged or known install directory.
    Directory(PathBuf),
    /// Search `PATH`.
    SearchPath,
}

impl ResolveStrategy {
    fn try_resolve(&self, binary: &str) -> Result<PathBuf, String> {
        match self {
            ResolveStrategy::Explicit(path) => check_executable(path),
            ResolveStrategy::Environment(var) => match std::env::var_os(var) {
                Some(value) if !value.is_empty() => check_executable(Path::new(&value))
                    .map_err(|reason| format!("${var} -> {reason}")),
                _ => Err(format!("${var}: not set")),
            },
            ResolveStrategy::Directory(dir) => check_executable(&dir.join(exe_name(binary))),
            ResolveStrategy::SearchPath => {
                which::which(binary).map_err(|e| format!("{binary} on PATH: {e}"))
            }
        }
    }
}

/// Ordered encoder lookup.
#[derive(Debug, Clone)]
pub struct EncoderResolver {
    binary: String,
    strategies: Vec<ResolveStrategy>,
}

impl EncoderResolver {
    pub fn new(binary: impl Into<String>, strategies: Vec<ResolveStrategy>) -> Self {
        Self {
            binary: binary.into(),
            strategies,
        }
    }

    /// Resolve against a fixed candidate list only.
    pub fn from_candidates(candidates: impl IntoIterator<Item = PathBuf>) -> Self {
        Self::new(
            ENCODER_BINARY,
            candidates
                .into_iter()
                .map(ResolveStrategy::Explicit)
                .collect(),
        )
    }

    /// The standard ffmpeg search: configured path, environment override,
    /// packaged next to the executable, known install directories, `PATH`.
    pub fn ffmpeg(configured: Option<&Path>) -> Self {
        let mut strategies = Vec::new();
        if let Some(path) = configured {
            strategies.push(ResolveStrategy::Explicit(path.to_path_buf()));
        }
        strategies.push(ResolveStrategy::Environment(ENCODER_ENV.to_string()));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            strategies.push(ResolveStrategy::Directory(exe_dir.join("resources")));
            strategies.push(ResolveStrategy::Directory(exe_dir));
        }
        strategies.extend(
            KNOWN_DIRS
                .iter()
                .map(|dir| ResolveStrategy::Directory(PathBuf::from(dir))),
        );
        strategies.push(ResolveStrategy::SearchPath);
        Self::new(ENCODER_BINARY, strategies)
    }

    pub fn strategies(&self) -> &[ResolveStrategy] {
        &self.strategies
    }

    /// First strategy producing an existing executable.
    pub fn resolve(&self) -> GifcapResult<PathBuf> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.try_resolve(&self.binary) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), ?strategy, "Resolved encoder");
                    return Ok(path);
                }
                Err(reason) => attempts.push(reason),
            }
        }
        tracing::warn!(binary = %self.binary, ?attempts, "Encoder not found");
        Err(GifcapError::EncoderNotFound { attempts })
    }
}

fn exe_name(binary: &str) -> String {
    if cfg!(windows) {
        format!("{binary}.exe")
    } else {
        binary.to_string()
    }
}

fn check_executable(path: &Path) -> Result<PathBuf, String> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return Err(format!("{}: missing", path.display())),
    };
    if !metadata.is_file() {
        return Err(format!("{}: not a file", path.display()));
    }
    if !is_executable(&metadata) {
        return Err(format!("{}: not executable", path.display()));
    }
    Ok(path.to_path_buf())
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_executable(path: &Path) {
        std::fs::write(path, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn only_third_candidate_exists() {
        let dir = tempfile::tempdir().unwrap();
        let candidates = vec![
            dir.path().join("a/ffmpeg"),
            dir.path().join("b/ffmpeg"),
            dir.path().join("ffmpeg"),
        ];
        make_executable(&candidates[2]);

        let resolved = EncoderResolver::from_candidates(candidates.clone())
            .resolve()
            .unwrap();
        assert_eq!(resolved, candidates[2]);
    }

    #[test]
    fn no_candidates_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = EncoderResolver::from_candidates(vec![
            dir.path().join("one"),
            dir.path().join("two"),
        ])
        .resolve()
        .unwrap_err();

        match err {
            GifcapError::EncoderNotFound { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].ends_with("one: missing"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain");
        std::fs::write(&plain, "").unwrap();
        let exec = dir.path().join("exec");
        make_executable(&exec);

        let resolved = EncoderResolver::from_candidates(vec![plain, exec.clone()])
            .resolve()
            .unwrap();
        assert_eq!(resolved, exec);
    }

    #[test]
    fn directory_strategy_joins_binary_name() {
        let dir = tempfile::tempdir().unwrap();
        make_executable(&dir.path().join(exe_name("ffmpeg")));

        let resolver = EncoderResolver::new(
            "ffmpeg",
            vec![
                ResolveStrategy::Directory(dir.path().join("resources")),
                ResolveStrategy::Directory(dir.path().to_path_buf()),
            ],
        );
        assert_eq!(
            resolver.resolve().unwrap(),
            dir.path().join(exe_name("ffmpeg"))
        );
    }

    #[test]
    fn standard_search_starts_with_configured_path() {
        let resolver = EncoderResolver::ffmpeg(Some(Path::new("/opt/custom/ffmpeg")));
        assert_eq!(
            resolver.strategies()[0],
            ResolveStrategy::Explicit(PathBuf::from("/opt/custom/ffmpeg"))
        );
        assert_eq!(
            resolver.strategies()[1],
            ResolveStrategy::Environment(ENCODER_ENV.to_string())
        );
        assert_eq!(resolver.strategies().last(), Some(&ResolveStrategy::SearchPath));
    }
}
