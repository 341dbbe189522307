//! System diagnostics and dependency checking.
//!
//! Verifies that ffmpeg is installed and that provider credentials and the
//! scratch directory are usable before a long narration run starts.

use crate::config::Config;
use crate::error::NarratorError;
use crate::exec::CommandExecutor;
use crate::narration::types::{AudioEncoding, OutputFormat};
use crate::tts::GoogleAuth;
use std::path::Path;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Found and usable; carries a short detail such as a version line
    Ok(String),
    /// Tool or setting is missing
    NotFound,
    /// Present but with issues
    Warning(String),
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckResult::Ok(_))
    }
}

/// Run `ffmpeg -version` and report the version line.
pub async fn check_ffmpeg(executor: &dyn CommandExecutor, ffmpeg: &str) -> CheckResult {
    match executor.execute(ffmpeg, &["-version".to_string()]).await {
        Ok(stdout) => CheckResult::Ok(stdout.lines().next().unwrap_or("").trim().to_string()),
        Err(NarratorError::ToolNotFound { .. }) => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("'{ffmpeg} -version' failed: {e}")),
    }
}

/// Check that ffmpeg can encode Opus, needed when Opus output is produced
/// from segments that are not already Ogg Opus.
pub async fn check_libopus(executor: &dyn CommandExecutor, ffmpeg: &str) -> CheckResult {
    let args = ["-hide_banner".to_string(), "-encoders".to_string()];
    match executor.execute(ffmpeg, &args).await {
        Ok(stdout) if stdout.contains("libopus") => CheckResult::Ok("libopus encoder available".to_string()),
        Ok(_) => CheckResult::Warning("ffmpeg was built without the libopus encoder".to_string()),
        Err(NarratorError::ToolNotFound { .. }) => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Could not list encoders: {e}")),
    }
}

/// Check that some form of provider credentials is configured.
pub fn check_credentials(config: &Config) -> CheckResult {
    match config.google_auth() {
        None => CheckResult::NotFound,
        Some(GoogleAuth::ApiKey(_)) => CheckResult::Ok("API key".to_string()),
        Some(GoogleAuth::AccessToken(_)) => CheckResult::Ok("OAuth access token".to_string()),
    }
}

/// Check that the scratch root exists (or can be created) and is writable.
pub fn check_scratch_dir(root: &Path) -> CheckResult {
    if let Err(e) = std::fs::create_dir_all(root) {
        return CheckResult::Warning(format!("Cannot create {}: {}", root.display(), e));
    }
    match tempfile::tempfile_in(root) {
        Ok(_) => CheckResult::Ok(root.display().to_string()),
        Err(e) => CheckResult::Warning(format!("{} is not writable: {}", root.display(), e)),
    }
}

/// Run all dependency checks and print results.
///
/// Returns `true` when nothing required is missing.
pub async fn check_dependencies(config: &Config, executor: &dyn CommandExecutor) -> bool {
    println!("Checking narrator dependencies...\n");
    let mut ready = true;

    print!("ffmpeg ({}): ", config.output.ffmpeg);
    match check_ffmpeg(executor, &config.output.ffmpeg).await {
        CheckResult::Ok(version) => println!("✓ OK ({version})"),
        CheckResult::NotFound => {
            ready = false;
            println!("✗ NOT FOUND");
            println!("  Install: sudo apt install ffmpeg  (Debian/Ubuntu)");
            println!("           sudo pacman -S ffmpeg    (Arch)");
            println!("  Or point output.ffmpeg / NARRATOR_FFMPEG at the binary");
        }
        CheckResult::Warning(msg) => {
            ready = false;
            println!("⚠ WARNING: {msg}");
        }
    }

    if config.output.format == OutputFormat::Opus && config.synthesis.encoding != AudioEncoding::OggOpus {
        print!("libopus encoder: ");
        match check_libopus(executor, &config.output.ffmpeg).await {
            CheckResult::Ok(detail) => println!("✓ OK ({detail})"),
            CheckResult::NotFound => println!("- skipped (ffmpeg missing)"),
            CheckResult::Warning(msg) => {
                ready = false;
                println!("⚠ WARNING: {msg}");
            }
        }
    }

    print!("Provider credentials: ");
    match check_credentials(config) {
        CheckResult::Ok(kind) => println!("✓ OK ({kind})"),
        CheckResult::NotFound | CheckResult::Warning(_) => {
            ready = false;
            println!("✗ NOT CONFIGURED");
            println!("  Set NARRATOR_API_KEY (or GOOGLE_API_KEY), or synthesis.api_key in the config");
            println!("  Or set NARRATOR_ACCESS_TOKEN, e.g. from: gcloud auth print-access-token");
        }
    }

    print!("Scratch directory: ");
    match check_scratch_dir(&config.scratch_root()) {
        CheckResult::Ok(path) => println!("✓ OK ({path})"),
        CheckResult::NotFound | CheckResult::Warning(_) => {
            ready = false;
            println!("✗ NOT WRITABLE");
        }
    }

    println!();
    if ready {
        println!("✓ Ready to narrate.");
    } else {
        println!("⚠ Fix the issues above before running 'narrator narrate'.");
    }
    ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::tests::MockCommandExecutor;

    #[tokio::test]
    async fn ffmpeg_version_line_is_reported() {
        let mock = MockCommandExecutor::new()
            .with_response("ffmpeg version 6.1.1 Copyright (c) 2000-2023\nbuilt with gcc\n");

        let result = check_ffmpeg(&mock, "ffmpeg").await;

        assert_eq!(
            result,
            CheckResult::Ok("ffmpeg version 6.1.1 Copyright (c) 2000-2023".to_string())
        );
        assert_eq!(mock.calls()[0], ("ffmpeg".to_string(), vec!["-version".to_string()]));
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_not_found() {
        let mock = MockCommandExecutor::new().with_error(NarratorError::ToolNotFound {
            tool: "ffmpeg".to_string(),
        });
        assert_eq!(check_ffmpeg(&mock, "ffmpeg").await, CheckResult::NotFound);
    }

    #[tokio::test]
    async fn failing_ffmpeg_is_a_warning() {
        let mock = MockCommandExecutor::new().with_error(NarratorError::CommandFailed {
            tool: "ffmpeg".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "broken install".to_string(),
        });
        assert!(matches!(
            check_ffmpeg(&mock, "ffmpeg").await,
            CheckResult::Warning(_)
        ));
    }

    #[tokio::test]
    async fn libopus_detection() {
        let with = MockCommandExecutor::new().with_response(" A....D libopus  libopus Opus\n");
        let without = MockCommandExecutor::new().with_response(" A....D flac  FLAC\n");

        assert!(check_libopus(&with, "ffmpeg").await.is_ok());
        assert!(matches!(
            check_libopus(&without, "ffmpeg").await,
            CheckResult::Warning(_)
        ));
    }

    #[test]
    fn credentials_check() {
        let mut config = Config::default();
        assert_eq!(check_credentials(&config), CheckResult::NotFound);

        config.synthesis.access_token = Some("t".to_string());
        assert_eq!(
            check_credentials(&config),
            CheckResult::Ok("OAuth access token".to_string())
        );

        config.synthesis.api_key = Some("k".to_string());
        assert!(check_credentials(&config).is_ok());
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let mut config = Config::default();
        config.synthesis.api_key = Some("  ".to_string());
        assert_eq!(check_credentials(&config), CheckResult::NotFound);
    }

    #[test]
    fn scratch_dir_is_created_and_writable() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("scratch");

        assert!(check_scratch_dir(&nested).is_ok());
        assert!(nested.is_dir());
    }

    #[tokio::test]
    async fn check_dependencies_reports_missing_credentials() {
        let scratch = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.scratch_dir = Some(scratch.path().to_path_buf());
        let mock = MockCommandExecutor::new().with_response("ffmpeg version 6.1\n");

        assert!(!check_dependencies(&config, &mock).await);

        config.synthesis.api_key = Some("k".to_string());
        let mock = MockCommandExecutor::new().with_response("ffmpeg version 6.1\n");
        assert!(check_dependencies(&config, &mock).await);
    }
}
