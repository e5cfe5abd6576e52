use crate::providers::{AudioSource, FormatDescriptor, ProviderError};
use async_trait::async_trait;
use tokio::process::Command;

/// Audio source backed by the `yt-dlp` command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpSource {
    binary: String,
}

impl YtDlpSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn watch_url(content_id: &str) -> String {
        format!(
            "https://www.youtube.com/watch?v={}",
            urlencoding::encode(content_id)
        )
    }

    async fn run(&self, args: &[&str]) -> Result<String, ProviderError> {
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::ProcessError(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for YtDlpSource {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl AudioSource for YtDlpSource {
    async fn resolve(&self, content_id: &str, format: &str) -> Result<String, ProviderError> {
        let url = Self::watch_url(content_id);
        let stdout = self.run(&["-f", format, "-g", "--no-playlist", &url]).await?;

        stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::NotFound(format!("no URL for format {}", format)))
    }

    async fn list_formats(&self, content_id: &str) -> Result<Vec<FormatDescriptor>, ProviderError> {
        let url = Self::watch_url(content_id);
        let stdout = self.run(&["-F", &url]).await?;
        Ok(parse_format_listing(&stdout))
    }
}

/// Parse `yt-dlp -F` output. Only rows whose first column is a numeric format id are kept.
pub fn parse_format_listing(stdout: &str) -> Vec<FormatDescriptor> {
    stdout
        .lines()
        .filter(|line| line.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .filter_map(|line| {
            let id = line.split_whitespace().next()?;
            Some(FormatDescriptor {
                id: id.to_string(),
                audio_only: line.contains("audio only"),
                description: line.trim().to_string(),
            })
        })
        .collect()
}
