use std::path::Path;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RESULTS_FILENAME: &str = "generation_results.json";
pub const DEFAULT_BUSINESS_NAME: &str = "Business";
pub const DEFAULT_DESCRIPTION: &str = "Professional business image";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_business_name")]
    pub business_name: String,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            business_name: default_business_name(),
        }
    }

    pub fn for_business(description: impl Into<String>, business_name: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            business_name: business_name.into(),
        }
    }
}

/// Outcome of one generation attempt.
///
/// `business_name` is only reported for real results and `mock` only for
/// placeholder ones, so the serialized shape matches what downstream tooling
/// already reads from `generation_results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    pub image_url: String,
    pub local_path: String,
    pub filename: String,
    pub description: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
    pub generated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Generated,
    MockGenerated,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Generated => "generated",
            ArtifactKind::MockGenerated => "mock_generated",
        }
    }
}

pub fn image_filename(kind: ArtifactKind, stamp_millis: i64, random_id: &str) -> String {
    format!("{}_{}_{}.jpg", kind.prefix(), stamp_millis, random_id)
}

pub fn count_successful(results: &[GenerationResult]) -> usize {
    results.iter().filter(|result| result.success).count()
}

/// Overwrites `path` with the pretty-printed result list.
pub fn write_results(path: &Path, results: &[GenerationResult]) -> anyhow::Result<()> {
    let payload = serde_json::to_string_pretty(results)?;
    std::fs::write(path, payload)
        .with_context(|| format!("failed to write results to {}", path.display()))?;
    Ok(())
}

pub fn read_results(path: &Path) -> anyhow::Result<Vec<GenerationResult>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let results = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a results file", path.display()))?;
    Ok(results)
}

pub fn read_requests(path: &Path) -> anyhow::Result<Vec<GenerationRequest>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let requests = serde_json::from_str(&raw)
        .with_context(|| format!("{} must hold a JSON array of requests", path.display()))?;
    Ok(requests)
}

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_business_name() -> String {
    DEFAULT_BUSINESS_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn real_result() -> GenerationResult {
        GenerationResult {
            success: true,
            image_url: "https://images.example/abc.png".to_string(),
            local_path: "generated_images/generated_1700000000000_ab12cd34.jpg".to_string(),
            filename: "generated_1700000000000_ab12cd34.jpg".to_string(),
            description: "Modern coffee shop interior".to_string(),
            prompt: "Create a professional image".to_string(),
            business_name: Some("Urban Coffee Co".to_string()),
            mock: false,
            generated_at: "2026-02-19T00:00:00.000000+00:00".to_string(),
        }
    }

    fn mock_result() -> GenerationResult {
        GenerationResult {
            success: true,
            image_url: "https://picsum.photos/1024/1024?random=1700000000001".to_string(),
            local_path: "generated_images/mock_generated_1700000000001_zz99yy88.jpg".to_string(),
            filename: "mock_generated_1700000000001_zz99yy88.jpg".to_string(),
            description: "Café crème, très élégant".to_string(),
            prompt: "Mock generation for: Café crème, très élégant".to_string(),
            business_name: None,
            mock: true,
            generated_at: "2026-02-19T00:00:01.000000+00:00".to_string(),
        }
    }

    #[test]
    fn real_result_omits_mock_flag() -> anyhow::Result<()> {
        let raw = serde_json::to_string(&real_result())?;
        assert!(raw.starts_with(r#"{"success":true,"image_url":"https://images.example/abc.png","#));
        assert!(raw.contains(r#""business_name":"Urban Coffee Co","generated_at":"#));
        assert!(!raw.contains("\"mock\""));
        Ok(())
    }

    #[test]
    fn mock_result_reports_flag_without_business_name() -> anyhow::Result<()> {
        let value = serde_json::to_value(mock_result())?;
        assert_eq!(value["mock"], json!(true));
        assert!(value.get("business_name").is_none());
        Ok(())
    }

    #[test]
    fn results_round_trip_through_disk() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join(DEFAULT_RESULTS_FILENAME);
        let results = vec![real_result(), mock_result()];

        write_results(&path, &results)?;
        let loaded = read_results(&path)?;
        assert_eq!(loaded, results);

        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.contains("Café crème, très élégant"));
        assert!(raw.contains("\n  {\n    \"success\": true,"));
        Ok(())
    }

    #[test]
    fn write_results_overwrites_existing_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("out.json");
        std::fs::write(&path, "stale content that is not json")?;

        write_results(&path, &[mock_result()])?;
        let parsed: Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn requests_fill_in_defaults() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("requests.json");
        std::fs::write(
            &path,
            r#"[{"description": "Fresh ingredients", "business_name": "Healthy Eats"}, {"description": "Team meeting"}, {}]"#,
        )?;

        let requests = read_requests(&path)?;
        assert_eq!(
            requests,
            vec![
                GenerationRequest::for_business("Fresh ingredients", "Healthy Eats"),
                GenerationRequest::new("Team meeting"),
                GenerationRequest::for_business(DEFAULT_DESCRIPTION, DEFAULT_BUSINESS_NAME),
            ]
        );
        Ok(())
    }

    #[test]
    fn filenames_follow_kind_prefix() {
        assert_eq!(
            image_filename(ArtifactKind::Generated, 1700000000000, "ab12cd34"),
            "generated_1700000000000_ab12cd34.jpg"
        );
        assert_eq!(
            image_filename(ArtifactKind::MockGenerated, 42, "00000000"),
            "mock_generated_42_00000000.jpg"
        );
    }

    #[test]
    fn count_successful_ignores_failures() {
        let mut failed = real_result();
        failed.success = false;
        assert_eq!(count_successful(&[real_result(), failed, mock_result()]), 2);
    }
}
