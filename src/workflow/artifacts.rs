use std::path::Path;

use serde::Serialize;

const PREVIEW_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ArtifactStatus {
    Present { preview: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub name: String,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactReport {
    pub fn is_present(&self) -> bool {
        matches!(self.status, ArtifactStatus::Present { .. })
    }

    pub fn render(&self) -> String {
        match &self.status {
            ArtifactStatus::Present { preview } if preview.is_empty() => format!("✅ {}", self.name),
            ArtifactStatus::Present { preview } => format!("✅ {}\n      Preview: {preview}...", self.name),
            ArtifactStatus::Missing => format!("❌ {} (not created)", self.name),
        }
    }
}

/// Check each expected file under `dir`. A file that exists but cannot be
/// read as text still counts as present, with an empty preview.
pub async fn inspect(dir: &Path, names: &[String]) -> Vec<ArtifactReport> {
    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(name);
        let status = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let preview = text.lines().take(PREVIEW_LINES).collect::<Vec<_>>().join("\n");
                ArtifactStatus::Present {
                    preview: preview.trim().to_string(),
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ArtifactStatus::Missing,
            Err(e) => {
                tracing::warn!(artifact = %path.display(), error = %e, "artifact unreadable");
                if path.exists() {
                    ArtifactStatus::Present { preview: String::new() }
                } else {
                    ArtifactStatus::Missing
                }
            }
        };
        reports.push(ArtifactReport {
            name: name.clone(),
            status,
        });
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_present_with_preview_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("project_plan.txt"), "Phase 1\nPhase 2\nPhase 3\nPhase 4\n").unwrap();
        let names = vec!["project_plan.txt".to_string(), "test_report.txt".to_string()];

        let reports = inspect(dir.path(), &names).await;
        assert_eq!(
            reports[0].status,
            ArtifactStatus::Present {
                preview: "Phase 1\nPhase 2\nPhase 3".into()
            }
        );
        assert!(reports[0].render().starts_with("✅ project_plan.txt"));
        assert!(!reports[1].is_present());
        assert_eq!(reports[1].render(), "❌ test_report.txt (not created)");
    }

    #[test]
    fn serializes_with_status_tag() {
        let r = ArtifactReport {
            name: "a.txt".into(),
            status: ArtifactStatus::Missing,
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, serde_json::json!({"name": "a.txt", "status": "missing"}));
    }
}
