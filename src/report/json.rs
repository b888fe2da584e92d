//! JSON report file

use std::path::Path;

use crate::common::{Error, Result};

use super::Report;

/// Write `report` as pretty JSON, creating parent directories
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| Error::FileWrite {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::FaultKind;
    use crate::report::{Fault, Phase, ScenarioReport, ScenarioStatus};

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/report.json");
        let report = Report {
            suite: "smoke".into(),
            scenarios: vec![ScenarioReport {
                name: "nav".into(),
                status: ScenarioStatus::Faulted,
                outcomes: vec![],
                fault: Some(Fault {
                    kind: FaultKind::NotInteractable,
                    code: FaultKind::NotInteractable.code().into(),
                    message: "no elements matched".into(),
                    phase: Some(Phase::Body),
                    step_index: Some(2),
                }),
                elapsed_ms: 12,
            }],
            elapsed_ms: 12,
        };

        write_report(&report, &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["scenarios"][0]["fault"]["code"], "TARGET_NOT_INTERACTABLE");
        assert_eq!(value["scenarios"][0]["fault"]["kind"], "not_interactable");

        let back: Report = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_write_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the report file should go
        let path = dir.path().join("report.json");
        std::fs::create_dir(&path).unwrap();
        let report = Report {
            suite: "smoke".into(),
            scenarios: vec![],
            elapsed_ms: 0,
        };

        let err = write_report(&report, &path).unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }), "{:?}", err);
        assert!(err.to_string().starts_with("Failed to write file"), "{}", err);
    }
}
