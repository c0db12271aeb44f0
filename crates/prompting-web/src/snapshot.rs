//! Serializable view of a hosted panel, sent to clients on connect.

use std::sync::{Arc, Mutex};

use prompting::logging::LogLine;
use prompting::panel::{PanelSnapshot, PromptPanel};
use serde::Serialize;

/// Log lines kept in a snapshot.
pub const SNAPSHOT_MAX_LOGS: usize = 200;

/// The latest published state, shared between the panel task and handlers.
pub type SharedSnapshot = Arc<Mutex<WebSnapshot>>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct WebSnapshot {
    /// `None` until the panel task publishes for the first time.
    pub panel: Option<PanelSnapshot>,
    /// Most recent log lines, oldest first.
    pub logs: Vec<LogLine>,
    pub submits: u64,
}

impl WebSnapshot {
    pub fn from_panel(panel: &PromptPanel, logs: &[LogLine], submits: u64) -> Self {
        let start = logs.len().saturating_sub(SNAPSHOT_MAX_LOGS);
        Self {
            panel: Some(panel.snapshot()),
            logs: logs[start..].to_vec(),
            submits,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Read the latest snapshot, tolerating a poisoned lock.
pub fn read(shared: &SharedSnapshot) -> WebSnapshot {
    shared.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompting::config::PanelConfig;
    use prompting::logging::LogLevel;
    use prompting::parameters::{Parameter, ParameterDefinition, ParameterGroup};

    fn line(n: usize) -> LogLine {
        LogLine {
            time: "12:00:00".into(),
            level: LogLevel::Info,
            target: "prompting".into(),
            message: format!("line {n}"),
        }
    }

    fn panel() -> PromptPanel {
        let definition = ParameterDefinition::new().with_group(
            ParameterGroup::new("G1").with_parameter(Parameter::new("p1").with_choices(&["a"], &["a"])),
        );
        let mut panel =
            PromptPanel::new("prompt", definition, PanelConfig::default().with_guid("w")).unwrap();
        panel.init(true);
        panel.settle();
        panel
    }

    #[test]
    fn default_snapshot_has_no_panel() {
        let json = WebSnapshot::default().to_json();
        assert!(json["panel"].is_null());
        assert_eq!(json["submits"], 0);
    }

    #[test]
    fn logs_are_capped_to_the_most_recent() {
        let logs: Vec<LogLine> = (0..SNAPSHOT_MAX_LOGS + 50).map(line).collect();
        let snap = WebSnapshot::from_panel(&panel(), &logs, 2);
        assert_eq!(snap.logs.len(), SNAPSHOT_MAX_LOGS);
        assert_eq!(snap.logs[0].message, "line 50");
        assert_eq!(snap.submits, 2);
    }

    #[test]
    fn panel_state_serializes() {
        let json = WebSnapshot::from_panel(&panel(), &[], 0).to_json();
        assert_eq!(json["panel"]["guid"], "w");
        assert_eq!(json["panel"]["state"], "initialized");
        assert_eq!(json["panel"]["values"]["p1"], "a");
        assert!(json["panel"]["tree"].is_object());
    }

    #[test]
    fn read_returns_a_copy() {
        let shared: SharedSnapshot = Arc::default();
        shared.lock().unwrap().submits = 3;
        assert_eq!(read(&shared).submits, 3);
    }
}
