use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::vo::Checkpoint;

/// Control intents recorded for one job code or one group name.
///
/// Flags are independent: a stop may arrive while a pause is in effect, and a resume
/// only withdraws the pause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlState {
    pub pause_requested: bool,
    pub stop_requested: bool,
    pub stop_reason: Option<String>,
    /// `Some(strategy)` once a cancel was requested.
    pub cancel_strategy: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ControlState {
    pub fn request_pause(&mut self) {
        self.pause_requested = true;
        self.touch();
    }

    pub fn request_resume(&mut self) {
        self.pause_requested = false;
        self.touch();
    }

    pub fn request_stop(&mut self, reason: &str) {
        self.stop_requested = true;
        self.stop_reason = Some(reason.to_owned());
        self.touch();
    }

    pub fn request_cancel(&mut self, strategy: &str) {
        self.cancel_strategy = Some(strategy.to_owned());
        self.touch();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_strategy.is_some()
    }

    pub fn is_idle(&self) -> bool {
        !self.pause_requested && !self.stop_requested && self.cancel_strategy.is_none()
    }

    /// Cancel wins over stop, stop over pause.
    pub fn checkpoint(&self) -> Checkpoint {
        if let Some(strategy) = &self.cancel_strategy {
            Checkpoint::Cancel(strategy.to_owned())
        } else if self.stop_requested {
            Checkpoint::Stop
        } else if self.pause_requested {
            Checkpoint::Pause
        } else {
            Checkpoint::Continue
        }
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
