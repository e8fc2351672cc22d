use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_ALERT_THRESHOLD: f64 = 5.0;
pub const DEFAULT_CALCULATOR_TOLERANCE: f64 = 5.0;

// Per-user preferences. Both values are percentage points.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSettings {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub alert_threshold: f64,
    pub calculator_tolerance: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserSettings {
    pub alert_threshold: Option<f64>,
    pub calculator_tolerance: Option<f64>,
}

impl UserSettings {
    pub(crate) fn defaults(user_id: uuid::Uuid) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            user_id,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            calculator_tolerance: DEFAULT_CALCULATOR_TOLERANCE,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn apply(&mut self, changes: &UpdateUserSettings) {
        if let Some(threshold) = changes.alert_threshold {
            self.alert_threshold = threshold;
        }
        if let Some(tolerance) = changes.calculator_tolerance {
            self.calculator_tolerance = tolerance;
        }
        self.updated_at = chrono::Utc::now();
    }
}

fn check_percentage(field: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(format!("{} must be between 0 and 100", field)),
        _ => Ok(()),
    }
}

impl UpdateUserSettings {
    pub fn is_empty(&self) -> bool {
        self.alert_threshold.is_none() && self.calculator_tolerance.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("No settings to update".into());
        }
        check_percentage("alert_threshold", self.alert_threshold)?;
        check_percentage("calculator_tolerance", self.calculator_tolerance)
    }
}
