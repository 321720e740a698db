//! Visit model

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Record, RecordId};
use crate::store::Direction;

/// One scheduled visit to a client's pet, with morning and evening checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    #[serde(default)]
    pub id: RecordId,
    /// Owning client; not checked for referential integrity
    pub client_id: RecordId,
    /// Visit day, stored as `YYYY-MM-DD` so it sorts lexicographically
    pub dt: NaiveDate,
    #[serde(default)]
    pub dt_date: u32,
    #[serde(default)]
    pub dt_month: u32,
    #[serde(default)]
    pub dt_year: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub liquid_intake: String,
    #[serde(default)]
    pub visitor_am: Option<String>,
    #[serde(default)]
    pub visitor_pm: Option<String>,
    #[serde(default)]
    pub notes_am: Option<String>,
    #[serde(default)]
    pub notes_pm: Option<String>,
    #[serde(default)]
    pub visual_check_am: Option<String>,
    #[serde(default)]
    pub visual_check_pm: Option<String>,
    #[serde(default)]
    pub food_intake_am: Option<String>,
    #[serde(default)]
    pub food_intake_pm: Option<String>,
    #[serde(default)]
    pub medication_am: Option<String>,
    #[serde(default)]
    pub medication_pm: Option<String>,
    #[serde(default)]
    pub security_check_am: Option<String>,
    #[serde(default)]
    pub security_check_pm: Option<String>,
}

impl Visit {
    /// Field holding the owning client's id
    pub const CLIENT_ID_FIELD: &'static str = "clientId";

    /// Create an unsaved visit for `client_id` on `dt`
    pub fn new(client_id: RecordId, dt: NaiveDate) -> Self {
        Self {
            id: RecordId::default(),
            client_id,
            dt,
            dt_date: dt.day(),
            dt_month: dt.month(),
            dt_year: dt.year(),
            name: String::new(),
            liquid_intake: String::new(),
            visitor_am: None,
            visitor_pm: None,
            notes_am: None,
            notes_pm: None,
            visual_check_am: None,
            visual_check_pm: None,
            food_intake_am: None,
            food_intake_pm: None,
            medication_am: None,
            medication_pm: None,
            security_check_am: None,
            security_check_pm: None,
        }
    }

    /// Move the visit to another day, keeping the derived date parts in step
    #[must_use]
    pub fn with_date(mut self, dt: NaiveDate) -> Self {
        self.dt = dt;
        self.dt_date = dt.day();
        self.dt_month = dt.month();
        self.dt_year = dt.year();
        self
    }
}

impl Record for Visit {
    const COLLECTION: &'static str = "visits";
    const SORT_FIELD: &'static str = "dt";
    const SORT_DIRECTION: Direction = Direction::Descending;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn with_id(self, id: RecordId) -> Self {
        Self { id, ..self }
    }
}
