//! Test data builders with fixed, readable defaults.

use chrono::{DateTime, Utc};
use listener_domain::{DispatchLocation, DispatchRecord};

use crate::helpers::ts;

/// Builder for `DispatchRecord`. Defaults to an EMS call at `ts(0)`.
pub struct DispatchRecordBuilder {
    record: DispatchRecord,
}

impl DispatchRecordBuilder {
    pub fn new(dispatch_id: &str) -> Self {
        Self {
            record: DispatchRecord {
                dispatch_id: dispatch_id.to_string(),
                occurred_at: ts(0),
                dispatch_type: "EMS".to_string(),
                location: DispatchLocation::default(),
                payload: serde_json::json!({ "id": dispatch_id }),
            },
        }
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.record.occurred_at = occurred_at;
        self
    }

    pub fn with_type(mut self, dispatch_type: &str) -> Self {
        self.record.dispatch_type = dispatch_type.to_string();
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.record.location.address = Some(address.to_string());
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.record.location.latitude = Some(latitude);
        self.record.location.longitude = Some(longitude);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.record.payload = payload;
        self
    }

    pub fn build(self) -> DispatchRecord {
        self.record
    }
}

/// Shorthand for a dispatch occurring at `at`.
pub fn dispatch(dispatch_id: &str, at: DateTime<Utc>) -> DispatchRecord {
    DispatchRecordBuilder::new(dispatch_id)
        .with_occurred_at(at)
        .build()
}
