use crate::{
    backend::{StorageBackend, StorageError},
    storage::{Locked, Storage},
    types::{CompanyInfo, TimeSlot},
};
use chrono::{NaiveDate, NaiveTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

lazy_static! {
    static ref DATE_PATTERN: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref TIME_PATTERN: Regex = Regex::new(r"^\d{2}:\d{2}$").unwrap();
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Invalid timeslot: {0}")]
    InvalidSlot(String),

    #[error("Timeslot {0} is booked but has no booker name or email")]
    InconsistentSlot(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSlot {
    #[validate(regex(path = *DATE_PATTERN))]
    pub date: String,
    #[validate(regex(path = *TIME_PATTERN))]
    pub start_time: String,
}

impl NewSlot {
    fn into_slot(self) -> Result<TimeSlot, AdminError> {
        self.validate()
            .map_err(|err| AdminError::InvalidSlot(err.to_string()))?;
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| AdminError::InvalidSlot(format!("{} is not a calendar date", self.date)))?;
        NaiveTime::parse_from_str(&self.start_time, "%H:%M").map_err(|_| {
            AdminError::InvalidSlot(format!("{} is not a time of day", self.start_time))
        })?;

        let id = Uuid::new_v4().to_string();
        Ok(TimeSlot::open(&id, &self.date, &self.start_time, ""))
    }
}

/// The administrator's working copy. Nothing reaches storage before
/// [`AdminDraft::save`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDraft {
    pub company: CompanyInfo,
    pub slots: Vec<TimeSlot>,
}

impl AdminDraft {
    pub fn load<B: StorageBackend>(storage: &Storage<B>) -> Self {
        Self {
            company: storage.load_config(),
            slots: storage.load_slots(),
        }
    }

    /// Loads under an already held lock, for edits that must not lose
    /// bookings made in between.
    pub fn load_locked<B: StorageBackend>(locked: &Locked<'_, B>) -> Self {
        Self {
            company: locked.load_config(),
            slots: locked.load_slots(),
        }
    }

    /// New slots go to the front of the list.
    pub fn add_slot(&mut self, new_slot: NewSlot) -> Result<&TimeSlot, AdminError> {
        let slot = new_slot.into_slot()?;
        self.slots.insert(0, slot);
        Ok(&self.slots[0])
    }

    pub fn remove_slot(&mut self, id: &str) -> bool {
        let before = self.slots.len();
        self.slots.retain(|slot| slot.id != id);
        self.slots.len() != before
    }

    pub fn set_company(&mut self, company: CompanyInfo) {
        self.company = company;
    }

    pub fn booked_slots(&self) -> Vec<&TimeSlot> {
        self.slots.iter().filter(|slot| slot.is_booked).collect()
    }

    /// Overwrites the stored config, then the stored slots. Whatever was
    /// booked since [`AdminDraft::load`] is replaced by this copy.
    pub fn save<B: StorageBackend>(&self, storage: &Storage<B>) -> Result<(), AdminError> {
        self.save_locked(&storage.lock())
    }

    pub fn save_locked<B: StorageBackend>(
        &self,
        locked: &Locked<'_, B>,
    ) -> Result<(), AdminError> {
        if let Some(slot) = self.slots.iter().find(|slot| !slot.is_consistent()) {
            warn!(slot_id = %slot.id, "Refusing to save inconsistent timeslot");
            return Err(AdminError::InconsistentSlot(slot.id.clone()));
        }

        locked.save_config(&self.company)?;
        locked.save_slots(&self.slots)?;
        info!(slots = self.slots.len(), "Saved admin changes");
        Ok(())
    }
}
