use crate::{
    backend::{StorageBackend, StorageError},
    storage::Storage,
    types::{BookingDetails, TimeSlot},
};
use tracing::{info, warn};

/// Books `details.slot_id` for the candidate.
///
/// The slot collection is re-read from storage rather than trusted from the
/// caller, so a slot booked since the caller last looked is refused.
/// Returns `Ok(false)` without writing anything when the slot is unknown or
/// already booked.
pub fn book<B: StorageBackend>(
    storage: &Storage<B>,
    details: &BookingDetails,
) -> Result<bool, StorageError> {
    book_if(storage, details, |_| true)
}

/// Like [`book`], but also refuses slots hidden from candidates.
pub fn book_active<B: StorageBackend>(
    storage: &Storage<B>,
    details: &BookingDetails,
) -> Result<bool, StorageError> {
    book_if(storage, details, |slot| slot.is_active)
}

fn book_if<B: StorageBackend>(
    storage: &Storage<B>,
    details: &BookingDetails,
    bookable: impl Fn(&TimeSlot) -> bool,
) -> Result<bool, StorageError> {
    let locked = storage.lock();
    let mut slots = locked.load_slots();

    let Some(slot) = slots.iter_mut().find(|slot| slot.id == details.slot_id) else {
        warn!(slot_id = %details.slot_id, "Timeslot does not exist and can't be booked");
        return Ok(false);
    };
    if slot.is_booked {
        warn!(slot_id = %details.slot_id, "Timeslot was already booked");
        return Ok(false);
    }
    if !bookable(slot) {
        warn!(slot_id = %details.slot_id, "Timeslot is not open for booking");
        return Ok(false);
    }

    slot.book(details);
    locked.save_slots(&slots)?;
    info!(slot_id = %details.slot_id, "Timeslot booked");
    Ok(true)
}
