use crate::core::{NaturalKey, NormalizedRecord};
use crate::{AppError, AppState};

/// Select the record with `key` in the current collection.
pub fn select_event(state: &AppState, key: NaturalKey) -> Result<NormalizedRecord, AppError> {
    state.engine.select_by_key(&key).ok_or_else(|| {
        AppError::NotFound(format!(
            "event {} {} {} (M{})",
            key.location, key.date, key.time, key.magnitude
        ))
    })
}

pub fn clear_selection(state: &AppState) -> bool {
    state.selection.clear()
}

pub fn get_selection(state: &AppState) -> Option<NormalizedRecord> {
    state.selection.current()
}
