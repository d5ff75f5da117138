use std::time::{SystemTime, UNIX_EPOCH};

pub fn unix_now_millis() -> anyhow::Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)?)
}

/// First `max_chars` characters of `value`, never splitting a character.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

pub trait PoisonedLockExt<T> {
    #[track_caller]
    fn ensure_lock(&self) -> std::sync::MutexGuard<'_, T>;
}

impl<T> PoisonedLockExt<T> for std::sync::Mutex<T> {
    #[track_caller]
    fn ensure_lock(&self) -> std::sync::MutexGuard<'_, T> {
        self.lock().expect("The Mutex should never be poisoned")
    }
}
