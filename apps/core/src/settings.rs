pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

pub fn validate_refresh_interval(seconds: u64) -> Result<(), String> {
    if seconds <= MAX_REFRESH_INTERVAL_SECS {
        Ok(())
    } else {
        Err(format!(
            "Auto refresh must be between 0 and {MAX_REFRESH_INTERVAL_SECS} seconds."
        ))
    }
}

pub fn validate_page_size(value: usize) -> Result<(), String> {
    if (1..=100).contains(&value) {
        Ok(())
    } else {
        Err("Suggestion page size must be between 1 and 100.".to_string())
    }
}

pub fn validate_worker_threads(value: usize) -> Result<(), String> {
    if (1..=32).contains(&value) {
        Ok(())
    } else {
        Err("Worker threads must be between 1 and 32.".to_string())
    }
}

pub fn refresh_interval_label(seconds: u64) -> String {
    if seconds == 0 {
        "off".to_string()
    } else {
        format!("{seconds}s")
    }
}
