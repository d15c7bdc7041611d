//! Setting value validation.

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_PORT" => validate_int_range(value, 1, 65535)?,
        // 1 KiB to 50 MiB
        "MAX_LOGO_BYTES" => validate_int_range(value, 1024, 50 * 1024 * 1024)?,
        "TEMP_RETENTION_HOURS" => validate_int_range(value, 1, 24 * 30)?,
        "SWEEP_INTERVAL_SECS" => validate_int_range(value, 10, 86_400)?,
        "APP_ENV" => {
            if !["development", "production", "test"].contains(&value) {
                return Err("must be development, production, or test".into());
            }
        }
        "QR_DATA_DIR" => {
            if value.trim().is_empty() {
                return Err("must not be empty".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
