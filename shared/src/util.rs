/// Current UTC timestamp (milliseconds)
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh UUID v4 string, used for every engine-generated identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
