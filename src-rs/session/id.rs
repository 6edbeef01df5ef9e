use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

fn random_suffix(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}

fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// `sess_<unix-secs>_<8 alnum>`; sortable by creation time.
pub fn generate_session_id() -> String {
    format!("sess_{}_{}", timestamp_secs(), random_suffix(8))
}

/// `msg_<unix-millis>_<10 alnum>`.
pub fn generate_message_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("msg_{}_{}", millis, random_suffix(10))
}
