use uuid::Uuid;

/// Generate an identifier for a record created on this client.
///
/// UUID v4, so ids minted offline on two devices do not collide.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}
