use uuid::Uuid;

/// Generates a message id: a random UUID, unique enough across a single
/// station's lifetime without coordination.
pub fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}
