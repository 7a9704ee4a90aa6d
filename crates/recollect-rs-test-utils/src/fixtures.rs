use recollect_rs_memory::{IdentityState, KeyPair};
use recollect_rs_protocol::Record;
use serde_json::json;

/// Record with a couple of properties, typed and summarised as given.
pub fn sample_record(id: &str, record_type: &str, summary: &str) -> Record {
    Record::new(id, record_type, summary)
        .with_property("source", json!("fixture"))
        .with_property("label", json!(format!("{record_type} {id}")))
}

/// Deterministic key pair derived from a seed label.
pub fn key_pair(seed: &str) -> KeyPair {
    let mut private = b"private:".to_vec();
    private.extend_from_slice(seed.as_bytes());
    let mut public = b"public:".to_vec();
    public.extend_from_slice(seed.as_bytes());
    KeyPair::new(public, private)
}

/// Ready identity for a seed label.
pub fn identity(seed: &str) -> IdentityState {
    IdentityState::Ready(key_pair(seed))
}
