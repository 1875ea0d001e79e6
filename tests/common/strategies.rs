use proptest::prelude::*;

/// Activation kind names other than the two the sample handles
pub fn other_activation_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("file".to_string()),
        Just("protocol".to_string()),
        Just("startup_task".to_string()),
        Just("toast_notification".to_string()),
        "[a-z_]{1,24}",
    ]
    .prop_filter("launch and push are handled kinds", |name| {
        name != "launch" && name != "push"
    })
}

/// Raw payload bytes, including invalid UTF-8
pub fn payload_bytes_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

/// Printable payloads as a backend would typically send them
pub fn text_payload_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:;!?{}\"]{0,128}"
}

/// Retry counts reported by the service before it completes
pub fn retry_counts_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..10, 0..6)
}
