/// Microphone permission check and prompt.
pub trait PermissionGate: Send + Sync {
    fn has_capture_permission(&self) -> bool;

    /// Ask the user for access. Returns whether it was granted.
    fn request_capture_permission(&self) -> bool;
}
