/// Per-message processing outcome: a sum type instead of letting
/// parse/encode errors propagate past the consumer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed successfully; commit the offset.
    Ok,
    /// Poison message (parse/encode failure); logged already, commit the
    /// offset so it is not retried indefinitely.
    Skipped,
    /// Transient failure; leave uncommitted so MB redelivers.
    Retryable,
}
