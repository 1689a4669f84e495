/// Progress reporting for long-running operations (mixing, verification, decryption).
///
/// Implementations must be shareable across worker threads; `advance` is called
/// concurrently from the pool.
pub trait Teller: Sync {
    /// A new task with `total` steps begins
    fn task(&self, description: &str, total: usize);

    /// `steps` more steps of the current task are done
    fn advance(&self, steps: usize);

    /// The current task is complete
    fn finish(&self);
}

/// A teller that reports nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTeller;

impl Teller for SilentTeller {
    fn task(&self, _description: &str, _total: usize) {}
    fn advance(&self, _steps: usize) {}
    fn finish(&self) {}
}
