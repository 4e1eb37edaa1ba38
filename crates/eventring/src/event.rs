/// The capability the queue requires of its payload type.
///
/// The core stores and transports events without inspecting them; the single
/// obligation is a processing hook the consumer invokes on dequeue. The event
/// is dropped once the hook returns.
///
/// # Example
///
/// ```
/// use eventring::Event;
///
/// struct Tick(u64);
///
/// impl Event for Tick {
///     fn process(&self) {
///         // handle the tick
///     }
/// }
/// ```
pub trait Event {
    /// Invoked by the consumer for each dequeued event.
    fn process(&self);
}
