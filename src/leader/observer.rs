/// Callback surface for leadership transitions.
///
/// Both callbacks fire at most once per transition: a node that stays leader
/// across many lock updates sees a single `promoted` call. Callbacks run on
/// the runtime's worker pool and must not block.
pub trait LeadershipObserver: Send + Sync {
    /// This node became the leader.
    fn promoted(&self);

    /// This node lost (or never had) leadership.
    fn demoted(&self);
}
