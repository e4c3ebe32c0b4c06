use {
    crate::{Error, logic::Logic},
    arc_swap::ArcSwap,
    domain::Address,
    std::sync::Arc,
};

/// The shared logic pointer.
///
/// Every auction instance resolves its behavior through one beacon, so
/// swapping the pointer upgrades all existing and future instances
/// atomically. There is no per-instance opt-out; the upgrade is gated on
/// the admin identity and the active version stays observable through
/// [`Beacon::version`]. A call in flight keeps the logic it resolved at
/// entry.
pub struct Beacon {
    admin: Address,
    logic: ArcSwap<Box<dyn Logic>>,
}

impl Beacon {
    pub fn new(admin: Address, logic: Box<dyn Logic>) -> Self {
        Self {
            admin,
            logic: ArcSwap::from_pointee(logic),
        }
    }

    /// The currently active logic. Resolved once per call.
    pub fn current(&self) -> Arc<Box<dyn Logic>> {
        self.logic.load_full()
    }

    pub fn version(&self) -> &'static str {
        self.current().version()
    }

    /// Swaps the active logic for the whole fleet. Admin only.
    pub fn upgrade(&self, caller: Address, new_logic: Box<dyn Logic>) -> Result<(), Error> {
        if caller != self.admin {
            return Err(Error::Unauthorized);
        }
        let previous = self.logic.swap(Arc::new(new_logic));
        tracing::info!(
            from = previous.version(),
            to = self.version(),
            "beacon upgraded"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Beacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Beacon")
            .field("admin", &self.admin)
            .field("version", &self.version())
            .finish()
    }
}
