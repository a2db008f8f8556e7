use crate::hub::{Hub, HubReport};

#[derive(Debug, PartialEq, Eq)]
pub struct GlobalReport {
    pub hub: HubReport,
}

impl GlobalReport {
    pub fn hub_report(&self) -> &HubReport {
        &self.hub
    }
}

/// The entry point of the validation engine.
///
/// Every operation is a method taking ids, so a `Global` can be shared
/// between threads behind an `Arc`.
pub struct Global {
    pub(crate) hub: Hub,
}

impl Global {
    pub fn new() -> Self {
        api_log!("Global::new");
        Self { hub: Hub::new() }
    }

    pub fn generate_report(&self) -> GlobalReport {
        GlobalReport {
            hub: self.hub.generate_report(),
        }
    }
}

impl Default for Global {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Global {
    fn drop(&mut self) {
        resource_log!("Global::drop");
    }
}
