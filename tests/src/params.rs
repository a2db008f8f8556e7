/// What a test needs from the device it runs against.
#[derive(Clone, Debug)]
pub struct TestParameters {
    pub required_features: wgt::Features,
    pub required_limits: wgt::Limits,
}

impl Default for TestParameters {
    fn default() -> Self {
        Self {
            required_features: wgt::Features::empty(),
            required_limits: wgt::Limits::default(),
        }
    }
}

impl TestParameters {
    /// Features the device is created with, on top of those already set.
    pub fn features(mut self, features: wgt::Features) -> Self {
        self.required_features |= features;
        self
    }

    pub fn limits(mut self, limits: wgt::Limits) -> Self {
        self.required_limits = limits;
        self
    }
}
