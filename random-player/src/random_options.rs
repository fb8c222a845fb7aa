/// The options for [`crate::RandomPlayer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RandomOptions {
    /// The seed for the random number generator.
    pub seed: u64,
}

impl RandomOptions {
    /// Creates a new [`RandomOptions`].
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_json(data: &serde_json::Value) -> Self {
        match data.get("seed").and_then(serde_json::Value::as_u64) {
            Some(seed) => Self::new(seed),
            None => Self::default(),
        }
    }
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self { seed: rand::random() }
    }
}
