use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::extractor::dom::DomTextStrategy;
use crate::extractor::reader::ReadabilityStrategy;
use crate::extractor::{ExtractError, Extracted, ExtractionInput, ExtractionStrategy};

/// Pseudo-strategy name selecting a random registered backend per call.
pub const RANDOM_STRATEGY: &str = "random";

/// Names of the HTML backends registered by [`StrategyRegistry::with_defaults`].
pub const BUILTIN_STRATEGIES: &[&str] = &["dom", "readability"];

/// Registry of HTML extraction strategies by name
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: BTreeMap<&'static str, Arc<dyn ExtractionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DomTextStrategy);
        registry.register(ReadabilityStrategy);
        registry
    }

    /// Register a strategy under its own name, replacing any previous one
    pub fn register<S: ExtractionStrategy>(&mut self, strategy: S) {
        self.strategies.insert(strategy.name(), Arc::new(strategy));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExtractionStrategy>> {
        self.strategies.get(name).cloned()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    /// Resolve a configured name. `random` wraps every registered strategy in
    /// a [`RandomChoice`], seeded when `seed` is given.
    pub fn resolve(
        &self,
        name: &str,
        seed: Option<u64>,
    ) -> Result<Arc<dyn ExtractionStrategy>, ExtractError> {
        if name == RANDOM_STRATEGY {
            let choices: Vec<_> = self.strategies.values().cloned().collect();
            if choices.is_empty() {
                return Err(ExtractError::UnknownStrategy(name.to_string()));
            }
            return Ok(Arc::new(RandomChoice::new(choices, seed)));
        }

        self.get(name)
            .ok_or_else(|| ExtractError::UnknownStrategy(name.to_string()))
    }
}

/// Decorator picking one of several strategies at random for every call.
pub struct RandomChoice {
    choices: Vec<Arc<dyn ExtractionStrategy>>,
    rng: Mutex<StdRng>,
}

impl RandomChoice {
    pub fn new(choices: Vec<Arc<dyn ExtractionStrategy>>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            choices,
            rng: Mutex::new(rng),
        }
    }

    fn pick(&self) -> Option<Arc<dyn ExtractionStrategy>> {
        // a poisoned lock still holds a usable rng
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        self.choices.choose(&mut *rng).cloned()
    }
}

impl ExtractionStrategy for RandomChoice {
    fn extract(&self, input: &ExtractionInput<'_>) -> Result<Extracted, ExtractError> {
        let strategy = self
            .pick()
            .ok_or_else(|| ExtractError::UnknownStrategy(RANDOM_STRATEGY.to_string()))?;
        strategy.extract(input)
    }

    fn name(&self) -> &'static str {
        RANDOM_STRATEGY
    }
}
