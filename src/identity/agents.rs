//! Pool of user agents an identity draws its client signature from

use rand::seq::IndexedRandom;

/// Pool of client signatures an identity can present
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    /// Creates a pool, dropping blank entries
    ///
    /// Falls back to a generic signature if nothing usable is left, configuration
    /// validation rejects that case before a crawl starts.
    pub fn new(agents: impl IntoIterator<Item = String>) -> Self {
        let mut agents: Vec<String> = agents
            .into_iter()
            .map(|agent| agent.trim().to_string())
            .filter(|agent| !agent.is_empty())
            .collect();

        if agents.is_empty() {
            agents.push(concat!("kym-harvester/", env!("CARGO_PKG_VERSION")).to_string());
        }

        Self { agents }
    }

    pub(crate) fn len(&self) -> usize {
        self.agents.len()
    }

    /// Picks any user agent from the pool
    pub fn pick(&self) -> String {
        self.agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_default()
    }

    /// Picks a user agent different from `current` when the pool allows it
    pub fn pick_other(&self, current: &str) -> String {
        let others: Vec<&String> = self.agents.iter().filter(|a| *a != current).collect();
        match others.choose(&mut rand::rng()) {
            Some(agent) => (*agent).clone(),
            None => self.pick(),
        }
    }
}
