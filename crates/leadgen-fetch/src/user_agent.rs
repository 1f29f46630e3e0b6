use rand::Rng;

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Rotating pool of browser user agents
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>) -> Self {
        let agents: Vec<String> = agents
            .into_iter()
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty())
            .collect();
        Self { agents }
    }

    /// Pick a user agent for the next attempt
    pub fn pick(&self) -> &str {
        if self.agents.is_empty() {
            return FALLBACK_USER_AGENT;
        }
        let idx = rand::thread_rng().gen_range(0..self.agents.len());
        &self.agents[idx]
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_falls_back() {
        let pool = UserAgentPool::new(vec!["  ".to_string()]);
        assert!(pool.is_empty());
        assert_eq!(pool.pick(), FALLBACK_USER_AGENT);
    }

    #[test]
    fn test_pick_varies() {
        let pool = UserAgentPool::new(vec![
            "agent-a".to_string(),
            "agent-b".to_string(),
            "agent-c".to_string(),
        ]);
        assert_eq!(pool.len(), 3);

        // Probabilistic but very unlikely to fail
        let picks: Vec<_> = (0..30).map(|_| pool.pick().to_string()).collect();
        let all_same = picks.iter().all(|p| p == &picks[0]);
        assert!(!all_same, "Expected variation in user agents");
    }
}
