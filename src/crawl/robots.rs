// src/crawl/robots.rs
// =============================================================================
// Robots exclusion policy.
//
// Parses robots.txt into per-user-agent rule groups and answers the one
// question the scheduler asks: may this user agent fetch this path?
// Allow rules override disallow rules; a group's Crawl-delay can raise
// the politeness delay for the run. A missing or unfetchable robots.txt
// means "allow everything".
// =============================================================================

use std::time::Duration;

/// One User-agent group's rules.
#[derive(Debug, Clone, Default)]
struct RuleGroup {
    agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RuleGroup {
    fn applies_to(&self, agent_lower: &str) -> bool {
        self.agents
            .iter()
            .any(|a| a != "*" && (agent_lower == a || agent_lower.contains(a.as_str())))
    }

    fn is_wildcard(&self) -> bool {
        self.agents.iter().any(|a| a == "*")
    }
}

/// Parsed robots.txt rules for one site.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    groups: Vec<RuleGroup>,
}

impl RobotsPolicy {
    /// Parses robots.txt content. Unknown directives are ignored.
    pub fn parse(content: &str) -> Self {
        let mut groups: Vec<RuleGroup> = Vec::new();
        let mut current = RuleGroup::default();
        // Consecutive User-agent lines share one group; any rule line
        // closes the agent list for that group
        let mut collecting_agents = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if !collecting_agents && !current.agents.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.agents.push(value.to_lowercase());
                    collecting_agents = true;
                }
                "allow" => {
                    collecting_agents = false;
                    if !value.is_empty() {
                        current.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    collecting_agents = false;
                    if !value.is_empty() {
                        current.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    collecting_agents = false;
                    if let Ok(delay) = value.parse::<f64>() {
                        current.crawl_delay = Some(delay);
                    }
                }
                _ => {}
            }
        }
        if !current.agents.is_empty() {
            groups.push(current);
        }

        RobotsPolicy { groups }
    }

    /// The group governing `user_agent`: a specifically-matching group
    /// wins over the `*` group.
    fn group_for(&self, user_agent: &str) -> Option<&RuleGroup> {
        let agent_lower = user_agent.to_lowercase();
        self.groups
            .iter()
            .find(|g| g.applies_to(&agent_lower))
            .or_else(|| self.groups.iter().find(|g| g.is_wildcard()))
    }

    /// May `user_agent` fetch `path`? Allow prefixes override disallow
    /// prefixes; no matching rule means allowed.
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        let Some(group) = self.group_for(user_agent) else {
            return true;
        };

        if group.allow.iter().any(|p| path.starts_with(p)) {
            return true;
        }
        !group.disallow.iter().any(|p| path.starts_with(p))
    }

    /// The Crawl-delay governing `user_agent`, if the site declares one.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.group_for(user_agent)
            .and_then(|g| g.crawl_delay)
            .map(Duration::from_secs_f64)
    }
}

/// Fetches and parses a site's robots.txt. Anything short of a 2xx with
/// a readable body means no restrictions.
pub async fn fetch_robots(client: &reqwest::Client, base_url: &str) -> RobotsPolicy {
    let url = format!("{}/robots.txt", base_url.trim_end_matches('/'));

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(content) => RobotsPolicy::parse(&content),
            Err(_) => RobotsPolicy::default(),
        },
        _ => RobotsPolicy::default(),
    }
}
