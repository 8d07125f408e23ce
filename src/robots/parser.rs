//! robots.txt grammar: user-agent groups, Allow/Disallow rules with
//! `*`/`$` wildcards, and Crawl-delay.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;

#[derive(Debug, Clone)]
struct Rule {
    is_allow: bool,
    path: String,
    regex: Option<Regex>,
}

#[derive(Debug, Clone, Default)]
struct Group {
    rules: Vec<Rule>,
    crawl_delay: Option<Duration>,
}

/// Parsed per-origin crawling policy.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    // Keyed by lowercased user-agent token
    groups: HashMap<String, Group>,
}

impl RobotsPolicy {
    pub fn parse(content: &str) -> Self {
        let mut policy = Self {
            groups: HashMap::new(),
        };

        let mut current_agents: Vec<String> = Vec::new();
        let mut current_group = Group::default();
        // A User-agent line after rules starts a new group; consecutive
        // User-agent lines all share the following rules.
        let mut group_open = false;

        fn flush(agents: &mut Vec<String>, group: &mut Group, groups: &mut HashMap<String, Group>) {
            for agent in agents.iter() {
                groups.insert(agent.clone(), group.clone());
            }
            agents.clear();
            *group = Group::default();
        }

        for line in content.lines() {
            // Strip inline comments, then whitespace
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if group_open {
                        flush(&mut current_agents, &mut current_group, &mut policy.groups);
                        group_open = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    group_open = true;
                    // An empty Disallow allows everything
                    if !value.is_empty() {
                        current_group.rules.push(Rule {
                            is_allow: false,
                            path: value.to_string(),
                            regex: create_regex(value),
                        });
                    }
                }
                "allow" => {
                    group_open = true;
                    if !value.is_empty() {
                        current_group.rules.push(Rule {
                            is_allow: true,
                            path: value.to_string(),
                            regex: create_regex(value),
                        });
                    }
                }
                "crawl-delay" => {
                    group_open = true;
                    if let Ok(secs) = value.parse::<f64>() {
                        if secs >= 0.0 {
                            current_group.crawl_delay = Some(Duration::from_secs_f64(secs));
                        }
                    }
                }
                _ => {}
            }
        }

        flush(&mut current_agents, &mut current_group, &mut policy.groups);
        policy
    }

    /// Whether the given path is allowed for the given identity.
    /// First matching rule in group order wins; no match means allowed.
    pub fn is_allowed(&self, path: &str, identity: &str) -> bool {
        let Some(group) = self.group_for(identity) else {
            return true;
        };

        for rule in &group.rules {
            let matched = match &rule.regex {
                Some(regex) => regex.is_match(path),
                None => path.starts_with(&rule.path),
            };
            if matched {
                return rule.is_allow;
            }
        }
        true
    }

    /// The origin-declared crawl delay for the given identity, if any.
    pub fn crawl_delay(&self, identity: &str) -> Option<Duration> {
        self.group_for(identity).and_then(|g| g.crawl_delay)
    }

    /// Find the most specific group for an identity: the longest agent
    /// token that is a substring of the identity, falling back to `*`.
    fn group_for(&self, identity: &str) -> Option<&Group> {
        let identity = identity.to_lowercase();
        self.groups
            .iter()
            .filter(|(agent, _)| agent.as_str() != "*" && identity.contains(agent.as_str()))
            .max_by_key(|(agent, _)| agent.len())
            .map(|(_, group)| group)
            .or_else(|| self.groups.get("*"))
    }
}

/// Translate a robots path pattern into an anchored regex. Returns `None`
/// for plain prefixes, which are matched directly.
fn create_regex(pattern: &str) -> Option<Regex> {
    if !pattern.contains('*') && !pattern.ends_with('$') {
        return None;
    }
    let mut regex_pattern = regex::escape(pattern);
    regex_pattern = regex_pattern.replace("\\*", ".*");
    if let Some(stripped) = regex_pattern.strip_suffix("\\$") {
        regex_pattern = format!("{}$", stripped);
    }
    Regex::new(&format!("^{}", regex_pattern)).ok()
}
