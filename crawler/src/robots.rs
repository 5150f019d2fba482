//! robots.txt parsing and path matching.
//!
//! The parser keeps two rule sets while scanning: one for our own user agent
//! and one for `*`. Directives land in whichever set the most recent
//! `User-agent` line selected; directives before any `User-agent` line are
//! ignored. At the end, the bot-specific set wins if it collected anything.

#[derive(Debug, Clone, Default)]
pub struct RobotRules {
    pub user_agent: String,
    pub allows: Vec<String>,
    pub disallows: Vec<String>,
    pub crawl_delay: f64,
    pub applies: bool,
}

impl RobotRules {
    fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            ..Default::default()
        }
    }

    /// Allow-everything rules, used when robots.txt cannot be fetched.
    pub fn permissive(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            applies: true,
            ..Default::default()
        }
    }

    /// Longest-prefix decision over `allows` and `disallows`. `path` should
    /// include the query string when present. A tie or longer allow wins.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.allows.is_empty() && self.disallows.is_empty() {
            return true;
        }

        let best_allow = longest_matching_prefix(&self.allows, path);
        let best_disallow = longest_matching_prefix(&self.disallows, path);

        match (best_allow, best_disallow) {
            (Some(allow), Some(disallow)) => allow >= disallow,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => true,
        }
    }

    fn has_rules(&self) -> bool {
        !self.allows.is_empty() || !self.disallows.is_empty() || self.crawl_delay > 0.0
    }
}

fn longest_matching_prefix(prefixes: &[String], path: &str) -> Option<usize> {
    prefixes
        .iter()
        .filter(|p| path.starts_with(p.as_str()))
        .map(|p| p.len())
        .max()
}

pub fn parse_robots_txt(data: &str, my_user_agent: &str) -> RobotRules {
    let my_ua = my_user_agent.trim().to_lowercase();
    let mut mine = RobotRules::new(&my_ua);
    let mut star = RobotRules::new("*");
    let mut in_my_block = false;
    let mut in_star_block = false;

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let field = field.trim().to_lowercase();
        let value = value.trim();

        if field == "user-agent" {
            let ua = value.to_lowercase();
            in_my_block = ua == my_ua;
            in_star_block = ua == "*";
            continue;
        }

        let Some(rules) = active_block(&mut mine, &mut star, in_my_block, in_star_block) else {
            continue;
        };
        match field.as_str() {
            "disallow" => {
                if value.is_empty() {
                    rules.disallows.clear();
                } else if value.starts_with('/') {
                    rules.disallows.push(value.to_string());
                }
            }
            "allow" => {
                if value.starts_with('/') {
                    rules.allows.push(value.to_string());
                }
            }
            "crawl-delay" => {
                if let Ok(delay) = value.parse::<f64>() {
                    if delay.is_finite() && delay >= 0.0 {
                        rules.crawl_delay = delay;
                    }
                }
            }
            _ => {}
        }
    }

    if mine.has_rules() {
        mine.applies = true;
        mine
    } else {
        star.applies = true;
        star
    }
}

fn active_block<'a>(
    mine: &'a mut RobotRules,
    star: &'a mut RobotRules,
    in_my_block: bool,
    in_star_block: bool,
) -> Option<&'a mut RobotRules> {
    if in_my_block {
        Some(mine)
    } else if in_star_block {
        Some(star)
    } else {
        None
    }
}
