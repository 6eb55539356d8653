//! Team directory: display abbreviations and logo resolution.
//!
//! One injectable lookup for everything the board needs to know about a
//! team beyond its name. Abbreviations come from a built-in table of
//! Premier League clubs with a deterministic fallback for anything else;
//! logos are resolved through the gateway and remembered per team.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::gateway::{GatewayError, IntelGateway, Lookup};

// ---------------------------------------------------------------------------
// Built-in abbreviations
// ---------------------------------------------------------------------------

const PREMIER_LEAGUE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("AFC Bournemouth", "BOU"),
    ("Bournemouth", "BOU"),
    ("Arsenal", "ARS"),
    ("Aston Villa", "AVL"),
    ("Brentford", "BRE"),
    ("Brighton and Hove Albion", "BHA"),
    ("Brighton & Hove Albion", "BHA"),
    ("Burnley", "BUR"),
    ("Chelsea", "CHE"),
    ("Crystal Palace", "CRY"),
    ("Everton", "EVE"),
    ("Fulham", "FUL"),
    ("Ipswich Town", "IPS"),
    ("Leeds United", "LEE"),
    ("Leicester City", "LEI"),
    ("Liverpool", "LIV"),
    ("Manchester City", "MCI"),
    ("Manchester United", "MUN"),
    ("Newcastle United", "NEW"),
    ("Nottingham Forest", "NFO"),
    ("Southampton", "SOU"),
    ("Sunderland", "SUN"),
    ("Tottenham Hotspur", "TOT"),
    ("West Ham United", "WHU"),
    ("Wolverhampton Wanderers", "WOL"),
];

/// Upper bound on remembered logo lookups. Team names arrive from clients,
/// so the cache must not grow with whatever they send.
pub const LOGO_CACHE_CAPACITY: usize = 256;

/// Club-form tokens ignored when deriving an abbreviation.
const NOISE_WORDS: &[&str] = &["fc", "afc", "cf", "sc", "the"];

/// Deterministic fallback: initials of the first three significant words
/// for multi-word names, otherwise the first three letters. Always
/// uppercase ASCII alphanumerics; "???" for names with nothing usable.
pub fn derive_abbreviation(name: &str) -> String {
    let words: Vec<String> = name
        .split(|c: char| c.is_whitespace() || c == '-')
        .map(|w| w.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|w| !w.is_empty() && !NOISE_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    let abbr: String = match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().take(3).collect(),
        many => many.iter().take(3).filter_map(|w| w.chars().next()).collect(),
    };

    if abbr.is_empty() {
        "???".to_string()
    } else {
        abbr.to_uppercase()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// What the board shows for a team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamBadge {
    pub team_name: String,
    pub abbreviation: String,
    pub logo: Lookup<String>,
}

pub struct TeamDirectory {
    abbreviations: HashMap<String, String>,
    /// Settled logo lookups, at most `LOGO_CACHE_CAPACITY`. Failures are not
    /// remembered so they can be retried.
    logos: RwLock<HashMap<String, Lookup<String>>>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamDirectory {
    /// Directory seeded with the built-in Premier League table.
    pub fn new() -> Self {
        Self::with_abbreviations(
            PREMIER_LEAGUE_ABBREVIATIONS
                .iter()
                .map(|(n, a)| (n.to_string(), a.to_string())),
        )
    }

    /// Directory with a custom table (names matched case-insensitively).
    pub fn with_abbreviations(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            abbreviations: entries
                .into_iter()
                .map(|(name, abbr)| (normalize(&name), abbr))
                .collect(),
            logos: RwLock::new(HashMap::new()),
        }
    }

    pub fn abbreviation(&self, team: &str) -> String {
        self.abbreviations
            .get(&normalize(team))
            .cloned()
            .unwrap_or_else(|| derive_abbreviation(team))
    }

    /// Resolve a team's logo, asking the gateway at most once per team for
    /// any settled answer.
    pub async fn logo(
        &self,
        gateway: &dyn IntelGateway,
        team: &str,
    ) -> Result<Lookup<String>, GatewayError> {
        let key = normalize(team);
        if let Some(hit) = self.logos.read().await.get(&key) {
            return Ok(hit.clone());
        }

        let result = gateway.team_logo(team).await?;
        debug!(team, found = result.is_found(), "Team logo resolved");

        let mut logos = self.logos.write().await;
        if logos.len() >= LOGO_CACHE_CAPACITY {
            // Misses are the cheap ones to forget; known logos stay.
            logos.retain(|_, v| v.is_found());
        }
        if logos.len() < LOGO_CACHE_CAPACITY {
            logos.insert(key, result.clone());
        } else {
            debug!(team, "Logo cache full, not remembering lookup");
        }
        Ok(result)
    }

    pub async fn badge(
        &self,
        gateway: &dyn IntelGateway,
        team: &str,
    ) -> Result<TeamBadge, GatewayError> {
        Ok(TeamBadge {
            team_name: team.to_string(),
            abbreviation: self.abbreviation(team),
            logo: self.logo(gateway, team).await?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
