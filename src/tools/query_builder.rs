//! Maps a tool invocation onto a search query or a direct URL.
//!
//! Pure and total: no I/O, every input yields a `Route` or a `ToolError`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use url::Url;

use super::ToolError;

const ONION_SUFFIX: &str = ".onion";
const GATEWAY_SUFFIX: &str = ".onion.ly";

/// Closed set of tools accepted on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Entity lookup: searches for the raw target name.
    Watchtower,
    /// Multi-mission: query template chosen by `mission_type`.
    VeiledMirror,
    /// Relationship mapping for a target name.
    SocialCartographer,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Watchtower, Tool::VeiledMirror, Tool::SocialCartographer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Watchtower => "call_watchtower",
            Tool::VeiledMirror => "veiled_mirror_query",
            Tool::SocialCartographer => "call_social_cartographer",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Sub-selector of `veiled_mirror_query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissionType {
    ThreatIntelligence,
    MarketAnalysis,
    CounterIntelligence,
    OnionBrowse,
    /// Unrecognised mission; the subject is searched verbatim.
    Other(String),
}

impl From<&str> for MissionType {
    fn from(s: &str) -> Self {
        match s {
            "threat_intelligence" => MissionType::ThreatIntelligence,
            "market_analysis" => MissionType::MarketAnalysis,
            "counter_intelligence" => MissionType::CounterIntelligence,
            "onion_browse" => MissionType::OnionBrowse,
            other => MissionType::Other(other.to_string()),
        }
    }
}

/// Output of the builder: either a query for the search engine or a page to
/// read directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Search { query: String },
    Direct { url: Url },
}

/// Resolve `tool` + `params` into a `Route`.
pub fn build(tool: Tool, params: &Value) -> Result<Route, ToolError> {
    match tool {
        Tool::Watchtower => {
            let target = required_str(params, "target_name")?;
            Ok(Route::Search { query: target.to_string() })
        }
        Tool::VeiledMirror => {
            let mission = MissionType::from(required_str(params, "mission_type")?);
            let subject = required_str(params, "query")?;
            mission_route(&mission, subject)
        }
        Tool::SocialCartographer => {
            let target = required_str(params, "target_name")?;
            Ok(Route::Search {
                query: format!(
                    "professional relationships and social network graph for \"{}\"",
                    target
                ),
            })
        }
    }
}

fn mission_route(mission: &MissionType, subject: &str) -> Result<Route, ToolError> {
    let query = match mission {
        MissionType::OnionBrowse => return onion_gateway_url(subject).map(|url| Route::Direct { url }),
        MissionType::ThreatIntelligence => {
            format!("cybersecurity report dark web zero-day exploit for \"{}\"", subject)
        }
        MissionType::MarketAnalysis => format!(
            "dark web marketplace price list for \"{s}\" OR chatter about \"{s}\" data breach",
            s = subject
        ),
        MissionType::CounterIntelligence => format!(
            "leaked credentials containing \"{s}\" OR haveibeenpwned analysis for \"{s}\"",
            s = subject
        ),
        MissionType::Other(_) => subject.to_string(),
    };
    Ok(Route::Search { query })
}

/// Rewrite `<name>.onion` to the public gateway host `https://<name>.onion.ly`.
/// The check is exact and case-sensitive; only the trailing suffix is rewritten.
pub fn onion_gateway_url(address: &str) -> Result<Url, ToolError> {
    let host = address
        .strip_suffix(ONION_SUFFIX)
        .filter(|name| !name.is_empty())
        .ok_or_else(invalid_onion)?;
    let url = Url::parse(&format!("https://{}{}", host, GATEWAY_SUFFIX)).map_err(|_| invalid_onion())?;
    // A path, port or userinfo smuggled into the address changes the parsed host.
    let expected = format!("{}{}", host, GATEWAY_SUFFIX);
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(&expected) => Ok(url),
        _ => Err(invalid_onion()),
    }
}

fn invalid_onion() -> ToolError {
    ToolError::InvalidRequest("Invalid .onion address provided.".to_string())
}

/// Wrap a search query into `<base>?q=<encoded query>`.
pub fn search_url(base: &Url, query: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().clear().append_pair("q", query);
    url
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) => Err(ToolError::InvalidRequest(format!(
            "Parameter '{}' must not be empty",
            key
        ))),
        Some(_) => Err(ToolError::InvalidRequest(format!(
            "Parameter '{}' must be a string",
            key
        ))),
        None => Err(ToolError::InvalidRequest(format!(
            "Missing required parameter: {}",
            key
        ))),
    }
}
