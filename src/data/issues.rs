//! Issue records and the working list the controller filters.

use crate::core::config::FilterCase;
use crate::core::geo::LatLng;
use crate::ui::popup::Popup;
use crate::{MapError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Records shipped with the app in place of a server response
pub const SAMPLE_ISSUES_JSON: &str = r#"[
    {
        "name": "Grafitti",
        "status": "resolved",
        "lat": 42.7098112,
        "long": -73.2069888
    },
    {
        "name": "Abandoned Vehicles",
        "status": "submitted",
        "lat": 42.712082,
        "long": -73.218619
    }
]"#;

/// A reported issue pinned to a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    /// Free-form label such as "resolved" or "submitted"
    pub status: String,
    pub lat: f64,
    #[serde(rename = "long")]
    pub lng: f64,
}

impl Issue {
    pub fn new(name: impl Into<String>, status: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            lat,
            lng,
        }
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    pub fn popup(&self) -> Popup {
        Popup::new(self.name.clone(), self.status.clone())
    }

    /// Substring match of `query` against the lowercased name
    pub fn matches(&self, query: &str, case: FilterCase) -> bool {
        let name = self.name.to_lowercase();
        match case {
            FilterCase::AsTyped => name.contains(query),
            FilterCase::Insensitive => name.contains(&query.to_lowercase()),
        }
    }
}

/// Parses a JSON array of issues and rejects records with unusable coordinates
pub fn parse_issues(json: &str) -> Result<Vec<Issue>> {
    let issues: Vec<Issue> = serde_json::from_str(json)?;
    if let Some(bad) = issues.iter().find(|issue| !issue.position().is_valid()) {
        return Err(MapError::InvalidCoordinates(format!(
            "issue '{}' has coordinates {}",
            bad.name,
            bad.position()
        )));
    }
    Ok(issues)
}

/// The sample records from [`SAMPLE_ISSUES_JSON`]
pub fn sample_issues() -> Result<Vec<Issue>> {
    parse_issues(SAMPLE_ISSUES_JSON)
}

/// Where issue records come from
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_issues(&self) -> Result<Vec<Issue>>;
}

/// Serves a fixed JSON document instead of calling a server
#[derive(Debug, Clone)]
pub struct InlineIssueSource {
    json: String,
}

impl InlineIssueSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl Default for InlineIssueSource {
    fn default() -> Self {
        Self::new(SAMPLE_ISSUES_JSON)
    }
}

#[async_trait]
impl IssueSource for InlineIssueSource {
    async fn fetch_issues(&self) -> Result<Vec<Issue>> {
        let issues = parse_issues(&self.json)?;
        log::debug!("loaded {} inline issues", issues.len());
        Ok(issues)
    }
}

/// The working list of issues.
///
/// Filtering replaces the list with the matching subset, so successive
/// filters narrow it further. Nothing restores dropped records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueSet {
    records: Vec<Issue>,
}

impl IssueSet {
    pub fn new(records: Vec<Issue>) -> Self {
        Self { records }
    }

    /// Keeps only records whose name matches `query`. An empty query leaves
    /// the list as it is. Returns the number of records left.
    pub fn filter_by_name(&mut self, query: &str, case: FilterCase) -> usize {
        if !query.is_empty() {
            self.records.retain(|issue| issue.matches(query, case));
        }
        self.records.len()
    }

    pub fn as_slice(&self) -> &[Issue] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Issue> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Issue>> for IssueSet {
    fn from(records: Vec<Issue>) -> Self {
        Self::new(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(set: &IssueSet) -> Vec<&str> {
        set.iter().map(|issue| issue.name.as_str()).collect()
    }

    #[test]
    fn test_sample_issues() {
        let issues = sample_issues().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0], Issue::new("Grafitti", "resolved", 42.7098112, -73.2069888));
        assert_eq!(
            issues[1],
            Issue::new("Abandoned Vehicles", "submitted", 42.712082, -73.218619)
        );
    }

    #[test]
    fn test_long_field_name_is_kept() {
        let json = serde_json::to_value(Issue::new("a", "b", 1.0, 2.0)).unwrap();
        assert_eq!(json["long"], 2.0);
        assert!(json.get("lng").is_none());
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let err = parse_issues(r#"[{"name":"x","status":"y","lat":100.0,"long":0.0}]"#);
        assert!(matches!(err, Err(MapError::InvalidCoordinates(_))));
    }

    #[test]
    fn test_filter_matches_lowercased_name() {
        let mut set = IssueSet::new(sample_issues().unwrap());
        assert_eq!(set.filter_by_name("vehic", FilterCase::AsTyped), 1);
        assert_eq!(names(&set), vec!["Abandoned Vehicles"]);
    }

    #[test]
    fn test_uppercase_query_does_not_match_as_typed() {
        let mut set = IssueSet::new(vec![Issue::new("Graffiti", "resolved", 0.0, 0.0)]);
        assert_eq!(set.filter_by_name("GRAFFITI", FilterCase::AsTyped), 0);

        let mut set = IssueSet::new(vec![Issue::new("Graffiti", "resolved", 0.0, 0.0)]);
        assert_eq!(set.filter_by_name("GRAFFITI", FilterCase::Insensitive), 1);
    }

    #[test]
    fn test_filters_narrow_and_never_reset() {
        let mut set = IssueSet::new(sample_issues().unwrap());
        assert_eq!(set.filter_by_name("a", FilterCase::AsTyped), 2);
        assert_eq!(set.filter_by_name("graf", FilterCase::AsTyped), 1);
        assert_eq!(set.filter_by_name("", FilterCase::AsTyped), 1);
        assert_eq!(set.filter_by_name("vehicles", FilterCase::AsTyped), 0);
        assert_eq!(set.filter_by_name("", FilterCase::AsTyped), 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_inline_source() {
        let issues = InlineIssueSource::default().fetch_issues().await.unwrap();
        assert_eq!(issues.len(), 2);

        let broken = InlineIssueSource::new("{");
        assert!(broken.fetch_issues().await.is_err());
    }
}
