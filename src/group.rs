use std::collections::HashMap;

use crate::fixture::Fixture;

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueGroup<'a> {
    pub league_name: &'a str,
    pub league_logo_url: &'a str,
    pub fixtures: Vec<&'a Fixture>,
}

/// Buckets fixtures by exact league name, keeping first-seen league order and
/// the source order inside each league. The logo comes from the first
/// fixture seen for that league.
pub fn group_by_league(fixtures: &[Fixture]) -> Vec<LeagueGroup<'_>> {
    let mut groups: Vec<LeagueGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for fixture in fixtures {
        let name = fixture.league_name.as_str();
        match index.get(name) {
            Some(&idx) => groups[idx].fixtures.push(fixture),
            None => {
                index.insert(name, groups.len());
                groups.push(LeagueGroup {
                    league_name: name,
                    league_logo_url: &fixture.league_logo_url,
                    fixtures: vec![fixture],
                });
            }
        }
    }

    groups
}
