use std::collections::HashSet;

use crate::domain::{Alert, County};

/// Decides whether an alert touches any monitored county.
///
/// NOAA tags alerts with UGC and FIPS6 codes; a county is watched under both
/// vocabularies and matches on either. An empty county list is valid and
/// matches nothing.
#[derive(Debug, Clone)]
pub struct RegionFilter {
    counties: Vec<County>,
    ugc_watch: HashSet<String>,
    fips_watch: HashSet<String>,
}

impl RegionFilter {
    pub fn new(counties: &[County]) -> Self {
        let ugc_watch = counties.iter().map(|c| c.ugc.clone()).collect();
        let fips_watch = counties.iter().map(|c| c.fips.clone()).collect();
        Self {
            counties: counties.to_vec(),
            ugc_watch,
            fips_watch,
        }
    }

    pub fn accepts(&self, alert: &Alert) -> bool {
        self.match_county(alert).is_some()
    }

    /// First monitored county the alert applies to, checking UGC codes before
    /// FIPS. Monitored counties are far enough apart that more than one match
    /// does not happen in practice; the first is the one we name in the push.
    pub fn match_county(&self, alert: &Alert) -> Option<&County> {
        for code in &alert.ugc_codes {
            if self.ugc_watch.contains(code) {
                return self.counties.iter().find(|c| &c.ugc == code);
            }
        }
        for code in &alert.fips_codes {
            if self.fips_watch.contains(code) {
                return self.counties.iter().find(|c| &c.fips == code);
            }
        }
        None
    }
}
