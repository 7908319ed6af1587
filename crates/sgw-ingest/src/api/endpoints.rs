//! API endpoint URL builders

/// Path and fixed query arguments of one API endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointSpec {
    pub path: &'static str,
    pub query: &'static [(&'static str, &'static str)],
}

impl EndpointSpec {
    pub const fn new(path: &'static str) -> Self {
        Self { path, query: &[] }
    }

    pub const fn with_query(
        path: &'static str,
        query: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { path, query }
    }

    /// Fixed query arguments as owned pairs, ready to extend
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Build an endpoint URL from the base URL and a path
pub fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}
