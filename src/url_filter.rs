//! Source URL allow-list

use url::Url;

/// Checks submitted URLs against the configured source domains
#[derive(Debug, Clone)]
pub struct SourceFilter {
    domains: Vec<String>,
}

impl SourceFilter {
    /// Create a filter for the given domains (case-insensitive, leading dots ignored)
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Whether `raw` is an http(s) URL whose host is an allowed domain or a subdomain of one
    pub fn is_allowed(&self, raw: &str) -> bool {
        let Ok(url) = Url::parse(raw.trim()) else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_end_matches('.').to_ascii_lowercase();

        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
