//! Origin Validation
//!
//! Decides whether a request's declared origin (or referrer) belongs to
//! this site.

use url::Url;

const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];
const DEV_PORTS: std::ops::RangeInclusive<u16> = 3000..=9000;

/// Origin-relevant request headers
#[derive(Debug, Clone, Default)]
pub struct OriginHeaders {
    pub origin: Option<String>,
    pub referer: Option<String>,
    /// `Host` header, possibly with port
    pub host: Option<String>,
}

impl OriginHeaders {
    /// Header values with CR/LF removed, for log lines
    pub fn sanitized(&self) -> (String, String, String) {
        (
            strip_line_breaks(self.origin.as_deref()),
            strip_line_breaks(self.referer.as_deref()),
            strip_line_breaks(self.host.as_deref()),
        )
    }

    fn host_without_port(&self) -> Option<&str> {
        let host = self.host.as_deref()?;
        match host.split_once(':') {
            Some((name, _)) if !name.is_empty() => Some(name),
            _ => Some(host),
        }
    }
}

fn strip_line_breaks(value: Option<&str>) -> String {
    value.unwrap_or_default().replace(['\r', '\n'], "")
}

/// Why a request was trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginMatch {
    /// No Origin/Referer; server itself is a production or dev host
    NoHeaders,
    /// Full origin on the allow-list
    AllowList,
    /// Host on the allow-list with an acceptable port
    AllowedHost,
    /// Host equals the server's own name
    ServerHost,
}

/// Origin/Referer policy
#[derive(Debug, Clone)]
pub struct OriginValidator {
    allowed_origins: Vec<String>,
    production_domains: Vec<String>,
    server_name: Option<String>,
}

impl OriginValidator {
    pub fn new(
        allowed_origins: Vec<String>,
        production_domains: Vec<String>,
        server_name: Option<String>,
    ) -> Self {
        Self {
            allowed_origins,
            production_domains,
            server_name,
        }
    }

    /// Server runs on a local development host
    pub fn is_development(&self, host: Option<&str>) -> bool {
        let is_local = |value: &str| LOCAL_HOSTS.iter().any(|local| value.contains(local));
        self.server_name.as_deref().is_some_and(is_local) || host.is_some_and(is_local)
    }

    /// Validate a request; `None` = untrusted
    pub fn validate(&self, headers: &OriginHeaders) -> Option<OriginMatch> {
        let declared = headers
            .origin
            .as_deref()
            .filter(|v| !v.is_empty())
            .or(headers.referer.as_deref().filter(|v| !v.is_empty()));

        let Some(declared) = declared else {
            let trusted = self.is_development(headers.host.as_deref())
                || self.is_production_domain(self.server_name.as_deref())
                || self.is_production_domain(headers.host.as_deref())
                || self.is_production_domain(headers.host_without_port());
            return trusted.then_some(OriginMatch::NoHeaders);
        };

        let dev = self.is_development(headers.host.as_deref());
        if let Some(matched) = self.check_allowed(declared, dev) {
            return Some(matched);
        }

        let host = Url::parse(declared).ok()?.host_str()?.to_string();
        self.is_server_host(&host, headers)
            .then_some(OriginMatch::ServerHost)
    }

    /// Allow-list check only (steps 2-3); used for CORS echoing
    pub fn is_allowed_origin(&self, origin: &str, host: Option<&str>) -> bool {
        self.check_allowed(origin, self.is_development(host)).is_some()
    }

    fn check_allowed(&self, declared: &str, dev: bool) -> Option<OriginMatch> {
        if declared.is_empty() {
            return None;
        }

        let exact = self.allowed_origins.iter().any(|o| o == declared);
        if exact || (dev && declared == "file://") {
            return Some(OriginMatch::AllowList);
        }

        let url = Url::parse(declared).ok()?;
        let host = url.host_str()?;

        if LOCAL_HOSTS.contains(&host) {
            let port = url.port().unwrap_or(80);
            return (port == 80 || DEV_PORTS.contains(&port)).then_some(OriginMatch::AllowedHost);
        }

        let listed = self
            .allowed_origins
            .iter()
            .filter_map(|o| Url::parse(o).ok())
            .any(|allowed| allowed.host_str() == Some(host));
        if !listed {
            return None;
        }

        matches!(url.port_or_known_default(), Some(80) | Some(443))
            .then_some(OriginMatch::AllowedHost)
    }

    fn is_server_host(&self, host: &str, headers: &OriginHeaders) -> bool {
        !host.is_empty()
            && (headers.host_without_port() == Some(host)
                || self.server_name.as_deref() == Some(host)
                || self.production_domains.iter().any(|d| d == host))
    }

    fn is_production_domain(&self, host: Option<&str>) -> bool {
        host.is_some_and(|h| self.production_domains.iter().any(|d| d == h))
    }
}
