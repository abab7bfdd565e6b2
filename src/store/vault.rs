use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::config::Connection;
use crate::record::{CredentialKey, CredentialMap};
use crate::store::{Result, SecretStore, StoreError};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// HashiCorp Vault KV v2 backend.
pub struct VaultStore {
    http: Client,
    base: Url,
    address: String,
    token: SecretString,
    namespace: Option<String>,
    /// Mount path split into segments, so nested mounts like `kv/team` work.
    mount: Vec<String>,
}

#[derive(Deserialize)]
struct ReadResponse {
    data: ReadData,
}

#[derive(Deserialize)]
struct ReadData {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

impl VaultStore {
    pub fn new(conn: &Connection, mount: &str, timeout: Duration) -> Result<Self> {
        let address = conn.address.trim_end_matches('/').to_string();
        let base = Url::parse(&address).map_err(|e| {
            StoreError::Other(format!("invalid Vault address '{}': {}", address, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Other(format!(
                "invalid Vault address '{}': not an http(s) URL",
                address
            )));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base,
            address,
            token: conn.token.clone(),
            namespace: conn.namespace.clone(),
            mount: mount
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Look up the token itself. Fails with `Connection` if Vault cannot be
    /// reached and `Auth` if it rejects the token.
    pub fn verify_token(&self) -> Result<()> {
        let url = self.endpoint(["auth", "token", "lookup-self"]);
        let resp = self.send(self.http.get(url))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(token_error(status, error_text(resp)))
    }

    /// `<address>/v1/<mount>/data/<project>/<hostname>`, every segment
    /// percent-encoded so `#`, `?` or `/` in a name stay inside it.
    fn data_url(&self, key: &CredentialKey) -> Url {
        let segments = self
            .mount
            .iter()
            .map(String::as_str)
            .chain(["data", key.project(), key.hostname()]);
        self.endpoint(segments)
    }

    fn endpoint<'s, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("v1").extend(segments);
        }
        url
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let mut req = req.header(TOKEN_HEADER, self.token.expose_secret());
        if let Some(ns) = &self.namespace {
            req = req.header(NAMESPACE_HEADER, ns);
        }
        req.send().map_err(|e| StoreError::Connection(e.to_string()))
    }
}

impl SecretStore for VaultStore {
    fn read(&self, key: &CredentialKey) -> Result<CredentialMap> {
        let url = self.data_url(key);
        debug!(url = url.as_str(), "reading secret");
        let resp = self.send(self.http.get(url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify(status, error_text(resp)));
        }
        let body: ReadResponse = resp
            .json()
            .map_err(|e| StoreError::Other(format!("unexpected response: {}", e)))?;
        // A deleted latest version comes back with `data: null`.
        Ok(body.data.data.map(flatten).unwrap_or_default())
    }

    fn write(&mut self, key: &CredentialKey, secrets: &CredentialMap) -> Result<()> {
        let url = self.data_url(key);
        debug!(url = url.as_str(), users = secrets.len(), "writing secret");
        let resp = self.send(self.http.post(url).json(&json!({ "data": secrets })))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify(status, error_text(resp)));
        }
        Ok(())
    }
}

/// Vault stores arbitrary JSON; anything that is not a string is kept as
/// its JSON text so it survives the merge.
fn flatten(data: Map<String, Value>) -> CredentialMap {
    data.into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect()
}

/// Map a failed secret read/write to a store error.
fn classify(status: StatusCode, detail: String) -> StoreError {
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound,
        StatusCode::UNAUTHORIZED => StoreError::Auth(detail),
        StatusCode::FORBIDDEN => StoreError::PermissionDenied(detail),
        s => StoreError::Other(format!("{}: {}", s, detail)),
    }
}

/// On the token lookup a 403 means the token itself is bad, and there is no
/// secret path that could be missing.
fn token_error(status: StatusCode, detail: String) -> StoreError {
    match classify(status, detail) {
        StoreError::PermissionDenied(detail) => StoreError::Auth(detail),
        StoreError::NotFound => {
            StoreError::Other(format!("{}: token lookup endpoint missing", status))
        }
        other => other,
    }
}

fn error_text(resp: Response) -> String {
    let status = resp.status();
    let body = resp.bytes().unwrap_or_default();
    describe(status, &body)
}

/// Vault's `errors` list when the body has one, else the status reason.
fn describe(status: StatusCode, body: &[u8]) -> String {
    let parsed: ErrorResponse = serde_json::from_slice(body).unwrap_or_default();
    if parsed.errors.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        parsed.errors.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(address: &str, mount: &str) -> VaultStore {
        let conn = Connection {
            address: address.into(),
            token: SecretString::new("s.test".into()),
            namespace: None,
        };
        VaultStore::new(&conn, mount, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_data_url_uses_kv2_layout() {
        let vault = store("http://127.0.0.1:8200", "dba");
        let key = CredentialKey::new("Web", "Host1");
        assert_eq!(
            vault.data_url(&key).as_str(),
            "http://127.0.0.1:8200/v1/dba/data/WEB/host1"
        );
    }

    #[test]
    fn test_trailing_slashes_are_dropped() {
        let vault = store("https://vault.example.com/", "/secret/");
        assert_eq!(vault.address(), "https://vault.example.com");
        let key = CredentialKey::new("crm", "db01");
        assert_eq!(
            vault.data_url(&key).as_str(),
            "https://vault.example.com/v1/secret/data/CRM/db01"
        );
    }

    #[test]
    fn test_nested_mount_and_address_prefix() {
        let vault = store("https://proxy.example.com/vault", "kv/team");
        let key = CredentialKey::new("crm", "db01");
        assert_eq!(
            vault.data_url(&key).as_str(),
            "https://proxy.example.com/vault/v1/kv/team/data/CRM/db01"
        );
        assert_eq!(
            vault.endpoint(["auth", "token", "lookup-self"]).as_str(),
            "https://proxy.example.com/vault/v1/auth/token/lookup-self"
        );
    }

    #[test]
    fn test_reserved_characters_stay_in_their_segment() {
        let vault = store("http://127.0.0.1:8200", "dba");
        let plain = vault.data_url(&CredentialKey::new("web", "db"));

        for host in ["db#1", "db?x=1", "db/1"] {
            let url = vault.data_url(&CredentialKey::new("web", host));
            assert_eq!(url.query(), None, "{host}");
            assert_eq!(url.fragment(), None, "{host}");
            assert_ne!(url.path(), plain.path(), "{host}");
            assert_eq!(url.path_segments().unwrap().count(), 5, "{host}");
        }

        let url = vault.data_url(&CredentialKey::new("web", "db#1"));
        assert_eq!(url.path(), "/v1/dba/data/WEB/db%231");
    }

    #[test]
    fn test_invalid_address_is_rejected() {
        let conn = Connection {
            address: "vault.example.com:8200".into(),
            token: SecretString::new("s.test".into()),
            namespace: None,
        };
        assert!(VaultStore::new(&conn, "dba", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_classify_secret_statuses() {
        let detail = || "permission denied".to_string();
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, detail()),
            StoreError::NotFound
        ));
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, detail()),
            StoreError::Auth(d) if d == "permission denied"
        ));
        assert!(matches!(
            classify(StatusCode::FORBIDDEN, detail()),
            StoreError::PermissionDenied(d) if d == "permission denied"
        ));
        match classify(StatusCode::INTERNAL_SERVER_ERROR, "sealed".into()) {
            StoreError::Other(msg) => {
                assert_eq!(msg, "500 Internal Server Error: sealed")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_token_check_treats_forbidden_as_auth() {
        assert!(matches!(
            token_error(StatusCode::FORBIDDEN, "permission denied".into()),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            token_error(StatusCode::UNAUTHORIZED, "missing client token".into()),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            token_error(StatusCode::NOT_FOUND, String::new()),
            StoreError::Other(_)
        ));
        assert!(matches!(
            token_error(StatusCode::SERVICE_UNAVAILABLE, "Vault is sealed".into()),
            StoreError::Other(_)
        ));
    }

    #[test]
    fn test_describe_prefers_vault_errors() {
        let body = br#"{"errors":["permission denied","1 error occurred"]}"#;
        assert_eq!(
            describe(StatusCode::FORBIDDEN, body),
            "permission denied; 1 error occurred"
        );
        assert_eq!(describe(StatusCode::FORBIDDEN, b""), "Forbidden");
        assert_eq!(describe(StatusCode::NOT_FOUND, br#"{"errors":[]}"#), "Not Found");
    }

    #[test]
    fn test_read_response_parses_nested_data() {
        let raw = r#"{"data":{"data":{"alice":"pw","port":5432},"metadata":{"version":3}}}"#;
        let body: ReadResponse = serde_json::from_str(raw).unwrap();
        let map = flatten(body.data.data.unwrap());
        assert_eq!(map["alice"], "pw");
        assert_eq!(map["port"], "5432");
    }

    #[test]
    fn test_deleted_version_reads_as_empty() {
        let raw = r#"{"data":{"data":null,"metadata":{"deletion_time":"2024-01-01T00:00:00Z"}}}"#;
        let body: ReadResponse = serde_json::from_str(raw).unwrap();
        assert!(body.data.data.map(flatten).unwrap_or_default().is_empty());
    }

    #[test]
    fn test_unreachable_vault_is_a_connection_error() {
        // Port 9 on loopback is "discard"; nothing listens there in CI.
        let vault = store("http://127.0.0.1:9", "dba");
        let err = vault.read(&CredentialKey::new("web", "h1")).unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
    }
}
