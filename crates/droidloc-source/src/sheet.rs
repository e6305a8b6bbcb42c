use crate::SourceError;
use droidloc_core::Result;
use regex::Regex;
use std::sync::OnceLock;

pub const DEFAULT_EXPORT_BASE: &str = "https://docs.google.com/spreadsheets/d";
pub const DEFAULT_TOKEN_ENV: &str = "DROIDLOC_ACCESS_TOKEN";

/// How to reach a Google Sheets CSV export.
#[derive(Debug, Clone)]
pub struct SheetOptions {
    /// Worksheet id inside the spreadsheet (`gid`), 0 for the first sheet.
    pub gid: u64,
    /// Optional OAuth bearer token.
    pub token: Option<String>,
    pub base_url: String,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            gid: 0,
            token: None,
            base_url: DEFAULT_EXPORT_BASE.to_string(),
        }
    }
}

pub(crate) fn looks_like_sheet_id(s: &str) -> bool {
    static SHEET_ID_RE: OnceLock<Regex> = OnceLock::new();
    let re = SHEET_ID_RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").unwrap());
    re.is_match(s)
}

pub fn export_url(id: &str, opts: &SheetOptions) -> String {
    format!(
        "{}/{}/export?format=csv&gid={}",
        opts.base_url.trim_end_matches('/'),
        id,
        opts.gid
    )
}

/// Read a bearer token from `var`. Unset is fine (public sheets); set but
/// blank or spanning several lines is a configuration error.
pub fn token_from_env(var: &str) -> std::result::Result<Option<String>, SourceError> {
    match std::env::var(var) {
        Ok(raw) => {
            let token = raw.trim();
            if token.is_empty() || token.contains(['\n', '\r', ' ']) {
                return Err(SourceError::MalformedCredential(var.to_string()));
            }
            Ok(Some(token.to_string()))
        }
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => {
            Err(SourceError::MalformedCredential(var.to_string()))
        }
    }
}

/// Download one worksheet as CSV text. No retries.
pub fn fetch_sheet_csv(id: &str, opts: &SheetOptions) -> Result<String> {
    let url = export_url(id, opts);
    tracing::info!(event = "sheet_fetch", url = %url, auth = opts.token.is_some());

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("droidloc/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let mut req = client.get(&url);
    if let Some(token) = &opts.token {
        req = req.bearer_auth(token);
    }
    let resp = req.send()?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            status: status.as_u16(),
            url,
        }
        .into());
    }
    Ok(resp.text()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Answer a single HTTP request on loopback; the handle yields the raw
    /// request head.
    fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        (format!("http://{addr}/d"), handle)
    }

    #[test]
    fn fetch_returns_body_and_sends_bearer_token() {
        let (base_url, server) = serve_once("200 OK", "id,type,en\nhi,string,Hi\n");
        let opts = SheetOptions {
            gid: 7,
            token: Some("ya29.test".into()),
            base_url,
        };
        let body = fetch_sheet_csv("sheet-1234567890", &opts).unwrap();
        assert_eq!(body, "id,type,en\nhi,string,Hi\n");

        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /d/sheet-1234567890/export?format=csv&gid=7 "));
        assert!(head.contains("authorization: bearer ya29.test"), "{head}");
    }

    #[test]
    fn fetch_without_token_sends_no_authorization() {
        let (base_url, server) = serve_once("200 OK", "id,type\n");
        let opts = SheetOptions {
            base_url,
            ..SheetOptions::default()
        };
        fetch_sheet_csv("sheet-1234567890", &opts).unwrap();
        let head = server.join().unwrap().to_ascii_lowercase();
        assert!(!head.contains("authorization:"), "{head}");
    }

    #[test]
    fn non_success_status_is_fatal() {
        let (base_url, server) = serve_once("403 Forbidden", "denied");
        let opts = SheetOptions {
            token: Some("expired".into()),
            base_url,
            ..SheetOptions::default()
        };
        let err = fetch_sheet_csv("sheet-1234567890", &opts).unwrap_err();
        server.join().unwrap();
        match err.downcast_ref::<SourceError>() {
            Some(SourceError::Http { status, url }) => {
                assert_eq!(*status, 403);
                assert!(url.ends_with("/d/sheet-1234567890/export?format=csv&gid=0"));
            }
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[test]
    fn export_url_includes_gid() {
        let opts = SheetOptions {
            gid: 42,
            base_url: "http://localhost:9/d/".into(),
            ..SheetOptions::default()
        };
        assert_eq!(
            export_url("abc", &opts),
            "http://localhost:9/d/abc/export?format=csv&gid=42"
        );
    }

    #[test]
    fn sheet_ids_reject_paths() {
        assert!(looks_like_sheet_id("1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms"));
        assert!(!looks_like_sheet_id("strings.csv"));
        assert!(!looks_like_sheet_id("short"));
        assert!(!looks_like_sheet_id("a/b/c/d/e/f/g"));
    }

    #[test]
    fn token_env_unset_blank_and_valid() {
        let var = "DROIDLOC_TEST_TOKEN_SHEET_RS";
        std::env::remove_var(var);
        assert_eq!(token_from_env(var).unwrap(), None);

        std::env::set_var(var, "   ");
        assert!(matches!(
            token_from_env(var),
            Err(SourceError::MalformedCredential(_))
        ));

        std::env::set_var(var, "ya29.token\n");
        assert_eq!(token_from_env(var).unwrap().as_deref(), Some("ya29.token"));

        std::env::set_var(var, "two\nlines");
        assert!(token_from_env(var).is_err());
        std::env::remove_var(var);
    }
}
