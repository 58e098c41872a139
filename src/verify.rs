use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_socks::tcp::Socks5Stream;

use crate::proxy::{host_is_valid, ProxyEndpoint};
use crate::record::Credential;
use crate::registry::{DomainParams, Secure};

/// Terminal classification of one input record. Every record ends in
/// exactly one of these; none of them aborts the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AuthFailure,
    ConnectionError(String),
    InvalidIdentifier,
    UnknownDomain,
    InvalidDomainConfig(String),
    MalformedRecord,
}

impl Outcome {
    /// True for outcomes that performed a network attempt. Only these are
    /// counted toward the run total and only these trigger pacing.
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            Outcome::Success | Outcome::AuthFailure | Outcome::ConnectionError(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Transport: direct or SOCKS5, plain or TLS, behind one object-safe alias.

trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

type BoxStream = Box<dyn Transport>;

static TLS_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.into(),
    };
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

async fn open_tcp(host: &str, port: u16, proxy: Option<&ProxyEndpoint>) -> Result<BoxStream, String> {
    match proxy {
        None => {
            let stream = TcpStream::connect((host, port))
                .await
                .map_err(|e| format!("connect {host}:{port}: {e}"))?;
            stream.set_nodelay(true).ok();
            Ok(Box::new(stream))
        }
        Some(p) => {
            let stream = Socks5Stream::connect((p.host.as_str(), p.port), (host, port))
                .await
                .map_err(|e| format!("socks5 {}:{}: {e}", p.host, p.port))?;
            Ok(Box::new(stream))
        }
    }
}

async fn open_stream(
    host: &str,
    port: u16,
    tls: bool,
    proxy: Option<&ProxyEndpoint>,
) -> Result<BoxStream, String> {
    let stream = open_tcp(host, port, proxy).await?;
    if !tls {
        return Ok(stream);
    }
    let name = ServerName::try_from(host.to_string())
        .map_err(|e| format!("tls server name {host:?}: {e}"))?;
    let connector = TlsConnector::from(TLS_CONFIG.clone());
    let stream = connector
        .connect(name, stream)
        .await
        .map_err(|e| format!("tls handshake with {host}: {e}"))?;
    Ok(Box::new(stream))
}

// ---------------------------------------------------------------------------
// Minimal IMAP exchange: greeting, LOGIN, tagged reply, LOGOUT. Nothing else
// of the protocol is spoken here.

const LOGIN_TAG: &str = "A1";
const LOGOUT_TAG: &str = "A2";

/// How long a post-login LOGOUT may take before the session is simply
/// dropped. Kept apart from the attempt timeout so a server that stalls
/// after accepting the credential cannot reclassify the record.
const LOGOUT_GRACE: Duration = Duration::from_secs(2);

async fn read_line<S: AsyncBufRead + Unpin>(stream: &mut S) -> Result<String, String> {
    let mut line = String::new();
    let n = stream
        .read_line(&mut line)
        .await
        .map_err(|e| format!("read: {e}"))?;
    if n == 0 {
        return Err("connection closed by server".into());
    }
    Ok(line)
}

/// Wrap a literal in an IMAP quoted string.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Greeting + LOGIN. `Ok(true)` means the server accepted the credential,
/// `Ok(false)` means it rejected it; everything else is a transport or
/// protocol failure.
async fn login_phase(
    stream: BoxStream,
    user: &str,
    password: &str,
) -> Result<(bool, BufStream<BoxStream>), String> {
    let mut stream = BufStream::new(stream);

    let greeting = read_line(&mut stream).await?;
    if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
        return Err(format!("unexpected greeting: {}", greeting.trim_end()));
    }

    let cmd = format!("{LOGIN_TAG} LOGIN {} {}\r\n", quote(user), quote(password));
    stream
        .write_all(cmd.as_bytes())
        .await
        .map_err(|e| format!("write: {e}"))?;
    stream.flush().await.map_err(|e| format!("write: {e}"))?;

    loop {
        let line = read_line(&mut stream).await?;
        if let Some(reply) = line.strip_prefix(LOGIN_TAG).and_then(|r| r.strip_prefix(' ')) {
            if reply.starts_with("OK") {
                return Ok((true, stream));
            }
            if reply.starts_with("NO") || reply.starts_with("BAD") {
                return Ok((false, stream));
            }
            return Err(format!("unexpected login reply: {}", line.trim_end()));
        }
        // Untagged chatter (capabilities and the like): keep reading; the
        // attempt timeout bounds a server that never answers the tag.
    }
}

async fn logout(mut stream: BufStream<BoxStream>) {
    let cmd = format!("{LOGOUT_TAG} LOGOUT\r\n");
    if stream.write_all(cmd.as_bytes()).await.is_err() {
        return;
    }
    if stream.flush().await.is_err() {
        return;
    }
    // Drain until the tagged reply or EOF; the grace timeout around this
    // call bounds a server that keeps talking.
    loop {
        match read_line(&mut stream).await {
            Ok(line) if line.starts_with(LOGOUT_TAG) => return,
            Ok(_) => continue,
            Err(_) => return,
        }
    }
}

// ---------------------------------------------------------------------------

/// Attempt one credential against its resolved connection parameters.
///
/// The registry entry is re-validated first, so a malformed entry yields a
/// configuration outcome without a connection. The connect/handshake/LOGIN
/// exchange runs under `attempt_timeout`; any failure inside it becomes a
/// `ConnectionError` carrying the cause, never a propagated error.
pub async fn verify(
    cred: &Credential,
    params: &DomainParams,
    proxy: Option<&ProxyEndpoint>,
    attempt_timeout: Duration,
) -> Outcome {
    if !host_is_valid(&params.host) {
        return Outcome::InvalidDomainConfig(format!("invalid imap host {:?}", params.host));
    }
    if params.port == 0 {
        return Outcome::InvalidDomainConfig("port must be a positive integer".into());
    }
    let tls = match &params.secure {
        Secure::Tls => true,
        Secure::Plain => false,
        Secure::Invalid(raw) => {
            return Outcome::InvalidDomainConfig(format!("unrecognized secure value {raw:?}"));
        }
    };

    let exchange = async {
        let stream = open_stream(&params.host, params.port, tls, proxy).await?;
        login_phase(stream, &cred.email, &cred.password).await
    };

    match timeout(attempt_timeout, exchange).await {
        Ok(Ok((true, stream))) => {
            let _ = timeout(LOGOUT_GRACE.min(attempt_timeout), logout(stream)).await;
            Outcome::Success
        }
        Ok(Ok((false, _))) => Outcome::AuthFailure,
        Ok(Err(detail)) => Outcome::ConnectionError(detail),
        Err(_) => Outcome::ConnectionError(format!(
            "timed out after {:.1}s",
            attempt_timeout.as_secs_f64()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_escapes_imap_specials() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("p@ss word"), "\"p@ss word\"");
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }
}
