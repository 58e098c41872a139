use imap_validator::proxy::{ProxyEndpoint, ProxyError};
use imap_validator::record::{email_is_valid, parse_line};
use imap_validator::registry::{DomainRegistry, Secure};

const DOMAINS: &str = r#"
["example.com"]
imap-host = "imap.example.com"
port = 993
secure = "true"

["plain.org"]
imap-host = "mail.plain.org"
port = 143
secure = "no"

["broken.net"]
imap-host = "mail.broken.net"
port = 993
secure = "maybe"
"#;

#[test]
fn record_split_is_first_colon_only() {
    let c = parse_line("User@Example.COM:pa:ss:wd").unwrap();
    assert_eq!(c.email, "user@example.com");
    assert_eq!(c.password, "pa:ss:wd");
    assert_eq!(c.account(), "user");
    assert_eq!(c.domain(), "example.com");
    assert_eq!(c.combo(), "user@example.com:pa:ss:wd");
}

#[test]
fn separator_missing_means_no_record() {
    assert!(parse_line("just-some-text").is_none());
    assert!(parse_line("").is_none());
}

#[test]
fn identifier_gate_matches_the_intended_grammar() {
    assert!(email_is_valid("alice@example.com"));
    assert!(email_is_valid("a.b-c_d@mail.example.travel"));
    assert!(!email_is_valid("not-an-email"));
    assert!(!email_is_valid("x@no-tld"));
    assert!(!email_is_valid("x@tld.toolonghere"));
}

#[test]
fn registry_resolves_exact_keys_only() {
    let reg = DomainRegistry::from_toml_str(DOMAINS).unwrap();
    assert_eq!(reg.len(), 3);

    let p = reg.resolve("example.com").unwrap();
    assert_eq!(p.host, "imap.example.com");
    assert_eq!(p.port, 993);
    assert_eq!(p.secure, Secure::Tls);

    assert_eq!(reg.resolve("plain.org").unwrap().secure, Secure::Plain);
    assert_eq!(
        reg.resolve("broken.net").unwrap().secure,
        Secure::Invalid("maybe".into())
    );

    // No wildcard or subdomain matching.
    assert!(reg.resolve("sub.example.com").is_none());
    assert!(reg.resolve("unknown.tld").is_none());
}

#[test]
fn registry_rejects_malformed_files() {
    assert!(DomainRegistry::from_toml_str("not toml at all [").is_err());
    // A negative port cannot deserialize into a port number.
    assert!(DomainRegistry::from_toml_str(
        "[\"x.com\"]\nimap-host = \"h.x.com\"\nport = -1\nsecure = \"true\"\n"
    )
    .is_err());
}

#[test]
fn proxy_spec_contract() {
    assert_eq!(
        ProxyEndpoint::parse("127.0.0.1:1080").unwrap(),
        ProxyEndpoint {
            host: "127.0.0.1".into(),
            port: 1080
        }
    );
    assert!(ProxyEndpoint::parse("socks.example.com:9050").is_ok());
    assert!(ProxyEndpoint::parse("localhost:9050").is_ok());

    assert!(matches!(
        ProxyEndpoint::parse("badhost"),
        Err(ProxyError::Format(_))
    ));
    assert!(matches!(
        ProxyEndpoint::parse("a:b:c"),
        Err(ProxyError::Format(_))
    ));
    assert!(matches!(
        ProxyEndpoint::parse("under_score:1080"),
        Err(ProxyError::Host(_))
    ));
    assert!(matches!(
        ProxyEndpoint::parse("localhost:http"),
        Err(ProxyError::Port(_))
    ));
}
