// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lvsd_core::CheckType;

const BASIC: &str = r#"
# lvsd configuration
[global]
checkinterval = 5
failurecount = 3
quiescent = no
autoreload = yes
logfile = /tmp/lvsd.log

[web]
host = 10.0.0.1
port = 80
protocol = tcp
scheduler = wrr
checktype = negotiate
service = http
request = check.php
receive = Running
real = 10.0.1.1:80 gate
real = 10.0.1.2:80 gate 5
fallback = 127.0.0.1:80 gate
"#;

#[test]
fn parses_global_and_virtual_sections() {
    let (settings, virtuals) = parse_str(BASIC).unwrap();

    assert_eq!(settings.checkinterval, 5);
    assert_eq!(settings.failurecount, 3);
    assert!(!settings.quiescent);
    assert!(settings.autoreload);
    assert_eq!(settings.logfile, PathBuf::from("/tmp/lvsd.log"));
    // Untouched keys keep their defaults.
    assert_eq!(settings.checktimeout, 5);
    assert!(settings.cleanstop);

    assert_eq!(virtuals.len(), 1);
    let v = &virtuals[0];
    assert_eq!(v.addr.endpoint(), "10.0.0.1:80");
    assert_eq!(v.checktype, CheckType::Negotiate);
    assert_eq!(v.service.as_deref(), Some("http"));
    assert_eq!(v.request.as_deref(), Some("check.php"));
    assert_eq!(v.receive.as_deref(), Some("Running"));
    assert_eq!(v.reals.len(), 2);
    assert_eq!(v.reals[0].weight, 1);
    assert_eq!(v.reals[1].weight, 5);
    let fb = v.fallback.as_ref().unwrap();
    assert_eq!(fb.addr.endpoint(), "127.0.0.1:80");
}

#[test]
fn duplicate_real_keys_accumulate_in_order() {
    let (_, virtuals) = parse_str(BASIC).unwrap();
    let ips: Vec<String> =
        virtuals[0].reals.iter().map(|r| r.addr.ip.to_string()).collect();
    assert_eq!(ips, vec!["10.0.1.1", "10.0.1.2"]);
}

#[test]
fn real_line_accepts_request_receive_overrides() {
    let text = r#"
[db]
host = 10.0.0.2
port = 80
protocol = tcp
checktype = connect
real = 10.0.1.9:80 masq 2 "probe.php" "OK"
"#;
    let (_, virtuals) = parse_str(text).unwrap();
    let real = &virtuals[0].reals[0];
    assert_eq!(real.weight, 2);
    assert_eq!(real.request.as_deref(), Some("probe.php"));
    assert_eq!(real.receive.as_deref(), Some("OK"));
}

#[test]
fn real_line_weight_is_optional_before_overrides() {
    let text = r#"
[db]
host = 10.0.0.2
port = 80
protocol = tcp
checktype = connect
real = 10.0.1.9:80 ipip "probe.php"
"#;
    let (_, virtuals) = parse_str(text).unwrap();
    let real = &virtuals[0].reals[0];
    assert_eq!(real.weight, 1);
    assert_eq!(real.request.as_deref(), Some("probe.php"));
}

#[test]
fn ipv6_reals_are_parsed() {
    let text = r#"
[v6]
host = 2001:db8::1
port = 443
protocol = tcp
checktype = connect
real = [2001:db8::10]:443 gate
"#;
    let (_, virtuals) = parse_str(text).unwrap();
    assert_eq!(virtuals[0].addr.endpoint(), "[2001:db8::1]:443");
    assert_eq!(virtuals[0].reals[0].addr.endpoint(), "[2001:db8::10]:443");
}

#[yare::parameterized(
    yes = { "yes", true },
    on = { "on", true },
    true_word = { "true", true },
    one = { "1", true },
    no = { "no", false },
    off = { "off", false },
    false_word = { "false", false },
    zero = { "0", false },
)]
fn boolean_spellings(spelling: &str, expected: bool) {
    let text = format!("[global]\nquiescent = {spelling}\n");
    let (settings, _) = parse_str(&text).unwrap();
    assert_eq!(settings.quiescent, expected);
}

#[test]
fn unknown_virtual_keys_become_custom_attributes() {
    let text = r#"
[web]
host = 10.0.0.1
port = 80
protocol = tcp
checktype = connect
emailalert = ops@example.net
frobnicate = 7
"#;
    let (_, virtuals) = parse_str(text).unwrap();
    assert_eq!(virtuals[0].custom.get("emailalert").map(String::as_str), Some("ops@example.net"));
    assert_eq!(virtuals[0].custom.get("frobnicate").map(String::as_str), Some("7"));
}

#[test]
fn reserved_checktype_is_rejected() {
    let text = "[web]\nhost = 10.0.0.1\nport = 80\nprotocol = tcp\nchecktype = ping\n";
    let err = parse_str(text).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("reserved"), "{message}");
    assert!(message.contains("connect, negotiate"), "{message}");
}

#[test]
fn unknown_checktype_lists_allowed_values() {
    let text = "[web]\nhost = 10.0.0.1\nport = 80\nprotocol = tcp\nchecktype = sonar\n";
    let err = parse_str(text).unwrap_err();
    assert!(err.to_string().contains("negotiate_connect"), "{err}");
}

#[test]
fn negotiate_requires_a_service() {
    let text = "[web]\nhost = 10.0.0.1\nport = 80\nprotocol = tcp\n";
    let err = parse_str(text).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey { ref key, .. } if key == "service"), "{err}");
}

#[yare::parameterized(
    login = { "database = d\nrequest = q" },
    database = { "login = u\nrequest = q" },
    request = { "login = u\ndatabase = d" },
)]
fn sql_checks_require_connection_parameters(present: &str) {
    let text = format!(
        "[db]\nhost = 10.0.0.1\nport = 3306\nprotocol = tcp\nservice = mysql\n{present}\n"
    );
    let err = parse_str(&text).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }), "{err}");
}

#[test]
fn hostname_without_dns_is_rejected() {
    let text = "[web]\nhost = www.example.net\nport = 80\nprotocol = tcp\nchecktype = connect\n";
    let err = parse_str(text).unwrap_err();
    assert!(err.to_string().contains("IP literal"), "{err}");
}

#[yare::parameterized(
    host = { "port = 80\nprotocol = tcp" , "host" },
    port = { "host = 10.0.0.1\nprotocol = tcp", "port" },
    protocol = { "host = 10.0.0.1\nport = 80", "protocol" },
)]
fn identity_keys_are_required(body: &str, expected_key: &str) {
    let text = format!("[web]\n{body}\nchecktype = connect\n");
    let err = parse_str(&text).unwrap_err();
    assert!(
        matches!(err, ConfigError::MissingKey { ref key, .. } if key == expected_key),
        "{err}"
    );
}

#[test]
fn second_fallback_is_rejected() {
    let text = "[web]\nhost = 10.0.0.1\nport = 80\nprotocol = tcp\nchecktype = connect\n\
        fallback = 127.0.0.1:80 gate\nfallback = 127.0.0.2:80 gate\n";
    let err = parse_str(text).unwrap_err();
    assert!(err.to_string().contains("only one fallback"), "{err}");
}

#[test]
fn key_outside_section_is_a_syntax_error() {
    let err = parse_str("checkinterval = 2\n").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { line: 1, .. }), "{err}");
}

#[test]
fn unknown_global_key_is_rejected() {
    let err = parse_str("[global]\nchekinterval = 2\n").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownKey { .. }), "{err}");
}

#[test]
fn parse_file_records_the_config_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lvsd.conf");
    std::fs::write(&path, BASIC).unwrap();

    let (settings, virtuals) = parse_file(&path).unwrap();
    assert_eq!(settings.configfile, path);
    assert_eq!(virtuals.len(), 1);
}

#[test]
fn missing_file_reports_the_path() {
    let err = parse_file(Path::new("/nonexistent/lvsd.conf")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/lvsd.conf"), "{err}");
}
