// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-level parsing of the lvsd configuration file.

use lvsd_core::{
    CheckType, Fallback, ForwardingMethod, GlobalSettings, Protocol, RealAddr, RealServer,
    SchedulingMethod, ServiceAddr, VirtualService,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported to the operator at startup. Each message names the
/// offending key and the allowed values where applicable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("section [{section}]: invalid value for '{key}': {message}")]
    InvalidValue { section: String, key: String, message: String },

    #[error("section [{section}]: unknown key '{key}' (known keys: {known})")]
    UnknownKey { section: String, key: String, known: &'static str },

    #[error("section [{section}]: missing required key '{key}'")]
    MissingKey { section: String, key: String },
}

const GLOBAL_KEYS: &str = "autoreload, supervised, quiescent, readdquiescent, cleanstop, \
     checktimeout, negotiatetimeout, checkinterval, failurecount, smtp, logfile, callback, \
     maintenancedir, configfile";

const BOOL_VALUES: &str = "yes/no, on/off, true/false, 1/0";

/// Parse a configuration file from disk.
pub fn parse_file(path: &Path) -> Result<(GlobalSettings, Vec<VirtualService>), ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let (mut settings, virtuals) = parse_str(&text)?;
    settings.configfile = path.to_path_buf();
    Ok((settings, virtuals))
}

/// Parse configuration text into global settings and the virtual services,
/// in section order.
pub fn parse_str(text: &str) -> Result<(GlobalSettings, Vec<VirtualService>), ConfigError> {
    let sections = split_sections(text)?;

    let mut settings = GlobalSettings::default();
    let mut virtuals = Vec::new();
    for section in sections {
        if section.name == "global" {
            apply_global(&section, &mut settings)?;
        } else {
            virtuals.push(build_virtual(&section)?);
        }
    }
    Ok((settings, virtuals))
}

struct Entry {
    key: String,
    value: String,
}

struct Section {
    name: String,
    entries: Vec<Entry>,
}

fn split_sections(text: &str) -> Result<Vec<Section>, ConfigError> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(inner) = line.strip_prefix('[') {
            let Some(name) = inner.strip_suffix(']') else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    message: format!("unterminated section header '{line}'"),
                });
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    message: "empty section name".to_string(),
                });
            }
            sections.push(Section { name: name.to_string(), entries: Vec::new() });
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Syntax {
                line: line_no,
                message: format!("expected 'key = value', got '{line}'"),
            });
        };
        let Some(section) = sections.last_mut() else {
            return Err(ConfigError::Syntax {
                line: line_no,
                message: "key outside of any section".to_string(),
            });
        };
        section.entries.push(Entry {
            key: key.trim().to_ascii_lowercase(),
            value: value.trim().to_string(),
        });
    }

    Ok(sections)
}

fn apply_global(section: &Section, settings: &mut GlobalSettings) -> Result<(), ConfigError> {
    for entry in &section.entries {
        let key = entry.key.as_str();
        let value = entry.value.as_str();
        match key {
            "checktimeout" => settings.checktimeout = positive_u64(section, key, value)?,
            "negotiatetimeout" => settings.negotiatetimeout = positive_u64(section, key, value)?,
            "checkinterval" => settings.checkinterval = positive_u64(section, key, value)?,
            "failurecount" => settings.failurecount = positive_u32(section, key, value)?,
            "autoreload" => settings.autoreload = boolean(section, key, value)?,
            "supervised" => settings.supervised = boolean(section, key, value)?,
            "quiescent" => settings.quiescent = boolean(section, key, value)?,
            "readdquiescent" => settings.readdquiescent = boolean(section, key, value)?,
            "cleanstop" => settings.cleanstop = boolean(section, key, value)?,
            "smtp" => settings.smtp = Some(value.to_string()),
            "callback" => settings.callback = Some(value.to_string()),
            "logfile" => settings.logfile = PathBuf::from(value),
            "maintenancedir" => settings.maintenancedir = Some(PathBuf::from(value)),
            "configfile" => settings.configfile = PathBuf::from(value),
            _ => {
                return Err(ConfigError::UnknownKey {
                    section: section.name.clone(),
                    key: key.to_string(),
                    known: GLOBAL_KEYS,
                })
            }
        }
    }
    Ok(())
}

fn build_virtual(section: &Section) -> Result<VirtualService, ConfigError> {
    let mut host: Option<IpAddr> = None;
    let mut port: Option<u16> = None;
    let mut protocol: Option<Protocol> = None;
    let mut scheduler = SchedulingMethod::Wrr;
    let mut checktype = CheckType::Negotiate;
    let mut reals: Vec<RealServer> = Vec::new();
    let mut fallback: Option<Fallback> = None;

    // Identity first, then everything else onto the service skeleton.
    let mut staged: Vec<(&str, &str)> = Vec::new();
    for entry in &section.entries {
        let key = entry.key.as_str();
        let value = entry.value.as_str();
        match key {
            "host" => {
                host = Some(value.parse().map_err(|_| invalid(section, key, "expected an IP literal (no DNS resolution is performed)"))?)
            }
            "port" => port = Some(port_number(section, key, value)?),
            "protocol" => {
                protocol = Some(value.parse().map_err(|e: lvsd_core::service::UnknownVariant| {
                    invalid(section, key, &e.to_string())
                })?)
            }
            "scheduler" => {
                scheduler = value.parse().map_err(|e: lvsd_core::service::UnknownVariant| {
                    invalid(section, key, &e.to_string())
                })?
            }
            "checktype" => {
                let parsed: CheckType = value
                    .parse()
                    .map_err(|e: lvsd_core::service::UnknownVariant| {
                        invalid(section, key, &e.to_string())
                    })?;
                if !parsed.is_implemented() {
                    return Err(invalid(
                        section,
                        key,
                        &format!(
                            "'{parsed}' is reserved; implemented values: {}",
                            CheckType::IMPLEMENTED
                        ),
                    ));
                }
                checktype = parsed;
            }
            "real" => reals.push(parse_real(section, value)?),
            "fallback" => {
                if fallback.is_some() {
                    return Err(invalid(section, key, "only one fallback is allowed"));
                }
                fallback = Some(parse_fallback(section, value)?);
            }
            _ => staged.push((key, value)),
        }
    }

    let host = host.ok_or_else(|| missing(section, "host"))?;
    let port = port.ok_or_else(|| missing(section, "port"))?;
    let protocol = protocol.ok_or_else(|| missing(section, "protocol"))?;

    let mut virtual_service =
        VirtualService::new(ServiceAddr::new(host, port, protocol), scheduler, checktype);
    virtual_service.reals = reals;
    virtual_service.fallback = fallback;

    for (key, value) in staged {
        match key {
            "checkport" => virtual_service.checkport = Some(port_number(section, key, value)?),
            "checktimeout" => {
                virtual_service.checktimeout = Some(positive_u64(section, key, value)?)
            }
            "negotiatetimeout" => {
                virtual_service.negotiatetimeout = Some(positive_u64(section, key, value)?)
            }
            "checkinterval" => {
                virtual_service.checkinterval = Some(positive_u64(section, key, value)?)
            }
            "failurecount" => {
                virtual_service.failurecount = Some(positive_u32(section, key, value)?)
            }
            "cleanstop" => virtual_service.cleanstop = Some(boolean(section, key, value)?),
            "quiescent" => virtual_service.quiescent = Some(boolean(section, key, value)?),
            "readdquiescent" => {
                virtual_service.readdquiescent = Some(boolean(section, key, value)?)
            }
            "persistent" => virtual_service.persistent = Some(positive_u32(section, key, value)?),
            "httpmethod" => {
                virtual_service.httpmethod =
                    value.parse().map_err(|e: lvsd_core::service::UnknownVariant| {
                        invalid(section, key, &e.to_string())
                    })?
            }
            "service" => virtual_service.service = Some(value.to_ascii_lowercase()),
            "checkcommand" => virtual_service.checkcommand = Some(value.to_string()),
            "hostname" => virtual_service.hostname = Some(value.to_string()),
            "login" => virtual_service.login = Some(value.to_string()),
            "passwd" => virtual_service.passwd = Some(value.to_string()),
            "database" => virtual_service.database = Some(value.to_string()),
            "secret" => virtual_service.secret = Some(value.to_string()),
            "fingerprint" => virtual_service.fingerprint = Some(value.to_string()),
            "request" => virtual_service.request = Some(unquote(value)),
            "receive" => virtual_service.receive = Some(unquote(value)),
            // Email alerting and anything unrecognized are preserved as
            // custom attributes.
            _ => {
                virtual_service.custom.insert(key.to_string(), value.to_string());
            }
        }
    }

    validate_check_policy(section, &virtual_service)?;
    Ok(virtual_service)
}

/// Startup validation of the probe selection: `negotiate` needs a service
/// name, and the SQL probes need their connection parameters.
fn validate_check_policy(
    section: &Section,
    virtual_service: &VirtualService,
) -> Result<(), ConfigError> {
    if virtual_service.checktype != CheckType::Negotiate {
        return Ok(());
    }
    let Some(service) = virtual_service.service.as_deref() else {
        return Err(missing(section, "service"));
    };
    if matches!(service, "mysql" | "pgsql") {
        for (key, value) in [
            ("login", &virtual_service.login),
            ("database", &virtual_service.database),
            ("request", &virtual_service.request),
        ] {
            if value.is_none() {
                return Err(ConfigError::InvalidValue {
                    section: section.name.clone(),
                    key: key.to_string(),
                    message: format!("required for the '{service}' check"),
                });
            }
        }
    }
    Ok(())
}

/// Parse a real-server host string: `IP:PORT method [weight] ["request" ["receive"]]`.
fn parse_real(section: &Section, value: &str) -> Result<RealServer, ConfigError> {
    let tokens = tokenize(value)
        .map_err(|message| invalid(section, "real", &message))?;
    if tokens.len() < 2 {
        return Err(invalid(section, "real", "expected 'IP:PORT method [weight]'"));
    }

    let (ip, port) =
        parse_endpoint(&tokens[0].text).map_err(|message| invalid(section, "real", &message))?;
    let method: ForwardingMethod = tokens[1]
        .text
        .parse()
        .map_err(|e: lvsd_core::service::UnknownVariant| invalid(section, "real", &e.to_string()))?;

    let mut real = RealServer::new(RealAddr::new(ip, port), method);

    let mut rest = &tokens[2..];
    if let Some(first) = rest.first() {
        if !first.quoted {
            let weight: u32 = first
                .text
                .parse()
                .map_err(|_| invalid(section, "real", "weight must be an integer"))?;
            if weight > 65_535 {
                return Err(invalid(section, "real", "weight must be in 0..=65535"));
            }
            real.weight = weight;
            rest = &rest[1..];
        }
    }
    match rest {
        [] => {}
        [request] => real.request = Some(request.text.clone()),
        [request, receive] => {
            real.request = Some(request.text.clone());
            real.receive = Some(receive.text.clone());
        }
        _ => return Err(invalid(section, "real", "too many fields")),
    }

    Ok(real)
}

/// Parse the fallback host string: `IP:PORT method`.
fn parse_fallback(section: &Section, value: &str) -> Result<Fallback, ConfigError> {
    let tokens =
        tokenize(value).map_err(|message| invalid(section, "fallback", &message))?;
    if tokens.len() != 2 {
        return Err(invalid(section, "fallback", "expected 'IP:PORT method'"));
    }
    let (ip, port) = parse_endpoint(&tokens[0].text)
        .map_err(|message| invalid(section, "fallback", &message))?;
    let method: ForwardingMethod = tokens[1].text.parse().map_err(
        |e: lvsd_core::service::UnknownVariant| invalid(section, "fallback", &e.to_string()),
    )?;
    Ok(Fallback::new(RealAddr::new(ip, port), method))
}

struct Token {
    text: String,
    quoted: bool,
}

/// Split a host string into whitespace-separated tokens, honoring double
/// quotes for the per-real request/receive overrides.
fn tokenize(value: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = value.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => text.push(ch),
                    None => return Err("unterminated quoted string".to_string()),
                }
            }
            tokens.push(Token { text, quoted: true });
        } else {
            let mut text = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                text.push(ch);
                chars.next();
            }
            tokens.push(Token { text, quoted: false });
        }
    }
    Ok(tokens)
}

/// Parse `IP:PORT`, with IPv6 addresses in brackets (`[2001:db8::1]:80`).
fn parse_endpoint(s: &str) -> Result<(IpAddr, u16), String> {
    let (ip_str, port_str) = if let Some(rest) = s.strip_prefix('[') {
        rest.split_once("]:")
            .ok_or_else(|| format!("'{s}' is not of the form [IPv6]:PORT"))?
    } else {
        s.rsplit_once(':').ok_or_else(|| format!("'{s}' is not of the form IP:PORT"))?
    };
    let ip: IpAddr =
        ip_str.parse().map_err(|_| format!("'{ip_str}' is not an IP literal"))?;
    let port: u16 = port_str.parse().map_err(|_| format!("'{port_str}' is not a port"))?;
    if port == 0 {
        return Err("port must be in 1..=65535".to_string());
    }
    Ok((ip, port))
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn boolean(section: &Section, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" | "1" => Ok(true),
        "no" | "off" | "false" | "0" => Ok(false),
        _ => Err(invalid(section, key, &format!("'{value}' is not a boolean ({BOOL_VALUES})"))),
    }
}

fn positive_u64(section: &Section, key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(section, key, "expected a positive integer")),
    }
}

fn positive_u32(section: &Section, key: &str, value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(section, key, "expected a positive integer")),
    }
}

fn port_number(section: &Section, key: &str, value: &str) -> Result<u16, ConfigError> {
    match value.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(section, key, "expected a port in 1..=65535")),
    }
}

fn invalid(section: &Section, key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.name.clone(),
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn missing(section: &Section, key: &str) -> ConfigError {
    ConfigError::MissingKey { section: section.name.clone(), key: key.to_string() }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
