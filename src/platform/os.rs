// LogScout - platform/os.rs
//
// Host OS identification and logging-service detection.
//
// The distribution comes from os-release (`ID`, `ID_LIKE`, `VERSION_ID`).
// Derivatives are checked before the base distribution they claim
// compatibility with: Ubuntu declares `ID_LIKE=debian`, Mint declares
// `ID_LIKE="ubuntu debian"`.
//
// Each daemon (journald, syslog-ng, rsyslog) and logrotate is probed on its
// own scoped thread; the probes share nothing but the read-only filesystem.

use crate::core::model::{
    ConfigSource, ConfiguredLogFile, DetectedLoggingService, LogType, LoggingServiceType, OsFamily,
    OsInfo, TimestampStyle,
};
use crate::platform::fs::FileSystem;
use crate::platform::sources::{logrotate, rsyslog, syslog_ng};
use crate::util::constants;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// OS identification
// =============================================================================

/// Parse os-release `KEY=value` lines, unquoting values.
pub fn parse_os_release(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim().trim_matches(|c| c == '"' || c == '\'');
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

fn family_for_id(id: &str) -> Option<OsFamily> {
    match id {
        "ubuntu" => Some(OsFamily::Ubuntu),
        "debian" => Some(OsFamily::Debian),
        "rhel" | "centos" | "fedora" | "rocky" | "almalinux" | "ol" | "amzn" => Some(OsFamily::Rhel),
        "suse" | "sles" | "sled" | "opensuse" => Some(OsFamily::Suse),
        "arch" | "manjaro" | "endeavouros" => Some(OsFamily::Arch),
        "alpine" => Some(OsFamily::Alpine),
        _ if id.starts_with("opensuse") => Some(OsFamily::Suse),
        _ => None,
    }
}

/// `major.minor` of a `VERSION_ID` such as `12`, `22.04` or `23.10`.
fn version_pair(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts
        .next()
        .and_then(|m| m.trim().parse().ok())
        .unwrap_or(0);
    Some((major, minor))
}

/// Whether the default syslog template of this release writes RFC 3339
/// timestamps.
fn uses_iso8601(family: OsFamily, version: Option<&str>) -> bool {
    let at_least = |want: (u32, u32)| {
        version
            .and_then(version_pair)
            .is_some_and(|have| have >= want)
    };
    match family {
        OsFamily::Debian => at_least((12, 0)),
        OsFamily::Ubuntu => at_least((23, 10)),
        // No syslog daemon by default; only journald output.
        OsFamily::Arch | OsFamily::SystemdGeneric => true,
        _ => false,
    }
}

fn os_info(family: OsFamily, version: Option<String>) -> OsInfo {
    let iso = uses_iso8601(family, version.as_deref());
    OsInfo {
        os_type: family,
        version,
        log_format: if iso {
            TimestampStyle::Iso8601
        } else {
            TimestampStyle::Bsd
        },
        uses_iso8601: iso,
    }
}

/// Classify parsed os-release fields. `None` when neither `ID` nor
/// `ID_LIKE` names a known family.
pub fn classify_os_release(fields: &HashMap<String, String>) -> Option<OsInfo> {
    let version = fields.get("VERSION_ID").filter(|v| !v.is_empty()).cloned();
    let id = fields
        .get("ID")
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(family) = family_for_id(&id) {
        return Some(os_info(family, version));
    }

    let like: Vec<String> = fields
        .get("ID_LIKE")
        .map(|s| s.split_whitespace().map(str::to_ascii_lowercase).collect())
        .unwrap_or_default();
    // Most specific first: an Ubuntu derivative also lists debian.
    let order = [
        OsFamily::Ubuntu,
        OsFamily::Debian,
        OsFamily::Rhel,
        OsFamily::Suse,
        OsFamily::Arch,
        OsFamily::Alpine,
    ];
    order
        .into_iter()
        .find(|family| like.iter().any(|l| family_for_id(l) == Some(*family)))
        .map(|family| os_info(family, version))
}

fn systemd_present(fs: &dyn FileSystem) -> bool {
    constants::SYSTEMD_MARKERS
        .iter()
        .any(|p| fs.exists(Path::new(p)))
}

/// Identify the host OS. Falls back to a systemd presence check, then to
/// `Unknown` with BSD timestamps.
pub fn detect_os(fs: &dyn FileSystem) -> OsInfo {
    let mut version = None;
    for path in constants::OS_RELEASE_PATHS {
        let Ok(text) = fs.read_to_string(Path::new(path)) else {
            continue;
        };
        let fields = parse_os_release(&text);
        if let Some(info) = classify_os_release(&fields) {
            tracing::info!(os = ?info.os_type, version = ?info.version, iso8601 = info.uses_iso8601, "Host OS detected");
            return info;
        }
        tracing::debug!(path, id = ?fields.get("ID"), "Unrecognised distribution");
        version = fields.get("VERSION_ID").cloned();
        break;
    }

    if systemd_present(fs) {
        tracing::info!("No known distribution, systemd present");
        return os_info(OsFamily::SystemdGeneric, version);
    }
    tracing::info!("Host OS unknown, assuming BSD syslog timestamps");
    OsInfo {
        version,
        ..OsInfo::default()
    }
}

// =============================================================================
// Logging services
// =============================================================================

/// Files a daemon writes by default on this OS family, used when its
/// configuration names none.
pub fn default_log_files(family: OsFamily) -> Vec<ConfiguredLogFile> {
    let defaults: &[(&str, LogType)] = match family {
        OsFamily::Ubuntu | OsFamily::Debian => &[
            ("/var/log/syslog", LogType::Syslog),
            ("/var/log/auth.log", LogType::Auth),
            ("/var/log/kern.log", LogType::Kern),
            ("/var/log/mail.log", LogType::Mail),
        ],
        OsFamily::Rhel => &[
            ("/var/log/messages", LogType::Syslog),
            ("/var/log/secure", LogType::Auth),
            ("/var/log/maillog", LogType::Mail),
            ("/var/log/cron", LogType::Cron),
        ],
        OsFamily::Suse => &[
            ("/var/log/messages", LogType::Syslog),
            ("/var/log/mail", LogType::Mail),
        ],
        _ => &[("/var/log/messages", LogType::Syslog)],
    };
    defaults
        .iter()
        .map(|(p, t)| ConfiguredLogFile::new(PathBuf::from(p), *t, ConfigSource::Default))
        .collect()
}

fn first_existing(fs: &dyn FileSystem, paths: &[&str]) -> Option<PathBuf> {
    paths
        .iter()
        .map(PathBuf::from)
        .find(|p| fs.exists(p))
}

/// Probe one daemon. `None` when neither its binary nor its config exists.
pub fn probe_service(
    fs: &dyn FileSystem,
    service_type: LoggingServiceType,
    os: &OsInfo,
) -> Option<DetectedLoggingService> {
    let (binaries, config): (&[&str], &str) = match service_type {
        LoggingServiceType::Journald => (constants::JOURNALD_BINARIES, constants::JOURNALD_CONFIG_PATH),
        LoggingServiceType::SyslogNg => (constants::SYSLOG_NG_BINARIES, constants::SYSLOG_NG_CONFIG_PATH),
        LoggingServiceType::Rsyslog => (constants::RSYSLOG_BINARIES, constants::RSYSLOG_CONFIG_PATH),
        LoggingServiceType::None => return None,
    };

    let binary = first_existing(fs, binaries);
    let config_path = Path::new(config);
    let config_exists = fs.exists(config_path);
    if binary.is_none() && !config_exists {
        tracing::debug!(service = %service_type, "Logging service not present");
        return None;
    }

    let mut files = match (service_type, config_exists) {
        (LoggingServiceType::Rsyslog, true) => rsyslog::parse_rsyslog_config(fs, config_path),
        (LoggingServiceType::SyslogNg, true) => syslog_ng::parse_syslog_ng_config(fs, config_path),
        // journald writes binary journals only.
        _ => Vec::new(),
    };
    if files.is_empty() {
        tracing::debug!(service = %service_type, os = ?os.os_type, "No files configured, using OS defaults");
        files = default_log_files(os.os_type);
    }

    tracing::info!(
        service = %service_type,
        active = binary.is_some(),
        files = files.len(),
        "Logging service detected"
    );
    Some(DetectedLoggingService {
        service_type,
        active: binary.is_some(),
        config_path: config_exists.then(|| config_path.to_path_buf()),
        files,
    })
}

/// Logging services present on the host plus the files logrotate rotates.
#[derive(Debug, Clone, Default)]
pub struct ServiceDiscovery {
    pub services: Vec<DetectedLoggingService>,
    pub rotated_files: Vec<ConfiguredLogFile>,
}

/// Probe every daemon and logrotate concurrently, then copy rotation
/// metadata onto daemon files with the same path.
pub fn discover_services(fs: &dyn FileSystem, os: &OsInfo) -> ServiceDiscovery {
    let (mut services, rotated_files) = std::thread::scope(|scope| {
        let probes: Vec<_> = LoggingServiceType::PRIORITY
            .iter()
            .map(|&service| scope.spawn(move || probe_service(fs, service, os)))
            .collect();
        let rotation = scope.spawn(|| {
            logrotate::parse_logrotate_config(fs, Path::new(constants::LOGROTATE_CONFIG_PATH))
        });

        let services: Vec<DetectedLoggingService> = probes
            .into_iter()
            .filter_map(|h| match h.join() {
                Ok(found) => found,
                Err(_) => {
                    tracing::warn!("Service probe thread panicked");
                    None
                }
            })
            .collect();
        let rotated = rotation.join().unwrap_or_else(|_| {
            tracing::warn!("logrotate reader thread panicked");
            Vec::new()
        });
        (services, rotated)
    });

    for service in &mut services {
        logrotate::apply_rotation_metadata(&mut service.files, &rotated_files);
    }
    ServiceDiscovery {
        services,
        rotated_files,
    }
}

pub fn detect_logging_services(fs: &dyn FileSystem, os: &OsInfo) -> Vec<DetectedLoggingService> {
    discover_services(fs, os).services
}

/// First active service in preference order (journald, syslog-ng,
/// rsyslog), or `None`.
pub fn get_primary_logging_service(services: &[DetectedLoggingService]) -> LoggingServiceType {
    LoggingServiceType::PRIORITY
        .into_iter()
        .find(|t| services.iter().any(|s| s.service_type == *t && s.active))
        .unwrap_or(LoggingServiceType::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::RotationPattern;
    use crate::platform::fs::{LocalFs, PathTranslator};
    use std::fs;

    fn write(root: &Path, host_path: &str, content: &str) {
        let p = root.join(host_path.trim_start_matches('/'));
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, content).unwrap();
    }

    fn host(dir: &tempfile::TempDir) -> LocalFs {
        LocalFs::new(PathTranslator::new(Some(dir.path().to_path_buf())))
    }

    fn classify(text: &str) -> Option<OsInfo> {
        classify_os_release(&parse_os_release(text))
    }

    #[test]
    fn test_derivative_checked_before_base() {
        let info = classify("ID=ubuntu\nID_LIKE=debian\nVERSION_ID=\"22.04\"\n").unwrap();
        assert_eq!(info.os_type, OsFamily::Ubuntu);
        assert_eq!(info.version.as_deref(), Some("22.04"));
        assert!(!info.uses_iso8601);
        assert_eq!(info.log_format, TimestampStyle::Bsd);

        let mint = classify("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\nVERSION_ID=21.2\n").unwrap();
        assert_eq!(mint.os_type, OsFamily::Ubuntu);

        let rocky = classify("ID=\"rocky\"\nID_LIKE=\"rhel centos fedora\"\n").unwrap();
        assert_eq!(rocky.os_type, OsFamily::Rhel);

        let tumbleweed = classify("ID=\"opensuse-tumbleweed\"\nID_LIKE=\"opensuse suse\"\n").unwrap();
        assert_eq!(tumbleweed.os_type, OsFamily::Suse);

        assert!(classify("ID=gentoo\n").is_none());
    }

    #[test]
    fn test_iso8601_releases() {
        assert!(classify("ID=debian\nVERSION_ID=\"12\"\n").unwrap().uses_iso8601);
        assert!(!classify("ID=debian\nVERSION_ID=\"11\"\n").unwrap().uses_iso8601);
        assert!(classify("ID=ubuntu\nVERSION_ID=\"24.04\"\n").unwrap().uses_iso8601);
        assert!(classify("ID=ubuntu\nVERSION_ID=\"23.10\"\n").unwrap().uses_iso8601);
        assert!(!classify("ID=ubuntu\nVERSION_ID=\"23.04\"\n").unwrap().uses_iso8601);
        assert!(!classify("ID=fedora\nVERSION_ID=40\n").unwrap().uses_iso8601);
    }

    #[test]
    fn test_detect_os_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let info = detect_os(&host(&dir));
        assert_eq!(info, OsInfo::default());

        fs::create_dir_all(dir.path().join("run/systemd/system")).unwrap();
        let info = detect_os(&host(&dir));
        assert_eq!(info.os_type, OsFamily::SystemdGeneric);
        assert!(info.uses_iso8601);

        write(dir.path(), "/usr/lib/os-release", "ID=alpine\nVERSION_ID=3.19.1\n");
        assert_eq!(detect_os(&host(&dir)).os_type, OsFamily::Alpine);
    }

    #[test]
    fn test_services_and_primary() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "/usr/sbin/rsyslogd", "");
        write(
            dir.path(),
            "/etc/rsyslog.conf",
            "auth,authpriv.* /var/log/auth.log\n*.*;auth,authpriv.none -/var/log/syslog\n",
        );
        write(dir.path(), "/lib/systemd/systemd-journald", "");
        write(
            dir.path(),
            "/etc/logrotate.conf",
            "/var/log/syslog {\n  daily\n  rotate 7\n}\n",
        );
        let os = OsInfo {
            os_type: OsFamily::Debian,
            ..OsInfo::default()
        };

        let found = discover_services(&host(&dir), &os);
        let types: Vec<LoggingServiceType> = found.services.iter().map(|s| s.service_type).collect();
        assert_eq!(types, vec![LoggingServiceType::Journald, LoggingServiceType::Rsyslog]);

        let journald = &found.services[0];
        assert!(journald.active);
        assert!(journald.files.iter().all(|f| f.source == ConfigSource::Default));
        assert!(journald.files.iter().any(|f| f.path == Path::new("/var/log/auth.log")));

        let rsyslog = &found.services[1];
        assert_eq!(rsyslog.config_path, Some(PathBuf::from("/etc/rsyslog.conf")));
        assert_eq!(rsyslog.files.len(), 2);
        let syslog = rsyslog
            .files
            .iter()
            .find(|f| f.path == Path::new("/var/log/syslog"))
            .unwrap();
        assert_eq!(syslog.rotation_pattern, Some(RotationPattern::Daily));
        assert_eq!(syslog.keep_count, Some(7));
        assert_eq!(found.rotated_files.len(), 1);

        assert_eq!(get_primary_logging_service(&found.services), LoggingServiceType::Journald);
    }

    #[test]
    fn test_config_without_binary_is_inactive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "/etc/syslog-ng/syslog-ng.conf", "@version: 4.0\n");
        let services = detect_logging_services(&host(&dir), &OsInfo::default());
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].service_type, LoggingServiceType::SyslogNg);
        assert!(!services[0].active);
        assert_eq!(services[0].files[0].path, PathBuf::from("/var/log/messages"));
        assert_eq!(get_primary_logging_service(&services), LoggingServiceType::None);
    }
}
