//! Built-in rule catalog.
//!
//! The default safety rules loaded when no custom set is injected. Pattern
//! lists are plain substrings; the engine lowercases both sides, so entries
//! here stay lowercase.

use warden_types::{RuleId, Severity};

use crate::{PolicyRule, RuleCategory};

fn rule(
    id: &str,
    name: &str,
    description: &str,
    category: RuleCategory,
    severity: Severity,
    patterns: &[&str],
) -> PolicyRule {
    PolicyRule {
        id: RuleId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        category,
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        severity,
    }
}

/// The default safety catalog.
pub fn builtin_rules() -> Vec<PolicyRule> {
    vec![
        rule(
            "sys-001",
            "Sensitive System File Access",
            "Access to credential and account databases of the host system",
            RuleCategory::SystemIntegrity,
            Severity::Critical,
            &[
                "/etc/passwd",
                "/etc/shadow",
                "/etc/sudoers",
                ".ssh/",
                "id_rsa",
                "authorized_keys",
            ],
        ),
        rule(
            "sys-002",
            "System Configuration Tampering",
            "Writes to boot, init or kernel configuration",
            RuleCategory::SystemIntegrity,
            Severity::High,
            &["/boot/", "/etc/systemd", "crontab -e", "/etc/init.d"],
        ),
        rule(
            "exfil-001",
            "Data Exfiltration Channel",
            "Moving local data toward an external sink",
            RuleCategory::DataExfiltration,
            Severity::High,
            &["scp ", "rsync ", "curl -t", "nc -l", "base64 | curl", "upload"],
        ),
        rule(
            "priv-001",
            "Privilege Escalation",
            "Attempts to gain or broaden privileges",
            RuleCategory::PrivilegeEscalation,
            Severity::High,
            &["sudo ", "setuid", "chmod 777", "chown root", "pkexec"],
        ),
        rule(
            "exec-001",
            "Destructive Command",
            "Commands that irreversibly destroy data or state",
            RuleCategory::DestructiveCommand,
            Severity::Critical,
            &["rm -rf", "mkfs", "dd if=", "format c:", ":(){ :|:& };:"],
        ),
        rule(
            "exec-002",
            "Remote Code Execution",
            "Piping remote content straight into an interpreter",
            RuleCategory::DestructiveCommand,
            Severity::High,
            &["curl | sh", "curl | bash", "wget | sh", "| bash -", "eval("],
        ),
        rule(
            "net-001",
            "Suspicious Network Activity",
            "Port scanning, raw sockets and tunnel setup",
            RuleCategory::NetworkAbuse,
            Severity::Medium,
            &["nmap ", "masscan", "reverse shell", "ngrok", "/dev/tcp/"],
        ),
        rule(
            "cred-001",
            "Credential Harvesting",
            "Reading or searching for secrets and tokens",
            RuleCategory::CredentialAccess,
            Severity::High,
            &[
                "api_key",
                "api key",
                "secret_key",
                "password",
                "credentials",
                "access_token",
                ".aws/",
                ".env",
            ],
        ),
    ]
}
