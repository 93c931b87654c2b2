//! Dangerous-command interception.
//!
//! A prioritized rule list is evaluated once per input; the first matching rule
//! decides. Critical and high severity block the command outright, medium and
//! low attach a warning and let it run, and "embarrassing" commands get a bit of
//! narrative and a token XP award instead of running. The bypass is an explicit
//! flag on the interpret call, never a substring of the input.

use crate::engine::pattern::{CommandLine, Pattern};
use crate::engine::types::Severity;

#[derive(Debug, Clone)]
pub struct SafetyRule {
    pub id: &'static str,
    pub severity: Severity,
    pub pattern: Pattern,
    pub message: &'static str,
    /// XP for embarrassing rules; ignored for every other severity.
    pub xp: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SafetyVerdict {
    Clear,
    Bypassed,
    Warn { rule_id: &'static str, severity: Severity, message: &'static str },
    Block { rule_id: &'static str, severity: Severity, message: &'static str },
    Embarrassing { rule_id: &'static str, message: &'static str, xp: u32 },
}

fn rule(id: &'static str, severity: Severity, pattern: Pattern, message: &'static str) -> SafetyRule {
    SafetyRule {
        id,
        severity,
        pattern,
        message,
        xp: 0,
    }
}

/// Rules in evaluation order (highest priority first).
pub fn default_rules() -> Vec<SafetyRule> {
    vec![
        rule(
            "wipe_root",
            Severity::Critical,
            Pattern::phrase("rm -rf /"),
            "Recursive delete of the root filesystem. Security has been notified.",
        ),
        rule(
            "wipe_root_glob",
            Severity::Critical,
            Pattern::phrase("rm -rf /*"),
            "Recursive delete of every top-level directory. Security has been notified.",
        ),
        rule(
            "fork_bomb",
            Severity::Critical,
            Pattern::compact(":(){ :|:& };:"),
            "Fork bomb detected. The SOC dashboard just turned red.",
        ),
        rule(
            "format_disk",
            Severity::Critical,
            Pattern::program("mkfs"),
            "Formatting a filesystem is not part of your job description.",
        ),
        rule(
            "overwrite_device",
            Severity::Critical,
            Pattern::ArgPrefix {
                command: "dd".to_string(),
                prefix: "of=/dev/".to_string(),
            },
            "Writing raw data over a block device. Blocked.",
        ),
        rule(
            "recursive_wildcard_delete",
            Severity::High,
            Pattern::FlagWithOperand {
                command: "rm".to_string(),
                flag: 'r',
                operand: "*".to_string(),
            },
            "Recursive delete with a wildcard. Too broad to allow.",
        ),
        rule(
            "world_writable_root",
            Severity::High,
            Pattern::phrase("chmod -r 777 /"),
            "Making the whole filesystem world-writable. Blocked.",
        ),
        rule(
            "redirect_to_device",
            Severity::High,
            Pattern::compact(">/dev/sd"),
            "Redirecting output onto a disk device. Blocked.",
        ),
        rule(
            "kill_init",
            Severity::Medium,
            Pattern::phrase("kill -9 1"),
            "Killing PID 1 would take the whole box down. Think twice.",
        ),
        rule(
            "shutdown",
            Severity::Medium,
            Pattern::phrase("shutdown"),
            "Shutting down a shared server in business hours is frowned upon.",
        ),
        rule(
            "reboot",
            Severity::Medium,
            Pattern::phrase("reboot"),
            "Rebooting a shared server in business hours is frowned upon.",
        ),
        rule(
            "clear_history",
            Severity::Low,
            Pattern::phrase("history -c"),
            "Clearing shell history looks suspicious in an audit.",
        ),
        rule(
            "chmod_777",
            Severity::Low,
            Pattern::phrase("chmod 777"),
            "World-writable permissions are rarely what you want.",
        ),
        SafetyRule {
            id: "sandwich",
            severity: Severity::Embarrassing,
            pattern: Pattern::leading("sudo make me a sandwich"),
            message: "The terminal prints 'Okay.' A coworker two desks over laughs. Nobody makes you a sandwich.",
            xp: 5,
        },
        SafetyRule {
            id: "steam_locomotive",
            severity: Severity::Embarrassing,
            pattern: Pattern::leading("sl"),
            message: "A steam locomotive chugs across your screen. Typo noted in your performance review.",
            xp: 1,
        },
        SafetyRule {
            id: "vim_escape",
            severity: Severity::Embarrassing,
            pattern: Pattern::leading(":q!"),
            message: "You are not in vim. You have never been in vim. The vim is inside you.",
            xp: 1,
        },
    ]
}

/// Classify a parsed line against `rules`, first match wins.
pub fn classify(rules: &[SafetyRule], line: &CommandLine, bypass: bool) -> SafetyVerdict {
    if bypass {
        return SafetyVerdict::Bypassed;
    }
    let Some(hit) = rules.iter().find(|r| r.pattern.matches(line)) else {
        return SafetyVerdict::Clear;
    };
    match hit.severity {
        Severity::Critical | Severity::High => SafetyVerdict::Block {
            rule_id: hit.id,
            severity: hit.severity,
            message: hit.message,
        },
        Severity::Medium | Severity::Low => SafetyVerdict::Warn {
            rule_id: hit.id,
            severity: hit.severity,
            message: hit.message,
        },
        Severity::Embarrassing => SafetyVerdict::Embarrassing {
            rule_id: hit.id,
            message: hit.message,
            xp: hit.xp,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(input: &str) -> SafetyVerdict {
        classify(&default_rules(), &CommandLine::parse(input), false)
    }

    #[test]
    fn root_wipe_is_critical_block() {
        assert!(matches!(
            verdict("rm -rf /"),
            SafetyVerdict::Block { severity: Severity::Critical, .. }
        ));
        assert!(matches!(
            verdict("sudo rm -rf /"),
            SafetyVerdict::Block { .. }
        ));
    }

    #[test]
    fn scoped_delete_is_clear() {
        assert_eq!(verdict("rm -rf /tmp/build"), SafetyVerdict::Clear);
    }

    #[test]
    fn recursive_wildcard_is_high() {
        assert!(matches!(
            verdict("rm -r ./*"),
            SafetyVerdict::Block { severity: Severity::High, rule_id: "recursive_wildcard_delete", .. }
        ));
    }

    #[test]
    fn medium_and_low_warn() {
        assert!(matches!(verdict("reboot"), SafetyVerdict::Warn { severity: Severity::Medium, .. }));
        assert!(matches!(verdict("history -c"), SafetyVerdict::Warn { severity: Severity::Low, .. }));
    }

    #[test]
    fn embarrassing_is_flavor() {
        assert!(matches!(
            verdict("sudo make me a sandwich"),
            SafetyVerdict::Embarrassing { xp: 5, .. }
        ));
    }

    #[test]
    fn embarrassing_rules_only_match_as_the_command() {
        assert!(matches!(
            verdict("sl"),
            SafetyVerdict::Embarrassing { rule_id: "steam_locomotive", .. }
        ));
        assert!(matches!(verdict(":q!"), SafetyVerdict::Embarrassing { rule_id: "vim_escape", .. }));
        assert_eq!(verdict("cd sl"), SafetyVerdict::Clear);
        assert_eq!(verdict("cat sl"), SafetyVerdict::Clear);
        assert_eq!(verdict("echo :q!"), SafetyVerdict::Clear);
        assert_eq!(verdict("echo sudo make me a sandwich"), SafetyVerdict::Clear);
    }

    #[test]
    fn format_rule_targets_the_mkfs_program() {
        assert!(matches!(
            verdict("mkfs.ext4 /dev/sda1"),
            SafetyVerdict::Block { rule_id: "format_disk", .. }
        ));
        assert!(matches!(
            verdict("sudo mkfs /dev/sdb"),
            SafetyVerdict::Block { rule_id: "format_disk", .. }
        ));
        assert_eq!(verdict("cat mkfs_notes.txt"), SafetyVerdict::Clear);
        assert_eq!(verdict("grep mkfs /var/log/syslog"), SafetyVerdict::Clear);
    }

    #[test]
    fn bypass_skips_everything() {
        let line = CommandLine::parse("rm -rf /");
        assert_eq!(classify(&default_rules(), &line, true), SafetyVerdict::Bypassed);
    }

    #[test]
    fn fork_bomb_with_spaces_is_caught() {
        assert!(matches!(verdict(":(){ :|: & };:"), SafetyVerdict::Block { rule_id: "fork_bomb", .. }));
    }
}
