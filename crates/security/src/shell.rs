//! Destructive shell command detection.
//!
//! A fixed pattern set covering irreversible filesystem and data
//! operations. Used as a gate, so the families below must never produce
//! false negatives; false positives only cost an extra approval prompt.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Pattern families, case-insensitive.
const DESTRUCTIVE_PATTERNS: &[&str] = &[
    // rm with recursive or force flags, any order, any position. The
    // binary may be invoked by path or from inside a quoted subshell.
    r"(?i)(?:^|[^a-z0-9_.-])rm\s+(?:\S+\s+)*-[a-z]*[rf]",
    r"(?i)(?:^|[^a-z0-9_.-])rm\s+(?:\S+\s+)*--(?:recursive|force)\b",
    // rm with a wildcard argument
    r"(?i)(?:^|[^a-z0-9_.-])rm\s+(?:\S+\s+)*\S*\*",
    // directory removal
    r"(?i)\brmdir\b",
    // data destruction verbs
    r"(?i)\bdelete\b",
    r"(?i)\btruncate\b",
    r"(?i)\bdrop\s+(?:database|table|schema)\b",
    // redirection into system paths
    r"(?i)>\s*/(?:etc|usr|bin|sbin|boot|sys|proc|lib|lib64|root|var|opt)(?:/|\s|$)",
    r"(?i)>\s*/dev/(?:sd|hd|vd|xvd|nvme|mmcblk|disk)",
    // filesystem format and disk dump utilities
    r"(?i)\bmkfs(?:\.[a-z0-9]+)?\b",
    r"(?i)\b(?:fdisk|wipefs|shred)\b",
    r"(?i)\bdd\s+(?:\S+\s+)*(?:if|of)=",
    // delete or format behind an elevation command
    r"(?i)\b(?:sudo|doas|pkexec)\s+(?:\S+\s+)*(?:\S*/)?(?:rm|rmdir|mkfs|format|dd|shred)\b",
];

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DESTRUCTIVE_PATTERNS
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = p, error = %e, "Invalid destructive-command pattern");
                None
            }
        })
        .collect()
});

/// Returns `true` if the command matches any destructive pattern.
///
/// Empty input is never destructive.
pub fn is_destructive_shell_command(command: &str) -> bool {
    let command = command.trim();
    if command.is_empty() {
        return false;
    }
    PATTERNS.iter().any(|re| re.is_match(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(PATTERNS.len(), DESTRUCTIVE_PATTERNS.len());
    }

    #[test]
    fn positive_corpus() {
        for cmd in [
            "rm -rf /tmp/x",
            "rm -fr ./x",
            "rm -r -f build",
            "rm -R target",
            "rm -f lock",
            "rm --recursive dir",
            "rm --force file",
            "rm x -rf",
            "rm *.txt",
            "rm logs/*",
            "rmdir x",
            "drop table users",
            "DROP DATABASE prod",
            "psql -c 'drop schema public cascade'",
            "sudo rm -rf /",
            "sudo rm file",
            "doas mkfs /dev/sdb1",
            "git branch --delete feature",
            "DELETE FROM users",
            "truncate -s 0 app.log",
            "echo x > /etc/hosts",
            "cat payload >/usr/bin/ls",
            "echo > /dev/sda",
            "mkfs.ext4 /dev/sdb1",
            "mkfs /dev/sdb",
            "dd if=/dev/zero of=/dev/sda bs=1M",
            "shred -u secrets.txt",
            "cd /tmp && rm -rf build",
            "ls; rm -rf ~",
        ] {
            assert!(is_destructive_shell_command(cmd), "{cmd}");
        }
    }

    #[test]
    fn rm_by_path_or_in_subshell() {
        for cmd in [
            "/bin/rm -rf /",
            "/usr/bin/rm --force lock",
            "bash -c \"rm -rf /\"",
            "sh -c 'rm -rf ~/project'",
            "eval \"rm *.log\"",
            "sudo /bin/rm -rf /var",
            "sudo /bin/rm file",
            "$(rm -rf build)",
        ] {
            assert!(is_destructive_shell_command(cmd), "{cmd}");
        }
    }

    #[test]
    fn negative_corpus() {
        for cmd in [
            "ls -la",
            "echo hi",
            "cat f.txt",
            "grep x f.txt",
            "git status",
            "cargo test --release",
            "rm file.txt",
            "echo ok > /dev/null",
            "echo ok > ./out.txt",
            "docker run --rm image",
            "perform -r",
            "npm run format",
            "cargo rm --dev serde",
            "docker run --rm -it image",
            "form -r x",
            "/bin/rm file.txt",
        ] {
            assert!(!is_destructive_shell_command(cmd), "{cmd}");
        }
    }

    #[test]
    fn empty_input_is_not_destructive() {
        assert!(!is_destructive_shell_command(""));
        assert!(!is_destructive_shell_command("   \n"));
    }
}
