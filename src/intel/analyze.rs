//! Rule-based analysis of command output, dispatched by OS family.
//!
//! Every function here is total: analysis always returns a non-empty
//! human-readable string and never fails, falling back to a generic
//! "executed successfully" classification when no rule matches.

use crate::domain::OsFamily;

/// Analyze the output of a completed command and report insights
pub fn analyze(command: &str, output: &str, os: OsFamily) -> String {
    let mut notes = vec![format!("Command executed: {command}")];

    if output.trim().is_empty() {
        notes.push("The command produced no output.".to_string());
    } else {
        match os {
            OsFamily::Linux | OsFamily::Macos => notes.extend(analyze_unix(command, output)),
            OsFamily::Cisco => notes.extend(analyze_cisco(command, output)),
            OsFamily::Windows | OsFamily::Unknown => notes.extend(analyze_generic(output)),
        }
    }

    notes.join("\n")
}

fn analyze_unix(command: &str, output: &str) -> Vec<String> {
    let mut notes = Vec::new();
    let output_lower = output.to_lowercase();

    if command.starts_with("sudo") {
        notes.push("The command was executed with sudo privileges.".to_string());
    } else if output_lower.contains("permission denied") {
        notes.push(
            "The command resulted in a permission denied error. You may need to use sudo."
                .to_string(),
        );
    }

    if command.starts_with("cat") {
        if output.contains("No such file or directory") {
            notes.push("The specified file or directory does not exist.".to_string());
        } else {
            notes.push("The command successfully displayed the contents of the file.".to_string());
        }
    } else if output.contains("No such file or directory") {
        notes.push("A referenced file or directory does not exist.".to_string());
    }

    if command.contains("ansible-playbook") {
        if output.contains("PLAY RECAP") {
            notes.push("An Ansible playbook was executed.".to_string());
            if output.contains("failed=0") {
                notes.push("The playbook execution was successful with no failures.".to_string());
            } else {
                notes.push("The playbook execution had some failures.".to_string());
            }
        } else {
            notes.push(
                "The command attempted to run an Ansible playbook, but it may not have executed successfully."
                    .to_string(),
            );
        }
    }

    if notes.is_empty() {
        notes.push("The command executed successfully.".to_string());
    }
    notes
}

fn analyze_cisco(command: &str, output: &str) -> Vec<String> {
    let mut notes = Vec::new();

    if output.contains("Invalid input detected") {
        notes.push("The command resulted in an error: Invalid input detected.".to_string());
        notes.push(
            "This usually means the command syntax is incorrect or not supported in the current mode."
                .to_string(),
        );
    } else if output.contains("Incomplete command") {
        notes.push("The command is incomplete. Additional parameters may be required.".to_string());
    } else if output.contains("% Password:  timeout expired!") {
        notes.push(
            "Authentication failed due to a timeout. Please try entering the password again."
                .to_string(),
        );
    } else if output.contains("Error in authentication") {
        notes.push("Authentication failed. Please check your credentials and try again.".to_string());
    } else if output.contains("SSH connection closed") {
        notes.push(
            "The SSH connection was closed unexpectedly. This might be due to network issues or server-side configuration."
                .to_string(),
        );
    } else {
        notes.push("The command executed successfully.".to_string());
        if command.to_lowercase().starts_with("sh") {
            notes.push(
                "This is a show command, used to display information about the device configuration or status."
                    .to_string(),
            );
        }
    }
    notes
}

fn analyze_generic(output: &str) -> Vec<String> {
    let output_lower = output.to_lowercase();
    if output_lower.contains("error") {
        vec!["The command resulted in an error. Please check the syntax and permissions.".to_string()]
    } else if output_lower.contains("not found") {
        vec![
            "The command or file was not found. Please verify it exists and is in the system path."
                .to_string(),
        ]
    } else {
        vec!["The command executed successfully.".to_string()]
    }
}

/// Heuristic next-command suggestion from recent history
pub fn suggest_next(history: &[String], os: OsFamily) -> String {
    match os {
        OsFamily::Linux | OsFamily::Macos => suggest_next_unix(history),
        OsFamily::Cisco => suggest_next_cisco(history),
        _ => "ls -la".to_string(),
    }
}

fn suggest_next_unix(history: &[String]) -> String {
    let recent = history.iter().rev().take(3);
    if recent
        .clone()
        .any(|c| c.to_lowercase().contains("permission denied"))
    {
        if let Some(last) = history.last() {
            return format!("sudo {last}");
        }
    }
    match history.last() {
        Some(last) if last.starts_with("cat") => {
            let target = last.split_whitespace().last().unwrap_or("");
            format!("ls -l {target}")
        }
        _ => "df -h".to_string(),
    }
}

fn suggest_next_cisco(history: &[String]) -> String {
    if history
        .iter()
        .rev()
        .take(3)
        .any(|c| c.contains("Invalid input detected"))
    {
        return "show running-config".to_string();
    }
    match history.last() {
        Some(last) if last.to_lowercase().starts_with("sh") => {
            "show interfaces status".to_string()
        }
        _ => "show version".to_string(),
    }
}

/// Canned explanation of what a command does
pub fn explain(command: &str, os: OsFamily) -> String {
    match os {
        OsFamily::Linux | OsFamily::Macos => explain_unix(command),
        OsFamily::Cisco => explain_cisco(command),
        _ => {
            "This command may provide useful information or configuration options for the device."
                .to_string()
        }
    }
}

fn explain_unix(command: &str) -> String {
    if command.starts_with("sudo") {
        "This command is being run with superuser privileges, allowing actions that require elevated permissions."
            .to_string()
    } else if command.starts_with("cat") {
        "This command displays the contents of a file.".to_string()
    } else if command.contains("ansible-playbook") {
        "This command runs an Ansible playbook, a set of instructions for automating system configuration or deployment."
            .to_string()
    } else {
        let name = command.split_whitespace().next().unwrap_or(command);
        format!("This is a Unix command. For more information, check its man page with 'man {name}'.")
    }
}

fn explain_cisco(command: &str) -> String {
    if command == "enable" {
        "This command enters privileged EXEC mode, required for many configuration and show commands."
            .to_string()
    } else if command.starts_with("show running-config") {
        "This command displays the current configuration of the device. It requires privileged EXEC mode."
            .to_string()
    } else if command == "show interfaces status" {
        "This command shows the status of all interfaces on the device, including their operational state."
            .to_string()
    } else {
        "This is a Cisco IOS command. It may provide information about the device's configuration or status."
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_is_never_empty() {
        assert!(!analyze("", "", OsFamily::Unknown).is_empty());
        assert!(!analyze("ls", "", OsFamily::Linux).is_empty());
        assert!(!analyze("weird", "???", OsFamily::Windows).is_empty());
    }

    #[test]
    fn permission_denied_suggests_sudo() {
        let report = analyze("touch /etc/x", "touch: Permission denied", OsFamily::Linux);
        assert!(report.contains("permission denied error"));
        assert!(report.contains("sudo"));
    }

    #[test]
    fn cisco_invalid_input_is_flagged() {
        let report = analyze(
            "show ip int brief",
            "% Invalid input detected at '^' marker.",
            OsFamily::Cisco,
        );
        assert!(report.contains("Invalid input detected"));
    }

    #[test]
    fn unmatched_output_reports_success() {
        let report = analyze("echo hi", "hi", OsFamily::Linux);
        assert!(report.contains("executed successfully"));
    }

    #[test]
    fn no_output_is_noted() {
        let report = analyze("true", "   ", OsFamily::Linux);
        assert!(report.contains("no output"));
    }

    #[test]
    fn next_command_heuristics() {
        assert_eq!(suggest_next(&[], OsFamily::Unknown), "ls -la");
        assert_eq!(
            suggest_next(&["cat /etc/hosts".to_string()], OsFamily::Linux),
            "ls -l /etc/hosts"
        );
        assert_eq!(
            suggest_next(&["show version".to_string()], OsFamily::Cisco),
            "show interfaces status"
        );
    }
}
