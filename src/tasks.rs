use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use log::debug;

use crate::{Error, Result};

/// Platform-reported run state of a registered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Ready,
    Running,
    Disabled,
    Other(String),
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Ready => write!(f, "Ready"),
            TaskState::Running => write!(f, "Running"),
            TaskState::Disabled => write!(f, "Disabled"),
            TaskState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A complete registration request. Registering replaces nothing implicitly;
/// callers wanting replace semantics delete the old entry first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub name: String,
    pub command: PathBuf,
    pub arguments: String,
    /// Account the task runs under, e.g. the LocalSystem SID.
    pub principal: String,
    pub highest_privileges: bool,
    pub run_at_boot: bool,
    pub start_when_available: bool,
    /// Ceiling after which the OS kills the task, so a hung cleanup cannot
    /// block future boots.
    pub execution_time_limit: Duration,
}

impl TaskDefinition {
    /// Render to Task Scheduler XML, the format `schtasks /Create /XML` takes.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<Task version=\"1.2\" xmlns=\"http://schemas.microsoft.com/windows/2004/02/mit/task\">\n");
        xml.push_str("  <Triggers>\n");
        if self.run_at_boot {
            xml.push_str("    <BootTrigger>\n      <Enabled>true</Enabled>\n    </BootTrigger>\n");
        }
        xml.push_str("  </Triggers>\n");
        xml.push_str("  <Principals>\n    <Principal id=\"Author\">\n");
        xml.push_str(&format!("      <UserId>{}</UserId>\n", xml_escape(&self.principal)));
        xml.push_str(&format!(
            "      <RunLevel>{}</RunLevel>\n",
            if self.highest_privileges { "HighestAvailable" } else { "LeastPrivilege" }
        ));
        xml.push_str("    </Principal>\n  </Principals>\n");
        xml.push_str("  <Settings>\n");
        xml.push_str("    <MultipleInstancesPolicy>IgnoreNew</MultipleInstancesPolicy>\n");
        xml.push_str("    <DisallowStartIfOnBatteries>false</DisallowStartIfOnBatteries>\n");
        xml.push_str(&format!(
            "    <StartWhenAvailable>{}</StartWhenAvailable>\n",
            self.start_when_available
        ));
        xml.push_str(&format!(
            "    <ExecutionTimeLimit>{}</ExecutionTimeLimit>\n",
            duration_iso8601(self.execution_time_limit)
        ));
        xml.push_str("    <Enabled>true</Enabled>\n");
        xml.push_str("  </Settings>\n");
        xml.push_str("  <Actions Context=\"Author\">\n    <Exec>\n");
        xml.push_str(&format!(
            "      <Command>{}</Command>\n",
            xml_escape(&self.command.to_string_lossy())
        ));
        if !self.arguments.is_empty() {
            xml.push_str(&format!("      <Arguments>{}</Arguments>\n", xml_escape(&self.arguments)));
        }
        xml.push_str("    </Exec>\n  </Actions>\n</Task>\n");
        xml
    }
}

/// The OS task store, seen through the three operations this toolkit needs.
/// Production goes through `schtasks.exe`; tests use an in-memory double.
pub trait TaskScheduler {
    /// `None` means no task is registered under that name.
    fn query(&self, name: &str) -> Result<Option<TaskState>>;

    /// Plain create; fails if a task with the same name already exists.
    fn register(&self, def: &TaskDefinition) -> Result<()>;

    /// Returns whether a task existed to delete. Absence is not an error.
    fn delete(&self, name: &str) -> Result<bool>;
}

/// Shells out to `schtasks.exe`, the same way the cleaner drives `taskkill`
/// and `explorer.exe`.
pub struct SchtasksScheduler;

impl TaskScheduler for SchtasksScheduler {
    fn query(&self, name: &str) -> Result<Option<TaskState>> {
        let output = Command::new("schtasks")
            .args(["/Query", "/TN", name, "/FO", "CSV", "/NH"])
            .output()
            .map_err(|e| Error::io("running schtasks /Query", e))?;
        if !output.status.success() {
            // schtasks exits nonzero when the task does not exist
            return Ok(None);
        }
        Ok(parse_query_csv(&String::from_utf8_lossy(&output.stdout)))
    }

    fn register(&self, def: &TaskDefinition) -> Result<()> {
        let xml_path = std::env::temp_dir().join(format!("swingbay-task-{}.xml", std::process::id()));
        fs::write(&xml_path, def.to_xml())
            .map_err(|e| Error::io(format!("writing {}", xml_path.display()), e))?;
        let output = Command::new("schtasks")
            .args(["/Create", "/TN", def.name.as_str(), "/XML"])
            .arg(&xml_path)
            .output();
        let _ = fs::remove_file(&xml_path);
        let output = output.map_err(|e| Error::io("running schtasks /Create", e))?;
        if !output.status.success() {
            return Err(Error::TaskScheduler(format!(
                "creating `{}` failed: {}",
                def.name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!("registered scheduled task `{}`", def.name);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        if self.query(name)?.is_none() {
            return Ok(false);
        }
        let output = Command::new("schtasks")
            .args(["/Delete", "/TN", name, "/F"])
            .output()
            .map_err(|e| Error::io("running schtasks /Delete", e))?;
        if !output.status.success() {
            return Err(Error::TaskScheduler(format!(
                "deleting `{}` failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!("deleted scheduled task `{}`", name);
        Ok(true)
    }
}

/// Parse `schtasks /Query /FO CSV /NH` output; the status is the last field
/// of the first row.
fn parse_query_csv(stdout: &str) -> Option<TaskState> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    let fields = split_csv_line(line);
    let status = fields.last()?.trim();
    if status.is_empty() {
        return Some(TaskState::Other(String::from("Unknown")));
    }
    Some(match status {
        "Ready" => TaskState::Ready,
        "Running" => TaskState::Running,
        "Disabled" => TaskState::Disabled,
        other => TaskState::Other(other.to_string()),
    })
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn duration_iso8601(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        "PT0S".to_string()
    } else if secs % 3600 == 0 {
        format!("PT{}H", secs / 3600)
    } else if secs % 60 == 0 {
        format!("PT{}M", secs / 60)
    } else {
        format!("PT{}S", secs)
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
