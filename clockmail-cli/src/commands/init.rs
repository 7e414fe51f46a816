//! `cm init` - create the database, optionally register the caller, and
//! idempotently inject the coordination section into AGENTS.md.

use crate::output::print_json;
use crate::session::Session;
use crate::Outcome;
use clap::Args;
use clockmail_core::ClockmailResult;
use std::path::Path;

const BEGIN_MARKER: &str = "<!-- BEGIN CLOCKMAIL INTEGRATION -->";
const END_MARKER: &str = "<!-- END CLOCKMAIL INTEGRATION -->";

const AGENTS_SECTION: &str = r#"<!-- BEGIN CLOCKMAIL INTEGRATION -->
## Multi-Agent Coordination with cm (clockmail)

This project uses **cm** for coordinating concurrent AI agent sessions.
Run `cm prime` for current coordination state, or `cm onboard` to get started.

**Quick reference:**
- `cm sync --epoch N`   — Main loop: heartbeat + recv + frontier check
- `cm lock <path>`     — Acquire file lock before editing
- `cm unlock <path>`   — Release when done
- `cm send <to> <msg>` — Send message to another agent
- `cm status`          — Full overview of all agents, locks, frontier

**Environment:** `export CLOCKMAIL_AGENT=<your-id>`

**Session close:** Release all locks and run `cm sync` before ending.
<!-- END CLOCKMAIL INTEGRATION -->
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Path to the agent-instructions document
    #[arg(long, default_value = "AGENTS.md")]
    pub agents_md: String,

    /// Don't touch the agent-instructions document
    #[arg(long)]
    pub skip_agents_md: bool,
}

pub fn run(session: &Session, args: &InitArgs, json: bool) -> ClockmailResult<Outcome> {
    // Opening the session already created the database file and schema.
    let agents = session.store.list_agents()?;

    let mut registered = None;
    if let Some(agent_id) = session.resolve_agent_opt() {
        let agent = session.store.register_agent(&agent_id)?;
        registered = Some(agent);
    }

    let mut agents_md_action = None;
    if !args.skip_agents_md {
        match inject_agents_section(Path::new(&args.agents_md)) {
            Ok(action) => agents_md_action = Some(action),
            Err(err) => eprintln!("cm: {}: {}", args.agents_md, err),
        }
    }

    if json {
        print_json(&serde_json::json!({
            "db_path": session.db_path,
            "existing_agents": agents.len(),
            "registered": registered,
            "agents_md": agents_md_action,
        }));
        return Ok(Outcome::Success);
    }

    println!("initialized clockmail (db: {})", session.db_path);
    if !agents.is_empty() {
        println!("  {} existing agent(s)", agents.len());
    }
    if let Some(agent) = &registered {
        println!("  registered agent {:?} (clock={})", agent.id, agent.clock);
    }
    if let Some(action) = &agents_md_action {
        println!("  {} {}", action, args.agents_md);
    }

    println!();
    println!("next steps:");
    match &registered {
        Some(agent) => println!("  export CLOCKMAIL_AGENT={}", agent.id),
        None => {
            println!("  export CLOCKMAIL_AGENT=<your-id>");
            println!("  cm register <your-id>");
        }
    }
    println!("  cm prime       # see coordination context");
    println!("  cm sync        # main loop command");

    Ok(Outcome::Success)
}

/// Create or update the instructions document with the clockmail section.
/// The HTML marker pair makes re-runs idempotent: an existing section is
/// replaced in place, anything else is appended.
fn inject_agents_section(path: &Path) -> std::io::Result<&'static str> {
    let existing = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let content = format!("# Agent Instructions\n\n{}", AGENTS_SECTION);
            std::fs::write(path, content)?;
            return Ok("created with clockmail section:");
        }
        Err(err) => return Err(err),
    };

    if let (Some(start), Some(end)) = (existing.find(BEGIN_MARKER), existing.find(END_MARKER)) {
        let mut section_end = end + END_MARKER.len();
        if let Some(nl) = existing[section_end..].find('\n') {
            section_end += nl + 1;
        }
        let updated = format!(
            "{}{}{}",
            &existing[..start],
            AGENTS_SECTION,
            &existing[section_end..]
        );
        std::fs::write(path, updated)?;
        return Ok("updated clockmail section in:");
    }

    let mut updated = existing;
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push('\n');
    updated.push_str(AGENTS_SECTION);
    std::fs::write(path, updated)?;
    Ok("added clockmail section to:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_inject_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        inject_agents_section(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Agent Instructions"));
        assert!(content.contains(BEGIN_MARKER));
        assert!(content.contains(END_MARKER));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        inject_agents_section(&path).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        inject_agents_section(&path).unwrap();
        let second = std::fs::read_to_string(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(second.matches(BEGIN_MARKER).count(), 1);
    }

    #[test]
    fn test_inject_preserves_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        std::fs::write(&path, "# My Project\n\nKeep this.\n").unwrap();
        inject_agents_section(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# My Project"));
        assert!(content.contains("Keep this."));
        assert!(content.contains(BEGIN_MARKER));
    }

    #[test]
    fn test_inject_replaces_stale_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AGENTS.md");
        std::fs::write(
            &path,
            format!(
                "# Top\n\n{}\nold text\n{}\n\n# Bottom\n",
                BEGIN_MARKER, END_MARKER
            ),
        )
        .unwrap();
        inject_agents_section(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("old text"));
        assert!(content.contains("# Top"));
        assert!(content.contains("# Bottom"));
        assert_eq!(content.matches(BEGIN_MARKER).count(), 1);
    }
}
