//! Tree listing

use anyhow::bail;
use roster_core::OperatorNode;
use std::fmt::Write;

/// Render operators as an indented tree, optionally only the named one
pub fn render(operators: &[OperatorNode], only: Option<&str>) -> anyhow::Result<String> {
    let selected: Vec<&OperatorNode> = operators
        .iter()
        .filter(|o| only.map_or(true, |name| o.name == name))
        .collect();
    if let (Some(name), true) = (only, selected.is_empty()) {
        bail!("no operator named {name}");
    }

    let mut out = String::new();
    for operator in selected {
        writeln!(out, "{} {}", operator.name, operator.public_key())?;
        for account in &operator.accounts {
            let read_only = if account.key.is_none() { " (read-only)" } else { "" };
            writeln!(out, "  {} {}{}", account.name, account.public_key(), read_only)?;
            for user in &account.users {
                let scoped = if user.edits_rejected { " (scoped)" } else { "" };
                writeln!(out, "    {} {}{}", user.name, user.public_key(), scoped)?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_testkit::fixtures;

    #[test]
    fn test_render_marks_scoped_users() {
        let operators = vec![fixtures::mixed_signer_operator()];
        let out = render(&operators, None).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("O O"));
        assert!(lines[1].starts_with("  A A"));
        assert!(lines.iter().any(|l| l.starts_with("    scoped U") && l.ends_with("(scoped)")));
        assert!(lines.iter().any(|l| l.starts_with("    plain U") && !l.ends_with("(scoped)")));
    }

    #[test]
    fn test_render_filters_by_operator() {
        let operators = vec![
            fixtures::operator_with("O1", &[]),
            fixtures::operator_with("O2", &[("A", &[])]),
        ];
        let out = render(&operators, Some("O2")).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(render(&operators, Some("O3")).is_err());
    }
}
