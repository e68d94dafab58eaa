//! Textual function verification.
//!
//! The generator emits IR as text, so consistency is checked on the text:
//! every label defined once, every block terminated exactly once with the
//! terminator last, every branch target defined. Runs on each function
//! before it joins the module; a failure is a generator bug, not a user
//! error.

use std::collections::HashSet;

/// Verify one `define ... { ... }` text block.
pub(super) fn verify_function(text: &str) -> Result<(), String> {
    let mut labels: HashSet<&str> = HashSet::new();
    let mut targets: Vec<(String, String)> = Vec::new();
    let mut current: Option<&str> = None;
    let mut terminated = false;
    let mut saw_define = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }
        if trimmed.starts_with("define ") {
            if saw_define {
                return Err("nested function definition".to_string());
            }
            saw_define = true;
            continue;
        }
        if trimmed == "}" {
            if let Some(block) = current {
                if !terminated {
                    return Err(format!("block {} is not terminated", block));
                }
            }
            current = None;
            continue;
        }
        // Labels sit in column zero; instructions are indented.
        if !line.starts_with(' ') {
            let label = trimmed
                .strip_suffix(':')
                .ok_or_else(|| format!("unrecognized line: {}", trimmed))?;
            if let Some(block) = current {
                if !terminated {
                    return Err(format!("block {} is not terminated", block));
                }
            }
            if !labels.insert(label) {
                return Err(format!("label {} is defined twice", label));
            }
            current = Some(label);
            terminated = false;
            continue;
        }

        let block = current.ok_or_else(|| format!("instruction outside a block: {}", trimmed))?;
        if terminated {
            return Err(format!(
                "instruction after the terminator of block {}: {}",
                block, trimmed
            ));
        }
        if trimmed.starts_with("br ") || trimmed.starts_with("ret ") || trimmed == "unreachable" {
            terminated = true;
            let mut rest = trimmed;
            while let Some(at) = rest.find("label %") {
                let after = &rest[at + "label %".len()..];
                let end = after
                    .find(|c: char| c == ',' || c.is_whitespace())
                    .unwrap_or(after.len());
                targets.push((block.to_string(), after[..end].to_string()));
                rest = &after[end..];
            }
        }
    }

    for (block, target) in &targets {
        if !labels.contains(target.as_str()) {
            return Err(format!(
                "branch in block {} targets the unknown label {}",
                block, target
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_function() {
        let text = "define i32 @main() {\n\
                    entry:\n\
                    \x20 %x0 = alloca i32\n\
                    \x20 br label %body\n\
                    body:\n\
                    \x20 %t1 = add i32 1, 2\n\
                    \x20 ret i32 %t1\n\
                    }\n";
        assert!(verify_function(text).is_ok());
    }

    #[test]
    fn test_rejects_unterminated_block() {
        let text = "define void @f() {\n\
                    entry:\n\
                    \x20 %x0 = alloca i32\n\
                    body:\n\
                    \x20 ret void\n\
                    }\n";
        let err = verify_function(text).unwrap_err();
        assert!(err.contains("entry"));
        assert!(err.contains("not terminated"));
    }

    #[test]
    fn test_rejects_instruction_after_terminator() {
        let text = "define void @f() {\n\
                    entry:\n\
                    \x20 ret void\n\
                    \x20 %t0 = add i32 1, 1\n\
                    }\n";
        let err = verify_function(text).unwrap_err();
        assert!(err.contains("after the terminator"));
    }

    #[test]
    fn test_rejects_unknown_branch_target() {
        let text = "define void @f() {\n\
                    entry:\n\
                    \x20 br label %nowhere\n\
                    }\n";
        let err = verify_function(text).unwrap_err();
        assert!(err.contains("nowhere"));
    }

    #[test]
    fn test_rejects_duplicate_label() {
        let text = "define void @f() {\n\
                    entry:\n\
                    \x20 br label %entry\n\
                    entry:\n\
                    \x20 ret void\n\
                    }\n";
        let err = verify_function(text).unwrap_err();
        assert!(err.contains("defined twice"));
    }

    #[test]
    fn test_conditional_branch_targets_are_checked() {
        let text = "define void @f() {\n\
                    entry:\n\
                    \x20 br i1 %c, label %a, label %b\n\
                    a:\n\
                    \x20 ret void\n\
                    }\n";
        let err = verify_function(text).unwrap_err();
        assert!(err.contains('b'));
    }
}
