use anyhow::{Result, anyhow};

/// Split a backend command line into program and arguments, honoring quotes.
pub fn parse_command(command: &str) -> Result<(String, Vec<String>)> {
    let words = shell_words::split(command)
        .map_err(|err| anyhow!("failed to parse command '{}': {}", command, err))?;
    if words.is_empty() {
        return Err(anyhow!("empty command"));
    }
    Ok((words[0].clone(), words[1..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_program_and_arguments() {
        let (program, args) = parse_command("mock-server --name alpha").unwrap();
        assert_eq!(program, "mock-server");
        assert_eq!(args, vec!["--name", "alpha"]);
    }

    #[test]
    fn honors_quoting() {
        let (program, args) = parse_command("runner \"two words\"").unwrap();
        assert_eq!(program, "runner");
        assert_eq!(args, vec!["two words"]);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_command("").is_err());
    }
}
