//! Command line parsing.
//!
//! A line holds `;` separated sub-commands. Each sub-command is a name
//! followed by arguments split on single spaces. Quotes are ordinary
//! characters and runs of spaces are not collapsed, so `a  b` has an empty
//! argument between its two spaces.

/// One parsed sub-command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Split a line into sub-commands.
///
/// Leading whitespace of each sub-command is dropped; sub-commands left
/// empty are skipped.
pub fn split_commands(line: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut current = String::new();
    let mut started = false;

    for ch in line.chars() {
        if ch == ';' {
            commands.push(std::mem::take(&mut current));
            started = false;
            continue;
        }
        if !ch.is_whitespace() {
            started = true;
        }
        if started {
            current.push(ch);
        }
    }
    commands.push(current);

    commands.retain(|c| !c.is_empty());
    commands
}

/// Split a sub-command into its name and arguments
pub fn tokenize(command: &str) -> ParsedCommand {
    match command.split_once(' ') {
        None => ParsedCommand {
            name: command.to_string(),
            args: Vec::new(),
        },
        Some((name, rest)) => ParsedCommand {
            name: name.to_string(),
            args: rest.split(' ').map(str::to_string).collect(),
        },
    }
}

/// `--syntax`, `--?` or `/?`, any case
pub fn is_syntax_flag(arg: &str) -> bool {
    let arg = arg.to_lowercase();
    arg == "--syntax" || arg == "--?" || arg == "/?"
}

/// Join argument tokens back together with single spaces
pub fn combine_args(args: &[String]) -> String {
    args.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_skips_leading_whitespace() {
        assert_eq!(split_commands("help;  cls"), vec!["help", "cls"]);
        assert_eq!(split_commands("  volume 10 ; x"), vec!["volume 10 ", "x"]);
    }

    #[test]
    fn test_split_drops_empty() {
        assert_eq!(split_commands("help;"), vec!["help"]);
        assert_eq!(split_commands(" ; ;;"), Vec::<String>::new());
        assert_eq!(split_commands(""), Vec::<String>::new());
    }

    #[test]
    fn test_tokenize_name_only() {
        let parsed = tokenize("help");
        assert_eq!(parsed.name, "help");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_tokenize_does_not_collapse_spaces() {
        assert_eq!(tokenize("foo  bar").args, args(&["", "bar"]));
        assert_eq!(tokenize("foo bar  baz").args, args(&["bar", "", "baz"]));
        assert_eq!(tokenize("say \"hi there\"").args, args(&["\"hi", "there\""]));
        assert_eq!(tokenize("help ").args, args(&[""]));
    }

    #[test]
    fn test_syntax_flags() {
        assert!(is_syntax_flag("--syntax"));
        assert!(is_syntax_flag("--SYNTAX"));
        assert!(is_syntax_flag("--?"));
        assert!(is_syntax_flag("/?"));
        assert!(!is_syntax_flag("-?"));
    }

    #[test]
    fn test_combine_args() {
        assert_eq!(combine_args(&args(&["stats", "view"])), "stats view");
        assert_eq!(combine_args(&[]), "");
    }
}
