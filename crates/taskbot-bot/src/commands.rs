/// A slash command with its raw argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    MyTasks,
    MyProjects,
    CreateProject(String),
    CreateTask(String),
    Comments(String),
    Url,
    Status,
}

impl Command {
    /// Parse `/keyword[@botname] [args]`. Keywords are case-sensitive;
    /// anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = split_first(rest);
        let keyword = head.split('@').next().unwrap_or(head);
        let args = args.to_string();

        let command = match keyword {
            "start" => Command::Start,
            "mytasks" => Command::MyTasks,
            "myprojects" => Command::MyProjects,
            "createproject" => Command::CreateProject(args),
            "createtask" => Command::CreateTask(args),
            "comments" => Command::Comments(args),
            "url" => Command::Url,
            "status" => Command::Status,
            _ => return None,
        };

        Some(command)
    }
}

/// First whitespace-delimited token and the trimmed remainder.
pub fn split_first(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

/// Task title and description. The title runs to the first line break or
/// ` | `; whatever follows is the description.
pub fn split_title(text: &str) -> (&str, &str) {
    let cut = [text.find('\n'), text.find(" | ")]
        .into_iter()
        .flatten()
        .min();

    match cut {
        Some(at) => {
            let description = text[at..].trim_start_matches(|c: char| c.is_whitespace() || c == '|');
            (text[..at].trim(), description.trim())
        }
        None => (text.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords_with_bot_suffix_and_args() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/mytasks@TaskTrackerBot"), Some(Command::MyTasks));
        assert_eq!(
            Command::parse("/createproject  Website   Company site "),
            Some(Command::CreateProject("Website   Company site".to_string()))
        );
        assert_eq!(
            Command::parse("/createtask@TaskTrackerBot 3 Fix homepage"),
            Some(Command::CreateTask("3 Fix homepage".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_or_miscased_keywords() {
        assert_eq!(Command::parse("/Start"), None);
        assert_eq!(Command::parse("/deletetask 3"), None);
        assert_eq!(Command::parse("start"), None);
        assert_eq!(Command::parse("/"), None);
    }

    #[test]
    fn splits_first_token() {
        assert_eq!(split_first("Website"), ("Website", ""));
        assert_eq!(split_first("Website Development Creating a site"), ("Website", "Development Creating a site"));
        assert_eq!(split_first("   "), ("", ""));
    }

    #[test]
    fn splits_title_from_description() {
        assert_eq!(split_title("Fix homepage"), ("Fix homepage", ""));
        assert_eq!(
            split_title("Add auth | Implement login and registration"),
            ("Add auth", "Implement login and registration")
        );
        assert_eq!(split_title("Add auth\nlogin | signup"), ("Add auth", "login | signup"));
    }
}
