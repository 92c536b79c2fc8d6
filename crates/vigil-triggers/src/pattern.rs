use regex::Regex;
use thiserror::Error;

/// One positional argument of a command grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    /// Shown in usage text only.
    pub name: Option<&'static str>,
    /// Regular-expression fragment without capturing groups.
    pub pattern: &'static str,
    /// Captures the rest of the line, spaces included. Last argument only.
    pub greedy: bool,
}

impl ArgSpec {
    pub const fn named(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name: Some(name),
            pattern,
            greedy: false,
        }
    }

    pub const fn anonymous(pattern: &'static str) -> Self {
        Self {
            name: None,
            pattern,
            greedy: false,
        }
    }

    pub const fn rest(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name: Some(name),
            pattern,
            greedy: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("command id {0:?} must be a single word")]
    InvalidId(String),
    #[error("argument {index} of !{id} contains a capturing group")]
    CapturingGroup { id: String, index: usize },
    #[error("only the last argument of !{id} may be greedy")]
    GreedyNotLast { id: String },
    #[error("invalid pattern for !{id}")]
    Invalid {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Anchored matcher for `!<id> <args...>`.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    id: String,
    args: Vec<ArgSpec>,
    full: Regex,
    fragments: Vec<Regex>,
}

impl CommandPattern {
    pub fn new(id: &str, args: &[ArgSpec]) -> Result<Self, PatternError> {
        if id.is_empty() || !id.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(PatternError::InvalidId(id.to_string()));
        }
        let invalid = |source| PatternError::Invalid {
            id: id.to_string(),
            source,
        };

        let mut full = format!(r"^!{}", regex::escape(id));
        let mut fragments = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            if arg.greedy && index + 1 != args.len() {
                return Err(PatternError::GreedyNotLast { id: id.to_string() });
            }
            let fragment = Regex::new(&format!("^(?:{})$", arg.pattern)).map_err(invalid)?;
            if fragment.captures_len() > 1 {
                return Err(PatternError::CapturingGroup {
                    id: id.to_string(),
                    index,
                });
            }
            fragments.push(fragment);
            full.push_str(&format!(r"\s+({})", arg.pattern));
        }
        full.push_str(r"\s*$");

        Ok(Self {
            id: id.to_string(),
            args: args.to_vec(),
            full: Regex::new(&full).map_err(invalid)?,
            fragments,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Positional arguments of `text`, which must start at the `!`.
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.full.captures(text)?;
        Some(
            (1..=self.args.len())
                .map(|i| caps.get(i).map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }

    /// Explains the first argument of `text` that failed to match.
    pub fn diagnose(&self, text: &str) -> String {
        let Some(mut rest) = text.strip_prefix(&format!("!{}", self.id)) else {
            return format!("expected the command to start with !{}", self.id);
        };

        for (index, (arg, fragment)) in self.args.iter().zip(&self.fragments).enumerate() {
            rest = rest.trim_start();
            let label = self.arg_label(index);
            if rest.is_empty() {
                return format!("missing argument <{label}>");
            }
            let (value, next) = if arg.greedy {
                (rest.trim_end(), "")
            } else {
                rest.split_once(char::is_whitespace).unwrap_or((rest, ""))
            };
            if !fragment.is_match(value) {
                return format!("invalid value '{value}' for <{label}>");
            }
            rest = next;
        }

        let trailing = rest.trim();
        if trailing.is_empty() {
            "arguments do not match the expected format".to_string()
        } else {
            format!("unexpected trailing input '{trailing}'")
        }
    }

    pub fn usage(&self) -> String {
        let mut parts = vec![format!("!{}", self.id)];
        parts.extend((0..self.args.len()).map(|i| format!("<{}>", self.arg_label(i))));
        parts.join(" ")
    }

    fn arg_label(&self, index: usize) -> String {
        match self.args[index].name {
            Some(name) => name.to_string(),
            None => format!("arg{index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acl_add() -> CommandPattern {
        CommandPattern::new(
            "acl_add",
            &[
                ArgSpec::named("command", r"\S+"),
                ArgSpec::named("nick_or_chan", r"\S+"),
            ],
        )
        .expect("valid pattern")
    }

    #[test]
    fn zero_argument_command_allows_trailing_whitespace_only() {
        let sing = CommandPattern::new("sing", &[]).expect("valid pattern");
        assert_eq!(sing.captures("!sing"), Some(vec![]));
        assert_eq!(sing.captures("!sing   "), Some(vec![]));
        assert_eq!(sing.captures("!sing loudly"), None);
        assert_eq!(sing.captures("!singer"), None);
    }

    #[test]
    fn captures_are_positional() {
        assert_eq!(
            acl_add().captures("!acl_add incident_start #ops"),
            Some(vec!["incident_start".to_string(), "#ops".to_string()])
        );
    }

    #[test]
    fn greedy_argument_takes_the_rest_of_the_line() {
        let start = CommandPattern::new(
            "incident_start",
            &[
                ArgSpec::named("severity", r"\d+"),
                ArgSpec::rest("components_comma_sep", r".+"),
            ],
        )
        .expect("valid pattern");
        assert_eq!(
            start.captures("!incident_start 4 Website, Mobile apps"),
            Some(vec!["4".to_string(), "Website, Mobile apps".to_string()])
        );
        assert_eq!(
            start.diagnose("!incident_start high Website"),
            "invalid value 'high' for <severity>"
        );
        assert_eq!(
            start.diagnose("!incident_start 4"),
            "missing argument <components_comma_sep>"
        );
    }

    #[test]
    fn diagnosis_names_the_failing_argument() {
        let pattern = acl_add();
        assert_eq!(pattern.diagnose("!acl_add"), "missing argument <command>");
        assert_eq!(
            pattern.diagnose("!acl_add sing"),
            "missing argument <nick_or_chan>"
        );
        assert_eq!(
            pattern.diagnose("!acl_add sing bob extra"),
            "unexpected trailing input 'extra'"
        );
    }

    #[test]
    fn usage_uses_arg_index_for_anonymous_arguments() {
        let pattern = CommandPattern::new(
            "contact_add",
            &[ArgSpec::named("name", r"\w+"), ArgSpec::anonymous(r"\S+")],
        )
        .expect("valid pattern");
        assert_eq!(pattern.usage(), "!contact_add <name> <arg1>");
    }

    #[test]
    fn rejects_bad_grammars() {
        assert!(matches!(
            CommandPattern::new("bad", &[ArgSpec::named("x", r"(\d+)")]),
            Err(PatternError::CapturingGroup { index: 0, .. })
        ));
        assert!(matches!(
            CommandPattern::new(
                "bad",
                &[ArgSpec::rest("x", r".+"), ArgSpec::named("y", r"\S+")]
            ),
            Err(PatternError::GreedyNotLast { .. })
        ));
        assert!(matches!(
            CommandPattern::new("two words", &[]),
            Err(PatternError::InvalidId(_))
        ));
        assert!(matches!(
            CommandPattern::new("bad", &[ArgSpec::named("x", r"[")]),
            Err(PatternError::Invalid { .. })
        ));
    }
}
