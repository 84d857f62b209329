// Option interpreter
//
// Every command takes a flat list of `name [value]` tokens. A schema per
// command says which names exist, what kind of value each takes and how
// to complete it.

use chrono::{DateTime, Local};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::utils::date::{now_seconds, parse_time_at};
use crate::utils::{parse_duration, Span, TimeParseError, TimeSpec};

/// What follows an option name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// A time expression (`8:00`, `-1h`, `2024-03-01_9:30`)
    Time,
    /// A duration (`2h`, `1:30`, `1w`)
    Duration,
    /// Free text
    String,
    /// No value; the option is a flag
    Final,
}

impl OptionKind {
    pub fn takes_value(self) -> bool {
        !matches!(self, OptionKind::Final)
    }
}

/// Data the completion providers draw on
pub trait CompletionSource {
    fn project_paths(&self) -> Vec<String>;
    fn project_ids(&self) -> Vec<i64>;
    /// Most recent record ids, newest first
    fn recent_record_ids(&self) -> Vec<i64>;
    fn open_todo_ids(&self) -> Vec<i64>;
}

pub type Completer = fn(&dyn CompletionSource) -> Vec<String>;

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub complete: Option<Completer>,
}

#[derive(Debug)]
pub struct CommandSchema {
    pub name: &'static str,
    pub options: &'static [OptionSpec],
}

impl CommandSchema {
    pub fn find(&self, name: &str) -> Option<&'static OptionSpec> {
        self.options.iter().find(|spec| spec.name == name)
    }
}

const fn opt(name: &'static str, kind: OptionKind, complete: Option<Completer>) -> OptionSpec {
    OptionSpec { name, kind, complete }
}

const fn flag(name: &'static str) -> OptionSpec {
    opt(name, OptionKind::Final, None)
}

fn complete_projects(src: &dyn CompletionSource) -> Vec<String> {
    src.project_paths()
}

fn complete_project_ids(src: &dyn CompletionSource) -> Vec<String> {
    src.project_ids().iter().map(i64::to_string).collect()
}

fn complete_record_ids(src: &dyn CompletionSource) -> Vec<String> {
    src.recent_record_ids().iter().map(i64::to_string).collect()
}

fn complete_todo_ids(src: &dyn CompletionSource) -> Vec<String> {
    src.open_todo_ids().iter().map(i64::to_string).collect()
}

fn complete_time(_: &dyn CompletionSource) -> Vec<String> {
    ["now", "8:00", "2020-04-09_09:10"].map(String::from).to_vec()
}

fn complete_duration(_: &dyn CompletionSource) -> Vec<String> {
    ["2h", "1m", "7d", "1w"].map(String::from).to_vec()
}

fn complete_offset(_: &dyn CompletionSource) -> Vec<String> {
    ["-1h", "+1h", "+1w1d2h", "-1w", "-3d"].map(String::from).to_vec()
}

fn complete_time_or_offset(src: &dyn CompletionSource) -> Vec<String> {
    let mut hints = complete_time(src);
    hints.extend(complete_offset(src));
    hints
}

pub static WORK: CommandSchema = CommandSchema {
    name: "work",
    options: &[
        opt("on", OptionKind::String, Some(complete_projects)),
        opt("at", OptionKind::Time, Some(complete_time_or_offset)),
        opt("for", OptionKind::Duration, Some(complete_duration)),
        opt("until", OptionKind::Time, Some(complete_time_or_offset)),
        flag("force"),
        flag("done"),
    ],
};

const WINDOW_OPTIONS: &[OptionSpec] = &[
    flag("today"),
    flag("yesterday"),
    flag("thisweek"),
    flag("lastweek"),
    opt("from", OptionKind::Time, Some(complete_time_or_offset)),
    opt("until", OptionKind::Time, Some(complete_time_or_offset)),
    opt("for", OptionKind::Duration, Some(complete_duration)),
    opt("on", OptionKind::String, Some(complete_projects)),
    flag("json"),
];

pub static SHOW: CommandSchema = CommandSchema {
    name: "show",
    options: WINDOW_OPTIONS,
};

pub static STATS: CommandSchema = CommandSchema {
    name: "stats",
    options: WINDOW_OPTIONS,
};

pub static EDIT: CommandSchema = CommandSchema {
    name: "edit",
    options: &[
        opt("id", OptionKind::String, Some(complete_record_ids)),
        opt("project", OptionKind::String, Some(complete_projects)),
        opt("from", OptionKind::Time, Some(complete_time_or_offset)),
        opt("to", OptionKind::Time, Some(complete_time_or_offset)),
    ],
};

pub static RM: CommandSchema = CommandSchema {
    name: "rm",
    options: &[opt("id", OptionKind::String, Some(complete_record_ids))],
};

pub static PROJECT: CommandSchema = CommandSchema {
    name: "project",
    options: &[
        flag("list"),
        opt("add", OptionKind::String, Some(complete_projects)),
        opt("rm", OptionKind::String, Some(complete_projects)),
        opt("id", OptionKind::String, Some(complete_project_ids)),
        opt("rename", OptionKind::String, None),
        flag("json"),
    ],
};

pub static TODO: CommandSchema = CommandSchema {
    name: "todo",
    options: &[
        opt("add", OptionKind::String, None),
        flag("list"),
        flag("all"),
        opt("done", OptionKind::String, Some(complete_todo_ids)),
        opt("rm", OptionKind::String, Some(complete_todo_ids)),
        opt("id", OptionKind::String, Some(complete_todo_ids)),
        opt("on", OptionKind::String, Some(complete_projects)),
        opt("priority", OptionKind::String, None),
        opt("due", OptionKind::Time, Some(complete_time_or_offset)),
        opt("descr", OptionKind::String, None),
        opt("at", OptionKind::Time, Some(complete_time_or_offset)),
        flag("json"),
    ],
};

/// Schema for a command word
pub fn schema_for(command: &str) -> Option<&'static CommandSchema> {
    [&WORK, &SHOW, &STATS, &EDIT, &RM, &PROJECT, &TODO]
        .into_iter()
        .find(|schema| schema.name == command)
}

/// A parsed option value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Time(TimeSpec),
    Duration(Span),
    Text(String),
    Flag,
}

/// Interpreted options, keyed by name; argument order is not kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionMap {
    values: HashMap<&'static str, OptionValue>,
}

impl OptionMap {
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn time(&self, name: &str) -> Option<&TimeSpec> {
        match self.values.get(name) {
            Some(OptionValue::Time(spec)) => Some(spec),
            _ => None,
        }
    }

    pub fn duration(&self, name: &str) -> Option<&Span> {
        match self.values.get(name) {
            Some(OptionValue::Duration(span)) => Some(span),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretError {
    #[error("invalid option {0}")]
    InvalidOption(String),

    #[error("option {0} must have a value")]
    MissingValue(String),

    #[error(transparent)]
    Time(#[from] TimeParseError),
}

/// Interpret tokens against `schema` relative to the current time
pub fn interpret(tokens: &[String], schema: &CommandSchema) -> Result<OptionMap, InterpretError> {
    interpret_at(tokens, schema, now_seconds())
}

/// Interpret tokens left to right
///
/// Value options consume the following token; flags consume only
/// themselves. Empty tokens are skipped. A repeated option keeps its last
/// value.
pub fn interpret_at(
    tokens: &[String],
    schema: &CommandSchema,
    now: DateTime<Local>,
) -> Result<OptionMap, InterpretError> {
    let mut map = OptionMap::default();
    let mut rest = tokens.iter();

    while let Some(token) = rest.next() {
        if token.is_empty() {
            continue;
        }
        let spec = schema
            .find(token)
            .ok_or_else(|| InterpretError::InvalidOption(token.clone()))?;

        let value = match spec.kind {
            OptionKind::Final => OptionValue::Flag,
            kind => {
                let raw = rest
                    .next()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| InterpretError::MissingValue(spec.name.to_string()))?;
                match kind {
                    OptionKind::Time => OptionValue::Time(parse_time_at(raw, now)?),
                    OptionKind::Duration => OptionValue::Duration(parse_duration(raw)?),
                    _ => OptionValue::Text(raw.clone()),
                }
            }
        };
        map.values.insert(spec.name, value);
    }

    Ok(map)
}

/// Completion candidates for the last (partial) token
///
/// If the token before it is a value option, the option's provider is
/// asked; otherwise the unused option names are offered.
pub fn complete(schema: &CommandSchema, tokens: &[String], src: &dyn CompletionSource) -> Vec<String> {
    let (partial, typed) = match tokens.split_last() {
        Some((last, rest)) => (last.as_str(), rest),
        None => ("", tokens),
    };

    let mut used = HashSet::new();
    let mut pending: Option<&OptionSpec> = None;
    let mut walk = typed.iter();
    while let Some(token) = walk.next() {
        pending = None;
        let Some(spec) = schema.find(token) else {
            continue;
        };
        used.insert(spec.name);
        if spec.kind.takes_value() && walk.next().is_none() {
            pending = Some(spec);
        }
    }

    let candidates = match pending {
        Some(spec) => spec.complete.map(|provider| provider(src)).unwrap_or_default(),
        None => schema
            .options
            .iter()
            .filter(|spec| !used.contains(spec.name))
            .map(|spec| spec.name.to_string())
            .collect(),
    };

    candidates
        .into_iter()
        .filter(|candidate| candidate.starts_with(partial))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tokens(s: &str) -> Vec<String> {
        s.split(' ').map(String::from).collect()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 12, 14, 0, 0).single().unwrap()
    }

    struct Fixed;

    impl CompletionSource for Fixed {
        fn project_paths(&self) -> Vec<String> {
            vec!["Work".to_string(), "Work.Email".to_string(), "Home".to_string()]
        }
        fn project_ids(&self) -> Vec<i64> {
            vec![1, 2]
        }
        fn recent_record_ids(&self) -> Vec<i64> {
            vec![12, 11, 3]
        }
        fn open_todo_ids(&self) -> Vec<i64> {
            vec![]
        }
    }

    #[test]
    fn test_interpret_typed_values() {
        let map = interpret_at(&tokens("on Work at 8:00 for 1h30m force"), &WORK, now()).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.text("on"), Some("Work"));
        assert_eq!(
            map.time("at"),
            Some(&TimeSpec::Absolute(Local.with_ymd_and_hms(2024, 3, 12, 8, 0, 0).single().unwrap()))
        );
        assert_eq!(map.duration("for").unwrap().total_seconds(), 5400);
        assert!(map.has("force"));
    }

    #[test]
    fn test_interpret_empty_and_blank_tokens() {
        assert!(interpret_at(&[], &SHOW, now()).unwrap().is_empty());
        let map = interpret_at(&["".to_string(), "today".to_string()], &SHOW, now()).unwrap();
        assert!(map.has("today"));
    }

    #[test]
    fn test_interpret_errors() {
        assert_eq!(
            interpret_at(&tokens("on Work bogus"), &WORK, now()),
            Err(InterpretError::InvalidOption("bogus".to_string()))
        );
        assert_eq!(
            interpret_at(&tokens("force on"), &WORK, now()).unwrap_err().to_string(),
            "option on must have a value"
        );
        assert_eq!(
            interpret_at(&tokens("for -1h"), &WORK, now()),
            Err(InterpretError::Time(TimeParseError::NegativeDuration("-1h".to_string())))
        );
    }

    #[test]
    fn test_last_value_wins() {
        let map = interpret_at(&tokens("on A on B"), &WORK, now()).unwrap();
        assert_eq!(map.text("on"), Some("B"));
    }

    #[test]
    fn test_complete_option_names() {
        let found = complete(&WORK, &tokens("on Work f"), &Fixed);
        assert_eq!(found, vec!["for".to_string(), "force".to_string()]);

        let found = complete(&RM, &[], &Fixed);
        assert_eq!(found, vec!["id".to_string()]);
    }

    #[test]
    fn test_complete_values() {
        let found = complete(&WORK, &tokens("on Wo"), &Fixed);
        assert_eq!(found, vec!["Work".to_string(), "Work.Email".to_string()]);

        let found = complete(&EDIT, &tokens("id 1"), &Fixed);
        assert_eq!(found, vec!["12".to_string(), "11".to_string()]);

        let found = complete(&WORK, &tokens("for "), &Fixed);
        assert_eq!(found, vec!["2h", "1m", "7d", "1w"]);
    }

    #[test]
    fn test_schema_for() {
        assert_eq!(schema_for("stats").unwrap().name, "stats");
        assert!(schema_for("nope").is_none());
    }
}
