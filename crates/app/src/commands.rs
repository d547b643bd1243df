//! Line commands typed at the prompt.

use std::str::FromStr;

use engine::{Category, CategoryFilter, DateRange, EngineError, Money, SortSpec};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Fragment to navigate to, without the leading `#`.
    Go(String),
    Add {
        amount: Money,
        category: Option<Category>,
        description: String,
    },
    Remove(String),
    Search(String),
    Category(CategoryFilter),
    Range(DateRange),
    Sort(Option<SortSpec>),
    Budget {
        category: Category,
        limit: Money,
    },
    Currency(String),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Value(#[from] EngineError),
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits off the first word.
fn first_word(input: &str) -> (&str, &str) {
    input.split_once(' ').unwrap_or((input, ""))
}

fn parse_amount(raw: &str) -> Result<Money, CommandError> {
    let amount: Money = raw.parse()?;
    if amount.is_negative() {
        return Err(EngineError::InvalidAmount(format!("negative amount: {raw}")).into());
    }
    Ok(amount)
}

impl FromStr for Command {
    type Err = CommandError;

    /// Rules:
    /// - `#stats?range=week` => go to that fragment
    /// - `add 12.50 food pizza` => the category word is optional; when the
    ///   second word is not a category it starts the description
    /// - `sort none` (or bare `sort`) => insertion order
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let line = collapse_whitespace(input);
        if let Some(fragment) = line.strip_prefix('#') {
            return Ok(Self::Go(fragment.to_string()));
        }

        let (verb, rest) = first_word(&line);
        match verb.to_ascii_lowercase().as_str() {
            "go" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("go <view>"));
                }
                Ok(Self::Go(rest.trim_start_matches('#').to_string()))
            }
            "add" => {
                let (raw_amount, tail) = first_word(rest);
                if raw_amount.is_empty() {
                    return Err(CommandError::Usage("add <amount> [category] [description]"));
                }
                let amount = parse_amount(raw_amount)?;
                let (word, after) = first_word(tail);
                let (category, description) = match word.parse::<Category>() {
                    Ok(category) if !word.is_empty() => (Some(category), after),
                    _ => (None, tail),
                };
                Ok(Self::Add {
                    amount,
                    category,
                    description: description.to_string(),
                })
            }
            "rm" | "remove" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("rm <id-prefix>"));
                }
                Ok(Self::Remove(rest.to_string()))
            }
            "search" => Ok(Self::Search(rest.to_string())),
            "category" => Ok(Self::Category(rest.parse()?)),
            "range" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage(
                        "range <all|today|week|month|last30|year>",
                    ));
                }
                Ok(Self::Range(rest.parse()?))
            }
            "sort" => {
                if rest.is_empty() || rest.eq_ignore_ascii_case("none") {
                    return Ok(Self::Sort(None));
                }
                Ok(Self::Sort(Some(rest.parse()?)))
            }
            "budget" => {
                let (raw_category, raw_limit) = first_word(rest);
                if raw_category.is_empty() || raw_limit.is_empty() {
                    return Err(CommandError::Usage("budget <category> <amount>"));
                }
                Ok(Self::Budget {
                    category: raw_category.parse()?,
                    limit: parse_amount(raw_limit)?,
                })
            }
            "currency" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("currency <symbol>"));
                }
                Ok(Self::Currency(rest.to_string()))
            }
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}
