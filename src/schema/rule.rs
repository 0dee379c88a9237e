//! Custom validation rules attached to string leaves.

use regex::Regex;

/// A parsed custom rule.
#[derive(Debug, Clone)]
pub enum Rule {
    MinLength(usize),
    MaxLength(usize),
    /// Whole-value match against the pattern.
    Pattern(Regex),
}

impl Rule {
    /// Parse `minLength:N`, `maxLength:N` or `regex:PATTERN`.
    pub fn parse(rule: &str) -> Result<Rule, String> {
        if let Some(n) = rule.strip_prefix("minLength:") {
            return parse_length(n).map(Rule::MinLength);
        }
        if let Some(n) = rule.strip_prefix("maxLength:") {
            return parse_length(n).map(Rule::MaxLength);
        }
        if let Some(pattern) = rule.strip_prefix("regex:") {
            return Regex::new(&format!("^(?:{pattern})$"))
                .map(Rule::Pattern)
                .map_err(|e| e.to_string());
        }
        Err("expected minLength:N, maxLength:N or regex:PATTERN".to_string())
    }

    /// Check `value`, returning the failure reason.
    pub fn check(&self, value: &str) -> Result<(), String> {
        let len = value.chars().count();
        match self {
            Rule::MinLength(min) if len < *min => {
                Err(format!("length must be at least {min}, got {len}"))
            }
            Rule::MaxLength(max) if len > *max => {
                Err(format!("length must be at most {max}, got {len}"))
            }
            Rule::Pattern(re) if !re.is_match(value) => Err(format!(
                "value `{value}` must match pattern {}",
                display_pattern(re)
            )),
            _ => Ok(()),
        }
    }
}

fn parse_length(n: &str) -> Result<usize, String> {
    n.trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid length `{n}`: {e}"))
}

fn display_pattern(re: &Regex) -> &str {
    let s = re.as_str();
    s.strip_prefix("^(?:")
        .and_then(|s| s.strip_suffix(")$"))
        .unwrap_or(s)
}
