// ABOUTME: Environment variable interpolation for compose files.
// ABOUTME: Expands $VAR, ${VAR}, ${VAR:-default}, ${VAR?err} and friends in scalar values.

use serde_yaml::Value;

/// Expand variables in every string scalar of a parsed document.
///
/// Mapping keys are left untouched; only values are interpolated.
pub fn interpolate_value<F>(value: &mut Value, lookup: &F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            if s.contains('$') {
                *s = interpolate(s, lookup)?;
            }
        }
        Value::Sequence(items) => {
            for item in items {
                interpolate_value(item, lookup)?;
            }
        }
        Value::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                interpolate_value(item, lookup)?;
            }
        }
        Value::Tagged(tagged) => interpolate_value(&mut tagged.value, lookup)?,
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Expand variables in a single string. `$$` yields a literal `$`.
pub fn interpolate<F>(input: &str, lookup: &F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            out.push('$');
            rest = stripped;
        } else if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| format!("missing closing brace in {input:?}"))?;
            out.push_str(&expand_braced(&braced[..end], lookup)?);
            rest = &braced[end + 1..];
        } else {
            let name_len = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            if name_len == 0 {
                return Err(format!("invalid interpolation format in {input:?}"));
            }
            out.push_str(&lookup(&after[..name_len]).unwrap_or_default());
            rest = &after[name_len..];
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn expand_braced<F>(expr: &str, lookup: &F) -> Result<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let name_len = expr
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(expr.len());
    let (name, modifier) = expr.split_at(name_len);
    if name.is_empty() {
        return Err(format!("invalid interpolation format for ${{{expr}}}"));
    }

    let value = lookup(name);
    let set_and_non_empty = value.as_deref().is_some_and(|v| !v.is_empty());

    if modifier.is_empty() {
        return Ok(value.unwrap_or_default());
    }

    if let Some(default) = modifier.strip_prefix(":-") {
        return Ok(if set_and_non_empty {
            value.unwrap_or_default()
        } else {
            default.to_string()
        });
    }
    if let Some(default) = modifier.strip_prefix('-') {
        return Ok(value.unwrap_or_else(|| default.to_string()));
    }
    if let Some(message) = modifier.strip_prefix(":?") {
        return if set_and_non_empty {
            Ok(value.unwrap_or_default())
        } else {
            Err(required_message(name, message))
        };
    }
    if let Some(message) = modifier.strip_prefix('?') {
        return value.ok_or_else(|| required_message(name, message));
    }

    Err(format!("invalid interpolation format for ${{{expr}}}"))
}

fn required_message(name: &str, message: &str) -> String {
    if message.is_empty() {
        format!("required variable {name} is missing a value")
    } else {
        format!("required variable {name} is missing a value: {message}")
    }
}
