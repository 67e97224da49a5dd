//! `{placeholder}` substitution for host code templates.

/// Replace every `{key}` in `template` with its value.
///
/// Substitution is a single left-to-right pass, so values are never
/// rescanned. Unknown placeholders are kept as written, which leaves object
/// literals like `{title: ...}` untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (close, *v))
        });
        match value {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Format a number the way a script engine prints it: no trailing `.0`.
pub fn js_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// `[a,b,c]` with script number formatting.
pub fn js_number_array(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| js_number(*v)).collect();
    format!("[{}]", items.join(","))
}
