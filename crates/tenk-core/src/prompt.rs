/// Render a user prompt template by substituting `{name}` placeholders.
///
/// Placeholders with no matching variable are left as-is, so prompt text
/// containing literal braces (JSON examples) survives rendering.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}
